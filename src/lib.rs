//! Browser-less ADFS sign-in for AWS.
//!
//! Logs in to an ADFS server the way a browser would, extracts the AWS roles
//! from the SAML assertion and exchanges it for temporary STS credentials.
//!
//! ```no_run
//! use adfs_aws::{Federation, FederationConfig};
//!
//! # async fn run() -> adfs_aws::Result<()> {
//! let config = FederationConfig::new("https://sts.example.com", "CORP");
//! let mut federation = Federation::connect(&config).await?;
//!
//! for account in federation.authenticate("alice", "secret").await? {
//!     let creds = federation.credentials(&account);
//!     println!("{} {:?}", account.label(), creds.map(|c| c.expiration_display()));
//! }
//! # Ok(())
//! # }
//! ```

pub mod aws_config;
pub mod cli;
pub mod config;
pub mod credentials;
pub mod error;
pub mod idp;
pub mod models;
pub mod saml;
pub mod scanner;
pub mod session;

pub use error::{AdfsError, Result};
pub use models::{Account, TemporaryCredential};
pub use session::{Federation, FederationConfig};
