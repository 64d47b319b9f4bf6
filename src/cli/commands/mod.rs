pub mod completions;
pub mod config;
pub mod list;
pub mod login;

use super::{prompt, ServerArgs};
use crate::config::Config;
use crate::credentials::StsTokenExchange;
use crate::error::Result;
use crate::idp::HttpTransport;
use crate::models::Account;
use crate::session::Federation;

/// A completed sign-in shared by the commands that need one
pub(crate) struct SignIn {
    pub config: Config,
    pub federation: Federation<HttpTransport, StsTokenExchange>,
    pub accounts: Vec<Account>,
}

/// Load the config, apply command-line overrides, prompt for anything
/// missing and authenticate
pub(crate) async fn sign_in(server: ServerArgs, username: Option<String>) -> Result<SignIn> {
    let mut config = Config::load()?;
    if let Some(directory_domain) = server.directory_domain {
        config.adfs.directory_domain = Some(directory_domain);
    }
    if let Some(domain) = server.domain {
        config.adfs.domain = Some(domain);
    }

    let federation_config = config.federation_config()?;
    let username = prompt::username(username.or_else(|| config.adfs.username.clone()))?;
    let password = prompt::password()?;

    let mut federation = Federation::connect(&federation_config).await?;
    let mut accounts = federation.authenticate(&username, &password).await?;
    accounts.sort_by_key(|a| a.label());

    Ok(SignIn {
        config,
        federation,
        accounts,
    })
}
