// Federation facade: the surface the CLI talks to
use crate::credentials::{self, StsTokenExchange, TokenExchange};
use crate::error::Result;
use crate::idp::{HttpTransport, IdpSession, IdpTransport};
use crate::models::{Account, AccountMapping, AssumedRole, TemporaryCredential};
use crate::saml;
use std::time::Duration;

pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Everything the core needs from the configuration layer
#[derive(Debug, Clone)]
pub struct FederationConfig {
    /// Base URL of the ADFS server, e.g. `https://sts.example.com`
    pub directory_domain: String,
    /// NetBIOS domain prefixed to user names
    pub domain: String,
    pub account_mapping: AccountMapping,
    pub region: String,
    pub duration_seconds: Option<i32>,
    pub request_timeout: Duration,
}

impl FederationConfig {
    pub fn new(directory_domain: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            directory_domain: directory_domain.into(),
            domain: domain.into(),
            account_mapping: AccountMapping::new(),
            region: DEFAULT_REGION.to_string(),
            duration_seconds: None,
            request_timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// One federated sign-in and the roles it unlocked
pub struct Federation<T, E> {
    idp: IdpSession<T>,
    exchange: E,
    account_mapping: AccountMapping,
    assumed: Vec<AssumedRole>,
}

impl Federation<HttpTransport, StsTokenExchange> {
    /// Production stack: reqwest against ADFS, AWS STS for the exchange
    pub async fn connect(config: &FederationConfig) -> Result<Self> {
        let transport = HttpTransport::new(config.request_timeout)?;
        let idp = IdpSession::new(transport, &config.directory_domain, &config.domain)?;
        let exchange = StsTokenExchange::new(&config.region, config.duration_seconds).await;

        Ok(Self::new(idp, exchange, config.account_mapping.clone()))
    }
}

impl<T: IdpTransport, E: TokenExchange> Federation<T, E> {
    pub fn new(idp: IdpSession<T>, exchange: E, account_mapping: AccountMapping) -> Self {
        Self {
            idp,
            exchange,
            account_mapping,
            assumed: Vec::new(),
        }
    }

    /// Sign in to ADFS and assume every role in the returned assertion.
    ///
    /// Roles that cannot be assumed are left out; an empty list is a valid
    /// outcome.
    pub async fn authenticate(&mut self, username: &str, password: &str) -> Result<Vec<Account>> {
        let assertion = match self.idp.cached_assertion() {
            Some(assertion) => assertion.to_string(),
            None => {
                let login_path = self.idp.login_path().await?;
                self.idp.login(&login_path, username, password).await?
            }
        };

        let roles = saml::parse_roles(&assertion)?;
        self.assumed =
            credentials::assume_all(&self.exchange, &roles, &assertion, &self.account_mapping)
                .await;

        Ok(self.accounts())
    }

    pub fn accounts(&self) -> Vec<Account> {
        self.assumed.iter().map(|a| a.account.clone()).collect()
    }

    /// Credentials obtained for `account` by the last [`Federation::authenticate`]
    pub fn credentials(&self, account: &Account) -> Option<&TemporaryCredential> {
        self.assumed
            .iter()
            .find(|a| a.account.arn == account.arn)
            .map(|a| &a.credential)
    }
}
