// ADFS identity provider session
mod pages;
mod transport;

pub use pages::{LoginOutcome, ERROR_TEXT_WINDOW};
pub use transport::{HttpTransport, IdpTransport, LoginForm};

#[cfg(test)]
pub(crate) use pages::tests as fixtures;
#[cfg(test)]
pub use transport::MockIdpTransport;

use crate::error::{AdfsError, Result};
use reqwest::Url;
use tokio::sync::OnceCell;

/// IdP-initiated sign-on path for the AWS relying party
pub const ENTRY_PATH: &str = "/adfs/ls/IdpInitiatedSignOn.aspx?loginToRp=urn:amazon:webservices";

/// One authentication attempt against an ADFS server.
///
/// The assertion cell is filled by the first successful [`IdpSession::login`]
/// and is read-only afterwards.
pub struct IdpSession<T> {
    transport: T,
    base_domain: Url,
    entry_path: String,
    domain: String,
    assertion: OnceCell<String>,
}

impl<T: IdpTransport> IdpSession<T> {
    /// Resolve the sign-on entry point under `directory_domain`.
    ///
    /// A bare host name is treated as `https://<host>`.
    pub fn new(transport: T, directory_domain: &str, domain: &str) -> Result<Self> {
        let (base_domain, entry_path) = resolve_entry(directory_domain)?;
        tracing::debug!("IdP base domain: {}, entry path: {}", base_domain, entry_path);

        Ok(Self {
            transport,
            base_domain,
            entry_path,
            domain: domain.to_string(),
            assertion: OnceCell::new(),
        })
    }

    pub fn cached_assertion(&self) -> Option<&str> {
        self.assertion.get().map(String::as_str)
    }

    /// Fetch the sign-on page and return the login form's action
    pub async fn login_path(&self) -> Result<String> {
        let url = self
            .base_domain
            .join(&self.entry_path)
            .map_err(|e| AdfsError::Discovery(format!("invalid entry path: {}", e)))?;

        let page = self.transport.get(&url).await.map_err(|e| {
            AdfsError::Discovery(format!("could not load sign-on page {}: {}", url, e))
        })?;

        let action = pages::find_login_form_action(&page)
            .map_err(|e| AdfsError::Discovery(format!("sign-on page is unreadable: {}", e)))?
            .ok_or_else(|| AdfsError::Discovery(format!("no login form found at {}", url)))?;

        tracing::debug!("Login form action: {}", action);
        Ok(action)
    }

    /// Submit credentials and return the base64 SAML assertion.
    ///
    /// Once an assertion was obtained, later calls return it without
    /// contacting the IdP again.
    pub async fn login(&self, login_path: &str, username: &str, password: &str) -> Result<String> {
        if let Some(assertion) = self.assertion.get() {
            tracing::debug!("Reusing SAML assertion from this session");
            return Ok(assertion.clone());
        }

        let assertion = self
            .assertion
            .get_or_try_init(|| self.submit_credentials(login_path, username, password))
            .await?;

        Ok(assertion.clone())
    }

    async fn submit_credentials(
        &self,
        login_path: &str,
        username: &str,
        password: &str,
    ) -> Result<String> {
        let url = self.base_domain.join(login_path).map_err(|e| {
            AdfsError::Protocol(format!("invalid login form action '{}': {}", login_path, e))
        })?;

        let form = LoginForm::new(self.qualified_username(username), password);
        let page = self.transport.post_form(&url, &form).await?;

        match pages::scan_login_response(&page)
            .map_err(|e| AdfsError::Protocol(format!("login response is unreadable: {}", e)))?
        {
            LoginOutcome::Assertion(assertion) => {
                tracing::info!("Signed in to {} as {}", self.base_domain, form.user_name);
                Ok(assertion)
            }
            LoginOutcome::Rejected(message) => Err(AdfsError::Authentication(message)),
            LoginOutcome::Unrecognized => Err(AdfsError::Protocol(
                "login response contains neither a SAML assertion nor an error message"
                    .to_string(),
            )),
        }
    }

    /// `DOMAIN\user`, unless the user name already names its domain
    fn qualified_username(&self, username: &str) -> String {
        if self.domain.is_empty() || username.contains('\\') || username.contains('@') {
            username.to_string()
        } else {
            format!("{}\\{}", self.domain, username)
        }
    }
}

fn resolve_entry(directory_domain: &str) -> Result<(Url, String)> {
    let directory_domain = directory_domain.trim();
    let with_scheme = if directory_domain.contains("://") {
        directory_domain.to_string()
    } else {
        format!("https://{}", directory_domain)
    };

    let invalid = |reason: String| {
        AdfsError::ConfigError(format!(
            "invalid directory domain '{}': {}",
            directory_domain, reason
        ))
    };

    let directory = Url::parse(&with_scheme).map_err(|e| invalid(e.to_string()))?;
    if directory.host_str().is_none() {
        return Err(invalid("missing host".to_string()));
    }

    let entry = directory
        .join(ENTRY_PATH)
        .map_err(|e| invalid(e.to_string()))?;
    let base_domain = Url::parse(&entry.origin().ascii_serialization())
        .map_err(|e| invalid(e.to_string()))?;

    let entry_path = match entry.query() {
        Some(query) => format!("{}?{}", entry.path(), query),
        None => entry.path().to_string(),
    };

    Ok((base_domain, entry_path))
}
