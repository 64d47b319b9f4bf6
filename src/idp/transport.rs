use crate::error::Result;
use async_trait::async_trait;
use reqwest::redirect::Policy;
use reqwest::Url;
use serde::Serialize;
use std::fmt;
use std::time::Duration;

const MAX_REDIRECTS: usize = 10;

// ADFS only offers forms authentication to user agents it recognises as browsers
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64; Trident/7.0; rv:11.0) like Gecko";

/// Form body posted to the ADFS login action
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct LoginForm {
    #[serde(rename = "UserName")]
    pub user_name: String,
    #[serde(rename = "Password")]
    pub password: String,
    #[serde(rename = "AuthMethod")]
    pub auth_method: String,
    #[serde(rename = "Kmsi")]
    pub kmsi: bool,
}

impl LoginForm {
    pub fn new(user_name: String, password: &str) -> Self {
        Self {
            user_name,
            password: password.to_string(),
            auth_method: String::new(),
            kmsi: true,
        }
    }
}

impl fmt::Debug for LoginForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginForm")
            .field("user_name", &self.user_name)
            .field("password", &"<redacted>")
            .field("auth_method", &self.auth_method)
            .field("kmsi", &self.kmsi)
            .finish()
    }
}

/// HTTP operations the IdP session needs; both return the response body
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdpTransport: Send + Sync {
    async fn get(&self, url: &Url) -> Result<String>;

    async fn post_form(&self, url: &Url, form: &LoginForm) -> Result<String>;
}

/// reqwest-backed transport for internal ADFS endpoints
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Build a client that accepts self-signed/internal CA certificates,
    /// keeps cookies between requests, and bounds every request by `timeout`
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(true)
            .cookie_store(true)
            .redirect(Policy::limited(MAX_REDIRECTS))
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl IdpTransport for HttpTransport {
    async fn get(&self, url: &Url) -> Result<String> {
        tracing::debug!("GET {}", url);

        let response = self.client.get(url.clone()).send().await?.error_for_status()?;
        tracing::debug!("GET {} -> {}", url, response.status());

        Ok(response.text().await?)
    }

    async fn post_form(&self, url: &Url, form: &LoginForm) -> Result<String> {
        tracing::debug!("POST {} as {}", url, form.user_name);

        let response = self
            .client
            .post(url.clone())
            .form(form)
            .send()
            .await?
            .error_for_status()?;
        tracing::debug!("POST landed on {} ({})", response.url(), response.status());

        Ok(response.text().await?)
    }
}
