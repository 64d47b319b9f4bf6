use thiserror::Error;

#[derive(Error, Debug)]
pub enum AdfsError {
    #[error("Identity provider discovery failed: {0}")]
    Discovery(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Unexpected identity provider response: {0}")]
    Protocol(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Failed to assume role {role_arn}: {reason}")]
    RoleAssumption { role_arn: String, reason: String },

    #[error("Invalid SAML assertion: {0}")]
    InvalidAssertion(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("No account matches '{0}'")]
    AccountNotFound(String),

    #[error("No roles could be assumed with this assertion")]
    NoAccounts,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<reqwest::Error> for AdfsError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AdfsError::Transport(format!("request timed out: {}", err))
        } else {
            AdfsError::Transport(err.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, AdfsError>;
