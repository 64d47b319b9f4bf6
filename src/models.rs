use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::OnceLock;

/// Account id → human readable name
pub type AccountMapping = HashMap<String, String>;

/// A role the SAML assertion allows us to assume, with the IdP principal
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct RoleCandidate {
    pub principal_arn: String,
    pub role_arn: String,
}

impl RoleCandidate {
    pub fn new(principal_arn: impl Into<String>, role_arn: impl Into<String>) -> Self {
        Self {
            principal_arn: principal_arn.into(),
            role_arn: role_arn.into(),
        }
    }
}

/// AWS temporary credentials obtained for one role
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemporaryCredential {
    pub role_arn: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: String,
    pub expiration: DateTime<Utc>,
}

impl TemporaryCredential {
    pub fn expires_in_seconds(&self) -> i64 {
        (self.expiration - Utc::now()).num_seconds().max(0)
    }

    /// Format expiration time as human-readable string
    pub fn expiration_display(&self) -> String {
        let secs = self.expires_in_seconds();
        let hours = secs / 3600;
        let mins = (secs % 3600) / 60;

        if hours > 0 {
            format!("{}h {}m", hours, mins)
        } else if mins > 0 {
            format!("{}m {}s", mins, secs % 60)
        } else if secs > 0 {
            format!("{}s", secs)
        } else {
            "EXPIRED".to_string()
        }
    }
}

/// An assumable role, labeled for display
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Account {
    pub arn: String,
    pub display_name: String,
    pub account_id: String,
}

impl Account {
    /// Build the account for a role ARN, resolving its label from `mapping`.
    ///
    /// The label falls back to the numeric account id, or to the whole ARN
    /// when no id can be found in it.
    pub fn from_role_arn(role_arn: &str, mapping: &AccountMapping) -> Self {
        let account_id = account_id_from_arn(role_arn).unwrap_or_default();
        let display_name = mapping
            .get(&account_id)
            .cloned()
            .unwrap_or_else(|| {
                if account_id.is_empty() {
                    role_arn.to_string()
                } else {
                    account_id.clone()
                }
            });

        Self {
            arn: role_arn.to_string(),
            display_name,
            account_id,
        }
    }

    pub fn role_name(&self) -> &str {
        self.arn.rsplit('/').next().unwrap_or(&self.arn)
    }

    pub fn label(&self) -> String {
        format!("{}/{}", self.display_name, self.role_name())
    }

    /// Whether `query` names this account by ARN, account id, label or role
    pub fn matches(&self, query: &str) -> bool {
        self.arn == query
            || self.account_id == query
            || self.label() == query
            || self.display_name == query
            || self.role_name() == query
    }
}

/// Digits immediately preceding `:role` in an IAM role ARN
pub fn account_id_from_arn(arn: &str) -> Option<String> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| Regex::new(r"(\d+):role").expect("valid pattern"));

    pattern
        .captures(arn)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// A successfully assumed role together with its credentials
#[derive(Debug, Clone)]
pub struct AssumedRole {
    pub account: Account,
    pub credential: TemporaryCredential,
}
