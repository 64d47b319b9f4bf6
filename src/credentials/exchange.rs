use crate::error::{AdfsError, Result};
use crate::models::{RoleCandidate, TemporaryCredential};
use async_trait::async_trait;
use aws_sdk_sts::error::ProvideErrorMetadata;
use aws_sdk_sts::Client as StsClient;
use chrono::{DateTime, TimeZone, Utc};

/// Exchanges a SAML assertion for temporary credentials of one role
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenExchange: Send + Sync {
    async fn assume_role_with_saml(
        &self,
        role: &RoleCandidate,
        assertion: &str,
    ) -> Result<TemporaryCredential>;
}

/// AWS STS `AssumeRoleWithSAML`
pub struct StsTokenExchange {
    client: StsClient,
    duration_seconds: Option<i32>,
}

impl StsTokenExchange {
    pub async fn new(region: &str, duration_seconds: Option<i32>) -> Self {
        let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(region.to_string()))
            .load()
            .await;

        Self {
            client: StsClient::new(&config),
            duration_seconds,
        }
    }
}

#[async_trait]
impl TokenExchange for StsTokenExchange {
    async fn assume_role_with_saml(
        &self,
        role: &RoleCandidate,
        assertion: &str,
    ) -> Result<TemporaryCredential> {
        let failure = |reason: String| AdfsError::RoleAssumption {
            role_arn: role.role_arn.clone(),
            reason,
        };

        tracing::debug!("AssumeRoleWithSAML for {}", role.role_arn);

        let response = self
            .client
            .assume_role_with_saml()
            .role_arn(&role.role_arn)
            .principal_arn(&role.principal_arn)
            .saml_assertion(assertion)
            .set_duration_seconds(self.duration_seconds)
            .send()
            .await
            .map_err(|e| match e.code() {
                Some(code) => failure(format!("{}: {}", code, e.message().unwrap_or("no message"))),
                None => failure(e.to_string()),
            })?;

        let creds = response
            .credentials()
            .ok_or_else(|| failure("no credentials in response".to_string()))?;

        let expiration = smithy_to_chrono(creds.expiration())
            .ok_or_else(|| failure("invalid expiration timestamp".to_string()))?;

        Ok(TemporaryCredential {
            role_arn: role.role_arn.clone(),
            access_key_id: creds.access_key_id().to_string(),
            secret_access_key: creds.secret_access_key().to_string(),
            session_token: creds.session_token().to_string(),
            expiration,
        })
    }
}

fn smithy_to_chrono(time: &aws_smithy_types::DateTime) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(time.secs(), time.subsec_nanos()).single()
}
