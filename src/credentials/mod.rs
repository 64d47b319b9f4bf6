// Role assumption for every role carried by a SAML assertion
mod exchange;

pub use exchange::{StsTokenExchange, TokenExchange};

#[cfg(test)]
pub use exchange::MockTokenExchange;

use crate::models::{Account, AccountMapping, AssumedRole, RoleCandidate};
use futures_util::future::join_all;
use std::collections::HashSet;

/// Assume every role concurrently with the same assertion.
///
/// A role whose exchange fails is logged and left out; the call itself never
/// fails. Accounts are labeled through `mapping` and deduplicated by role ARN.
/// Callers that need a stable order should sort the result.
pub async fn assume_all<E>(
    exchange: &E,
    roles: &[RoleCandidate],
    assertion: &str,
    mapping: &AccountMapping,
) -> Vec<AssumedRole>
where
    E: TokenExchange + ?Sized,
{
    let results = join_all(
        roles
            .iter()
            .map(|role| exchange.assume_role_with_saml(role, assertion)),
    )
    .await;

    let mut seen = HashSet::new();
    let mut assumed = Vec::new();

    for result in results {
        match result {
            Ok(credential) => {
                if !seen.insert(credential.role_arn.clone()) {
                    tracing::debug!("Skipping duplicate role {}", credential.role_arn);
                    continue;
                }
                assumed.push(AssumedRole {
                    account: Account::from_role_arn(&credential.role_arn, mapping),
                    credential,
                });
            }
            Err(e) => tracing::warn!("{}", e),
        }
    }

    tracing::info!("Assumed {} of {} role(s)", assumed.len(), roles.len());
    assumed
}
