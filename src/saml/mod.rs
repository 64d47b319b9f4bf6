// SAML assertion role extraction
use crate::error::{AdfsError, Result};
use crate::models::RoleCandidate;
use crate::scanner::{self, CaseMode, Flow, TagHandler};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

const IAM_ARN_PREFIX: &str = "arn:aws:iam::";

/// Collects `principal,role` pairs from every matching text node
#[derive(Default)]
struct RoleCollector {
    roles: Vec<RoleCandidate>,
}

impl TagHandler for RoleCollector {
    type Output = Vec<RoleCandidate>;

    fn text(&mut self, text: &str) -> Flow {
        let text = text.trim();
        if !text.starts_with(IAM_ARN_PREFIX) {
            return Flow::Continue;
        }

        match text.split_once(',') {
            Some((first, second)) => {
                let (first, second) = (first.trim(), second.trim());
                // Some IdPs emit the pair as role,provider
                let role = if first.contains(":role/") && second.contains(":saml-provider/") {
                    RoleCandidate::new(second, first)
                } else {
                    RoleCandidate::new(first, second)
                };
                self.roles.push(role);
            }
            None => tracing::debug!("Ignoring ARN text without a role pair: {}", text),
        }

        Flow::Continue
    }

    fn finish(self) -> Self::Output {
        self.roles
    }
}

/// Decode a base64 SAML assertion to its XML text
pub fn decode_assertion(assertion: &str) -> Result<String> {
    let compact: String = assertion
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();

    let bytes = STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| AdfsError::InvalidAssertion(format!("base64 decode failed: {}", e)))?;

    String::from_utf8(bytes)
        .map_err(|e| AdfsError::InvalidAssertion(format!("assertion is not UTF-8: {}", e)))
}

/// Extract the assumable roles from a base64 SAML assertion, in document order.
///
/// An assertion without any role attribute yields an empty list.
pub fn parse_roles(assertion: &str) -> Result<Vec<RoleCandidate>> {
    let xml = decode_assertion(assertion)?;

    let roles = scanner::scan(&xml, CaseMode::Sensitive, RoleCollector::default())
        .map_err(|e| AdfsError::InvalidAssertion(e.to_string()))?;

    tracing::debug!("Found {} role(s) in SAML assertion", roles.len());
    Ok(roles)
}
