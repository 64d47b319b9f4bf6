// Scrapers for the two ADFS pages this flow reads
use crate::scanner::{self, CaseMode, Flow, OpenTag, ScanError, TagHandler};
use regex::Regex;
use std::sync::OnceLock;

/// Bytes of raw markup inspected after the `errorText` element
pub const ERROR_TEXT_WINDOW: usize = 300;

const LOGIN_FORM_ID: &str = "loginForm";
const ASSERTION_INPUT: &str = "SAMLResponse";
const ERROR_ELEMENT_ID: &str = "errorText";
const EMPTY_ERROR_MESSAGE: &str = "the identity provider rejected the sign-in without a message";

/// What the IdP answered to a credential POST
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    /// Base64 SAML assertion, as embedded in the page
    Assertion(String),
    /// Error message surfaced next to the `errorText` element
    Rejected(String),
    Unrecognized,
}

struct LoginFormFinder {
    action: Option<String>,
}

impl TagHandler for LoginFormFinder {
    type Output = Option<String>;

    fn open_tag(&mut self, tag: &OpenTag<'_>) -> Flow {
        if !tag.is("form") || tag.attr("id") != Some(LOGIN_FORM_ID) {
            return Flow::Continue;
        }

        match tag.attr("action") {
            Some(action) => {
                self.action = Some(action.to_string());
                Flow::Stop
            }
            None => {
                tracing::debug!("Login form at byte {} has no action", tag.offset);
                Flow::Continue
            }
        }
    }

    fn finish(self) -> Self::Output {
        self.action
    }
}

/// Action of the first `<form id="loginForm">` on the page
pub fn find_login_form_action(page: &str) -> Result<Option<String>, ScanError> {
    scanner::scan(page, CaseMode::Insensitive, LoginFormFinder { action: None })
}

#[derive(Default)]
struct LoginResponseScanner {
    assertion: Option<String>,
    error: Option<String>,
}

impl TagHandler for LoginResponseScanner {
    type Output = LoginOutcome;

    fn open_tag(&mut self, tag: &OpenTag<'_>) -> Flow {
        if tag.is("input") && tag.attr("name") == Some(ASSERTION_INPUT) {
            if let Some(value) = tag.attr("value") {
                self.assertion = Some(value.to_string());
                return Flow::Stop;
            }
        }

        if self.error.is_none() && tag.attr("id") == Some(ERROR_ELEMENT_ID) {
            self.error = Some(error_message(tag.following_text(ERROR_TEXT_WINDOW)));
        }

        Flow::Continue
    }

    fn finish(self) -> Self::Output {
        match (self.assertion, self.error) {
            (Some(assertion), _) => LoginOutcome::Assertion(assertion),
            (None, Some(message)) => LoginOutcome::Rejected(message),
            (None, None) => LoginOutcome::Unrecognized,
        }
    }
}

/// Classify the page returned by the credential POST
pub fn scan_login_response(page: &str) -> Result<LoginOutcome, ScanError> {
    scanner::scan(page, CaseMode::Insensitive, LoginResponseScanner::default())
}

/// Text up to the first closing tag of the raw markup window.
///
/// The message is not a structured field; whatever precedes the first `</`
/// in the window is taken as the message.
fn error_message(window: &str) -> String {
    static UNTIL_CLOSING_TAG: OnceLock<Regex> = OnceLock::new();
    let pattern =
        UNTIL_CLOSING_TAG.get_or_init(|| Regex::new(r"(?s)^(.*?)</").expect("valid pattern"));

    let message = pattern
        .captures(window)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .unwrap_or(window)
        .trim();

    if message.is_empty() {
        EMPTY_ERROR_MESSAGE.to_string()
    } else {
        message.to_string()
    }
}
