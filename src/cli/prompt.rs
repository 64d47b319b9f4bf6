// Interactive prompts; everything is written to stderr so stdout stays scriptable
use crate::error::{AdfsError, Result};
use crate::models::Account;
use std::io::{self, BufRead, Write};

pub fn username(current: Option<String>) -> Result<String> {
    if let Some(username) = current.filter(|u| !u.trim().is_empty()) {
        return Ok(username);
    }

    let username = read_line("Username: ")?;
    if username.is_empty() {
        return Err(AdfsError::ConfigError("A user name is required".to_string()));
    }
    Ok(username)
}

pub fn password() -> Result<String> {
    if let Ok(password) = std::env::var("ADFS_PASSWORD") {
        tracing::debug!("Using password from ADFS_PASSWORD");
        return Ok(password);
    }

    Ok(rpassword::prompt_password("Password: ")?)
}

/// Pick the account named by `query`, or ask when several are available
pub fn choose_account(accounts: &[Account], query: Option<&str>) -> Result<Account> {
    if let Some(query) = query {
        return find_account(accounts, query);
    }

    match accounts {
        [] => Err(AdfsError::NoAccounts),
        [only] => Ok(only.clone()),
        _ => {
            eprintln!("\nAvailable accounts:");
            for (i, account) in accounts.iter().enumerate() {
                eprintln!("  [{}] {}", i + 1, account.label());
            }

            let answer = read_line(&format!("Select an account [1-{}]: ", accounts.len()))?;
            let index = parse_choice(&answer, accounts.len()).ok_or_else(|| {
                AdfsError::ConfigError(format!("'{}' is not a valid selection", answer))
            })?;
            Ok(accounts[index].clone())
        }
    }
}

fn find_account(accounts: &[Account], query: &str) -> Result<Account> {
    let matching: Vec<&Account> = accounts.iter().filter(|a| a.matches(query)).collect();

    match matching.as_slice() {
        [] => Err(AdfsError::AccountNotFound(query.to_string())),
        [account] => Ok((*account).clone()),
        several => Err(AdfsError::ConfigError(format!(
            "'{}' matches {} accounts: {}",
            query,
            several.len(),
            several
                .iter()
                .map(|a| a.label())
                .collect::<Vec<_>>()
                .join(", ")
        ))),
    }
}

/// One-based menu answer to a zero-based index
fn parse_choice(answer: &str, count: usize) -> Option<usize> {
    answer
        .trim()
        .parse::<usize>()
        .ok()
        .filter(|n| (1..=count).contains(n))
        .map(|n| n - 1)
}

fn read_line(prompt: &str) -> Result<String> {
    eprint!("{}", prompt);
    io::stderr().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}
