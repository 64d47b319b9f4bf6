use super::{sign_in, ServerArgs};
use crate::aws_config::{self, ProfileSettings};
use crate::cli::prompt;
use crate::error::{AdfsError, Result};
use crate::session::DEFAULT_REGION;

pub async fn execute(
    server: ServerArgs,
    username: Option<String>,
    account: Option<String>,
    profile: Option<String>,
    export: bool,
) -> Result<()> {
    let session = sign_in(server, username).await?;
    if session.accounts.is_empty() {
        return Err(AdfsError::NoAccounts);
    }

    let account = prompt::choose_account(&session.accounts, account.as_deref())?;
    let creds = session
        .federation
        .credentials(&account)
        .ok_or_else(|| AdfsError::AccountNotFound(account.arn.clone()))?;

    let defaults = &session.config.profile_defaults;
    let region = defaults
        .region
        .as_deref()
        .or(session.config.sts.region.as_deref())
        .unwrap_or(DEFAULT_REGION);

    if export {
        println!("export AWS_ACCESS_KEY_ID=\"{}\"", creds.access_key_id);
        println!(
            "export AWS_SECRET_ACCESS_KEY=\"{}\"",
            creds.secret_access_key
        );
        println!("export AWS_SESSION_TOKEN=\"{}\"", creds.session_token);
        println!("export AWS_REGION=\"{}\"", region);
        println!(
            "# Credentials for {} expire at: {}",
            account.label(),
            creds.expiration.format("%Y-%m-%d %H:%M:%S UTC")
        );
        return Ok(());
    }

    let profile = profile
        .or_else(|| defaults.profile.clone())
        .unwrap_or_else(|| "default".to_string());
    let settings = ProfileSettings {
        region: Some(region),
        output: defaults.output.as_deref(),
    };

    let path = aws_config::write_credentials(&profile, &account, creds, &settings)?;

    eprintln!("✓ Wrote credentials to {}", path.display());
    eprintln!("  Account: {}", account.label());
    eprintln!("  Profile: {}", profile);
    eprintln!("  Region: {}", region);
    if let Some(output) = settings.output {
        eprintln!("  Output format: {}", output);
    }
    eprintln!("  Expires: {}", creds.expiration_display());
    eprintln!("\nUse with: aws sts get-caller-identity --profile {}", profile);

    Ok(())
}
