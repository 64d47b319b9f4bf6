use super::{sign_in, ServerArgs};
use crate::cli::OutputFormat;
use crate::error::Result;

pub async fn execute(
    server: ServerArgs,
    username: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    let session = sign_in(server, username).await?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&session.accounts)?);
        }
        OutputFormat::Text if session.accounts.is_empty() => {
            println!("No roles could be assumed with this sign-in.");
        }
        OutputFormat::Text => {
            println!("Available accounts and roles:\n");
            for account in &session.accounts {
                let expires = session
                    .federation
                    .credentials(account)
                    .map(|c| c.expiration_display())
                    .unwrap_or_default();
                println!("  {:<40} {}  ({})", account.label(), account.arn, expires);
            }
        }
    }

    Ok(())
}
