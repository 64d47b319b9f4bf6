// Writes assumed-role credentials into the shared AWS files
use crate::error::{AdfsError, Result};
use crate::models::{Account, TemporaryCredential};
use std::fs;
use std::path::{Path, PathBuf};

/// Settings written to `~/.aws/config` next to the credentials
#[derive(Debug, Clone, Default)]
pub struct ProfileSettings<'a> {
    pub region: Option<&'a str>,
    pub output: Option<&'a str>,
}

pub fn aws_dir() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|home| home.join(".aws"))
        .ok_or_else(|| AdfsError::ConfigError("Could not determine home directory".to_string()))
}

/// Store `credential` under `profile` in `~/.aws/credentials` and its
/// settings in `~/.aws/config`
pub fn write_credentials(
    profile: &str,
    account: &Account,
    credential: &TemporaryCredential,
    settings: &ProfileSettings<'_>,
) -> Result<PathBuf> {
    let dir = aws_dir()?;
    write_credentials_in(&dir, profile, account, credential, settings)?;
    Ok(dir.join("credentials"))
}

fn write_credentials_in(
    dir: &Path,
    profile: &str,
    account: &Account,
    credential: &TemporaryCredential,
    settings: &ProfileSettings<'_>,
) -> Result<()> {
    fs::create_dir_all(dir).map_err(|e| {
        AdfsError::ConfigError(format!("Failed to create {}: {}", dir.display(), e))
    })?;

    let comments = [
        format!("# Account: {} ({})", account.account_id, account.display_name),
        format!("# Role: {}", account.role_name()),
        format!("# Expiration: {}", credential.expiration.to_rfc3339()),
    ];
    rewrite_file(&dir.join("credentials"), |content| {
        upsert_section(
            content,
            profile,
            &comments,
            &[
                ("aws_access_key_id", credential.access_key_id.as_str()),
                ("aws_secret_access_key", credential.secret_access_key.as_str()),
                ("aws_session_token", credential.session_token.as_str()),
            ],
        )
    })?;
    tracing::debug!("Wrote credentials for profile {}", profile);

    let mut entries = Vec::new();
    if let Some(region) = settings.region {
        entries.push(("region", region));
    }
    if let Some(output) = settings.output {
        entries.push(("output", output));
    }
    if entries.is_empty() {
        return Ok(());
    }

    let section = config_section(profile);
    rewrite_file(&dir.join("config"), |content| {
        upsert_section(content, &section, &[], &entries)
    })
}

/// `~/.aws/config` names non-default profiles `[profile <name>]`
fn config_section(profile: &str) -> String {
    if profile == "default" {
        profile.to_string()
    } else {
        format!("profile {}", profile)
    }
}

fn rewrite_file(path: &Path, update: impl FnOnce(&str) -> String) -> Result<()> {
    let existing = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => {
            return Err(AdfsError::ConfigError(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            )))
        }
    };

    fs::write(path, update(&existing))
        .map_err(|e| AdfsError::ConfigError(format!("Failed to write {}: {}", path.display(), e)))
}

fn section_name(line: &str) -> Option<&str> {
    line.trim()
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .map(str::trim)
}

/// Replace the listed keys and metadata comments of the first `section`,
/// keeping its other keys and comments and every other section untouched.
/// A missing section is appended.
fn upsert_section(
    content: &str,
    section: &str,
    comments: &[String],
    entries: &[(&str, &str)],
) -> String {
    // A comment is ours when it starts like one we write, e.g. "# Role:"
    let ours: Vec<&str> = comments
        .iter()
        .filter_map(|c| c.split_once(':').map(|(label, _)| label))
        .collect();

    let mut out: Vec<String> = Vec::new();
    let mut found = false;
    let mut lines = content.lines().peekable();

    while let Some(line) = lines.next() {
        if found || section_name(line) != Some(section) {
            out.push(line.to_string());
            continue;
        }

        found = true;
        let mut kept = Vec::new();
        while let Some(next) = lines.peek() {
            if section_name(next).is_some() {
                break;
            }
            let body = next.trim();
            let replaced = if body.starts_with('#') {
                body.split_once(':')
                    .is_some_and(|(label, _)| ours.contains(&label.trim_end()))
            } else {
                body.split_once('=')
                    .is_some_and(|(key, _)| entries.iter().any(|(k, _)| *k == key.trim()))
            };
            if !body.is_empty() && !replaced {
                kept.push(next.to_string());
            }
            lines.next();
        }

        out.extend(render_section(section, comments, entries));
        out.extend(kept);
        out.push(String::new());
    }

    if !found {
        out.push(String::new());
        out.extend(render_section(section, comments, entries));
    }

    tidy(&out)
}

fn render_section(section: &str, comments: &[String], entries: &[(&str, &str)]) -> Vec<String> {
    std::iter::once(format!("[{}]", section))
        .chain(comments.iter().cloned())
        .chain(entries.iter().map(|(k, v)| format!("{} = {}", k, v)))
        .collect()
}

/// One blank line between sections, none leading or trailing
fn tidy(lines: &[String]) -> String {
    let mut result = String::new();
    let mut previous_blank = true;

    for line in lines {
        let blank = line.trim().is_empty();
        if blank && previous_blank {
            continue;
        }
        result.push_str(line);
        result.push('\n');
        previous_blank = blank;
    }

    while result.ends_with("\n\n") {
        result.pop();
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AccountMapping;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    fn entries() -> Vec<(&'static str, &'static str)> {
        vec![("aws_access_key_id", "AKIANEW"), ("aws_session_token", "tok")]
    }

    #[test]
    fn test_upsert_appends_missing_section() {
        let content = "[other]\naws_access_key_id = AKIAOTHER\n";
        let updated = upsert_section(content, "work", &["# Role: Admin".to_string()], &entries());

        assert_eq!(
            updated,
            "[other]\naws_access_key_id = AKIAOTHER\n\n[work]\n# Role: Admin\naws_access_key_id = AKIANEW\naws_session_token = tok\n"
        );
    }

    #[test]
    fn test_upsert_replaces_keys_and_comments_in_place() {
        let content = "[work]\n# Role: Old\naws_access_key_id = AKIAOLD\nregion_hint = keep\n\n[other]\nkey = value\n";
        let updated = upsert_section(content, "work", &["# Role: New".to_string()], &entries());

        assert_eq!(
            updated,
            "[work]\n# Role: New\naws_access_key_id = AKIANEW\naws_session_token = tok\nregion_hint = keep\n\n[other]\nkey = value\n"
        );
    }

    #[test]
    fn test_upsert_keeps_user_comments() {
        let content = "[work]\n# rotated by hand, see ticket OPS-12\n# Role: Old\naws_access_key_id = AKIAOLD\n";
        let updated = upsert_section(content, "work", &["# Role: New".to_string()], &entries());

        assert_eq!(
            updated,
            "[work]\n# Role: New\naws_access_key_id = AKIANEW\naws_session_token = tok\n# rotated by hand, see ticket OPS-12\n"
        );
    }

    #[test]
    fn test_upsert_rewrites_only_first_duplicate_section() {
        let content = "[work]\naws_access_key_id = AKIA1\n\n[work]\naws_access_key_id = AKIA2\n";
        let updated = upsert_section(content, "work", &[], &entries());

        assert_eq!(
            updated,
            "[work]\naws_access_key_id = AKIANEW\naws_session_token = tok\n\n[work]\naws_access_key_id = AKIA2\n"
        );
    }

    #[test]
    fn test_upsert_into_empty_file() {
        let updated = upsert_section("", "default", &[], &[("region", "eu-west-1")]);
        assert_eq!(updated, "[default]\nregion = eu-west-1\n");
    }

    #[test]
    fn test_config_section_naming() {
        assert_eq!(config_section("default"), "default");
        assert_eq!(config_section("work"), "profile work");
    }

    #[test]
    fn test_write_credentials_in_directory() {
        let dir = TempDir::new().unwrap();
        let mut mapping = AccountMapping::new();
        mapping.insert("123456789012".to_string(), "prod".to_string());
        let account = Account::from_role_arn("arn:aws:iam::123456789012:role/Admin", &mapping);
        let credential = TemporaryCredential {
            role_arn: account.arn.clone(),
            access_key_id: "AKIA1".to_string(),
            secret_access_key: "s3cret".to_string(),
            session_token: "tok".to_string(),
            expiration: Utc.with_ymd_and_hms(2030, 1, 1, 12, 0, 0).unwrap(),
        };
        let settings = ProfileSettings {
            region: Some("eu-west-1"),
            output: Some("json"),
        };

        write_credentials_in(dir.path(), "work", &account, &credential, &settings).unwrap();

        let credentials = fs::read_to_string(dir.path().join("credentials")).unwrap();
        assert_eq!(
            credentials,
            "[work]\n# Account: 123456789012 (prod)\n# Role: Admin\n# Expiration: 2030-01-01T12:00:00+00:00\naws_access_key_id = AKIA1\naws_secret_access_key = s3cret\naws_session_token = tok\n"
        );

        let config = fs::read_to_string(dir.path().join("config")).unwrap();
        assert_eq!(config, "[profile work]\nregion = eu-west-1\noutput = json\n");
    }

    #[test]
    fn test_write_credentials_without_settings_skips_config() {
        let dir = TempDir::new().unwrap();
        let account = Account::from_role_arn(
            "arn:aws:iam::123456789012:role/Admin",
            &AccountMapping::new(),
        );
        let credential = TemporaryCredential {
            role_arn: account.arn.clone(),
            access_key_id: "AKIA1".to_string(),
            secret_access_key: "s3cret".to_string(),
            session_token: "tok".to_string(),
            expiration: Utc::now(),
        };

        write_credentials_in(
            dir.path(),
            "default",
            &account,
            &credential,
            &ProfileSettings::default(),
        )
        .unwrap();

        assert!(dir.path().join("credentials").exists());
        assert!(!dir.path().join("config").exists());
    }
}
