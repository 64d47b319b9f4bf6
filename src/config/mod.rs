// Configuration management
use crate::error::{AdfsError, Result};
use crate::models::AccountMapping;
use crate::session::{FederationConfig, DEFAULT_REGION, DEFAULT_TIMEOUT};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const APP_DIR: &str = "adfs-aws";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub adfs: AdfsConfig,
    #[serde(default)]
    pub sts: StsConfig,
    /// Account id → display name
    #[serde(default)]
    pub accounts: AccountMapping,
    #[serde(default)]
    pub profile_defaults: ProfileDefaults,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdfsConfig {
    pub directory_domain: Option<String>,
    pub domain: Option<String>,
    pub username: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}

impl Default for AdfsConfig {
    fn default() -> Self {
        Self {
            directory_domain: None,
            domain: None,
            username: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StsConfig {
    pub region: Option<String>,
    pub duration_seconds: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProfileDefaults {
    pub profile: Option<String>,
    pub region: Option<String>,
    pub output: Option<String>,
}

impl Config {
    /// Get the config directory path
    ///
    /// Priority:
    /// 1. XDG_CONFIG_HOME/adfs-aws (if env var is set)
    /// 2. ~/.config/adfs-aws (if ~/.config exists)
    /// 3. ~/.adfs-aws (fallback on Unix)
    /// 4. Platform default on Windows
    pub fn config_dir() -> Result<PathBuf> {
        if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
            return Ok(PathBuf::from(xdg_config).join(APP_DIR));
        }

        #[cfg(unix)]
        {
            if let Some(home_dir) = dirs::home_dir() {
                let xdg_config = home_dir.join(".config");
                if xdg_config.exists() {
                    return Ok(xdg_config.join(APP_DIR));
                }
                return Ok(home_dir.join(format!(".{}", APP_DIR)));
            }
        }

        #[cfg(not(unix))]
        {
            if let Some(config_dir) = dirs::config_dir() {
                return Ok(config_dir.join(APP_DIR));
            }
        }

        Err(AdfsError::ConfigError(
            "Could not determine config directory".to_string(),
        ))
    }

    pub fn config_file_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration from the default file, then apply environment overrides
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_file_path()?)?;
        config.apply_env();
        Ok(config)
    }

    /// Load configuration from `path`; a missing file yields the defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("Config file not found at {}, using defaults", path.display());
            return Ok(Config::default());
        }

        tracing::debug!("Loading config from: {}", path.display());
        let contents = fs::read_to_string(path)
            .map_err(|e| AdfsError::ConfigError(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&contents)
            .map_err(|e| AdfsError::ConfigError(format!("Failed to parse config file: {}", e)))
    }

    fn apply_env(&mut self) {
        if let Ok(directory_domain) = std::env::var("ADFS_DIRECTORY_DOMAIN") {
            tracing::debug!("Using ADFS_DIRECTORY_DOMAIN from environment: {}", directory_domain);
            self.adfs.directory_domain = Some(directory_domain);
        }

        if let Ok(domain) = std::env::var("ADFS_DOMAIN") {
            tracing::debug!("Using ADFS_DOMAIN from environment: {}", domain);
            self.adfs.domain = Some(domain);
        }

        if let Ok(username) = std::env::var("ADFS_USERNAME") {
            self.adfs.username = Some(username);
        }

        if let Ok(region) = std::env::var("AWS_STS_REGION") {
            tracing::debug!("Using AWS_STS_REGION from environment: {}", region);
            self.sts.region = Some(region);
        }
    }

    pub fn is_complete(&self) -> bool {
        self.adfs
            .directory_domain
            .as_deref()
            .is_some_and(|d| !d.trim().is_empty())
    }

    /// Build the core configuration, failing if the ADFS server is unknown
    pub fn federation_config(&self) -> Result<FederationConfig> {
        let directory_domain = self
            .adfs
            .directory_domain
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .ok_or_else(|| {
                AdfsError::ConfigError(
                    "ADFS directory_domain not configured. Set it in the config file, \
                     use --directory-domain, or set ADFS_DIRECTORY_DOMAIN"
                        .to_string(),
                )
            })?;

        Ok(FederationConfig {
            directory_domain: directory_domain.to_string(),
            domain: self.adfs.domain.clone().unwrap_or_default(),
            account_mapping: self.accounts.clone(),
            region: self
                .sts
                .region
                .clone()
                .unwrap_or_else(|| DEFAULT_REGION.to_string()),
            duration_seconds: self.sts.duration_seconds,
            request_timeout: Duration::from_secs(self.adfs.timeout_secs),
        })
    }

    /// Create a sample config file with comments
    pub fn create_sample() -> Result<PathBuf> {
        let config_path = Self::config_file_path()?;
        Self::write_sample(&config_path)?;
        Ok(config_path)
    }

    fn write_sample(config_path: &Path) -> Result<()> {
        if let Some(config_dir) = config_path.parent() {
            if !config_dir.exists() {
                fs::create_dir_all(config_dir).map_err(|e| {
                    AdfsError::ConfigError(format!("Failed to create config directory: {}", e))
                })?;
            }
        }

        // Don't overwrite existing config
        if config_path.exists() {
            return Err(AdfsError::ConfigError(format!(
                "Config file already exists at: {}",
                config_path.display()
            )));
        }

        fs::write(config_path, SAMPLE_CONFIG)
            .map_err(|e| AdfsError::ConfigError(format!("Failed to write sample config: {}", e)))?;

        tracing::info!("Created sample config at: {}", config_path.display());
        Ok(())
    }
}

const SAMPLE_CONFIG: &str = r#"# adfs-aws configuration
# Location priority:
#   1. $XDG_CONFIG_HOME/adfs-aws/config.toml (if XDG_CONFIG_HOME is set)
#   2. ~/.config/adfs-aws/config.toml (if ~/.config exists)
#   3. ~/.adfs-aws/config.toml (fallback)
#
# Environment variables take precedence:
#   ADFS_DIRECTORY_DOMAIN, ADFS_DOMAIN, ADFS_USERNAME, AWS_STS_REGION

[adfs]
# Base URL of your ADFS server (required)
# Example: directory_domain = "https://sts.example.com"
directory_domain = ""

# Windows domain prepended to the user name (DOMAIN\user)
# Example: domain = "CORP"
domain = ""

# Request timeout in seconds
timeout_secs = 30

[sts]
# Region of the STS endpoint used for AssumeRoleWithSAML
region = "us-east-1"

# Requested session length in seconds (omit for the role's default)
# duration_seconds = 3600

[accounts]
# Friendly names shown instead of account ids
# "123456789012" = "production"

[profile_defaults]
# Profile written to ~/.aws/credentials by `adfs-aws login`
profile = "default"

# Region and output format written to ~/.aws/config
# region = "eu-west-1"
# output = "json"
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("config.toml")).unwrap();

        assert!(!config.is_complete());
        assert_eq!(config.adfs.timeout_secs, 30);
        assert!(config.accounts.is_empty());
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
[adfs]
directory_domain = "https://sts.example.com"
domain = "CORP"
timeout_secs = 10

[sts]
region = "eu-west-1"
duration_seconds = 3600

[accounts]
"123456789012" = "prod"
"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        let federation = config.federation_config().unwrap();

        assert_eq!(federation.directory_domain, "https://sts.example.com");
        assert_eq!(federation.domain, "CORP");
        assert_eq!(federation.region, "eu-west-1");
        assert_eq!(federation.duration_seconds, Some(3600));
        assert_eq!(federation.request_timeout, Duration::from_secs(10));
        assert_eq!(
            federation.account_mapping.get("123456789012").map(String::as_str),
            Some("prod")
        );
    }

    #[test]
    fn test_invalid_file_is_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[adfs\ndirectory_domain = ").unwrap();

        assert!(matches!(
            Config::load_from(&path),
            Err(AdfsError::ConfigError(_))
        ));
    }

    #[test]
    fn test_federation_config_requires_directory_domain() {
        let mut config = Config::default();
        assert!(matches!(
            config.federation_config(),
            Err(AdfsError::ConfigError(_))
        ));

        config.adfs.directory_domain = Some("https://sts.example.com".to_string());
        let federation = config.federation_config().unwrap();
        assert_eq!(federation.domain, "");
        assert_eq!(federation.region, DEFAULT_REGION);
    }

    #[test]
    fn test_sample_config_parses_and_is_not_overwritten() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        Config::write_sample(&path).unwrap();
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.profile_defaults.profile.as_deref(), Some("default"));
        assert!(!config.is_complete());

        assert!(Config::write_sample(&path).is_err());
    }
}
