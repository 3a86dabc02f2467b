//! Configuration loading for the asset catalog CLI.

use ac_client::{AuthConfig, ClientConfig, RateLimitConfig, SecureString};
use ac_observability::{parse_level, LoggingConfig as ObservabilityConfig};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

const REDACTED: &str = "***REDACTED***";

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Catalog connection settings.
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Loads configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Loads `path` if given, otherwise the default file if it exists, otherwise defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let default = default_config_path();
                if default.exists() {
                    Self::load(&default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Saves configuration to a file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = serde_yaml::to_string(self)?;
        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Creates a copy with secrets redacted.
    pub fn redact_secrets(&self) -> Self {
        let mut config = self.clone();
        if !config.catalog.password.is_empty() {
            config.catalog.password = REDACTED.to_string();
        }
        if !config.catalog.encoded_auth.is_empty() {
            config.catalog.encoded_auth = REDACTED.to_string();
        }
        config
    }
}

/// Catalog connection settings as written in the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Base URL of the catalog host.
    #[serde(default)]
    pub base_url: String,

    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,

    /// Pre-encoded `username:password`; takes precedence over the pair.
    #[serde(default)]
    pub encoded_auth: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_true")]
    pub verify_tls: bool,

    #[serde(default)]
    pub headers: HashMap<String, String>,

    #[serde(default)]
    pub rate_limit: Option<RateLimitConfig>,
}

fn default_timeout() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            username: String::new(),
            password: String::new(),
            encoded_auth: String::new(),
            timeout_secs: default_timeout(),
            verify_tls: true,
            headers: HashMap::new(),
            rate_limit: None,
        }
    }
}

impl CatalogConfig {
    /// Builds the client configuration, validating it on the way.
    pub fn to_client_config(&self) -> Result<ClientConfig> {
        if self.base_url.trim().is_empty() {
            bail!("No catalog base_url configured (set it in the config file or pass --base-url)");
        }

        let auth = if !self.encoded_auth.is_empty() {
            AuthConfig::Encoded {
                token: SecureString::from(self.encoded_auth.as_str()),
            }
        } else if !self.username.is_empty() {
            AuthConfig::Basic {
                username: self.username.clone(),
                password: SecureString::from(self.password.as_str()),
            }
        } else {
            AuthConfig::None
        };

        let config = ClientConfig {
            name: "asset-catalog".to_string(),
            base_url: self.base_url.clone(),
            auth,
            timeout_secs: self.timeout_secs,
            verify_tls: self.verify_tls,
            headers: self.headers.clone(),
            rate_limit: self.rate_limit.clone(),
        };
        config.validate().context("Invalid catalog configuration")?;
        Ok(config)
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level used when no `-v` flag is given.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON log lines.
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl LoggingConfig {
    /// `-v` flags win over the configured level.
    pub fn to_observability(&self, verbose: u8) -> ObservabilityConfig {
        let config = if verbose > 0 {
            ObservabilityConfig::from_verbosity(verbose)
        } else {
            match parse_level(&self.level) {
                Some(level) => ObservabilityConfig::default().with_level(level),
                None => ObservabilityConfig::default(),
            }
        };
        config.with_json(self.json)
    }
}

pub fn default_config_path() -> PathBuf {
    if let Some(dirs) = directories::ProjectDirs::from("com", "asset-catalog", "asset-catalog") {
        dirs.config_dir().join("config.yaml")
    } else {
        PathBuf::from("config/asset-catalog.yaml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tracing::Level;

    const SAMPLE: &str = r#"
catalog:
  base_url: https://infosvr.example.com:9446
  username: isadmin
  password: isadmin
  timeout_secs: 60
  rate_limit:
    max_requests: 50
    period_secs: 60
    burst_size: 5
logging:
  level: info
"#;

    fn write_sample() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_from_yaml() {
        let file = write_sample();
        let config = AppConfig::load(file.path()).unwrap();

        assert_eq!(config.catalog.base_url, "https://infosvr.example.com:9446");
        assert_eq!(config.catalog.timeout_secs, 60);
        assert!(config.catalog.verify_tls);
        assert_eq!(config.catalog.rate_limit.as_ref().unwrap().burst_size, 5);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = AppConfig::load(&dir.path().join("absent.yaml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        let mut config = AppConfig::default();
        config.catalog.base_url = "https://catalog.internal".to_string();
        config.save(&path).unwrap();

        let reloaded = AppConfig::load(&path).unwrap();
        assert_eq!(reloaded.catalog.base_url, "https://catalog.internal");
        assert_eq!(reloaded.logging.level, "warn");
    }

    #[test]
    fn test_redact_secrets() {
        let file = write_sample();
        let config = AppConfig::load(file.path()).unwrap().redact_secrets();
        assert_eq!(config.catalog.password, REDACTED);
        assert_eq!(config.catalog.username, "isadmin");
        assert!(config.catalog.encoded_auth.is_empty());
    }

    #[test]
    fn test_client_config_auth_selection() {
        let mut catalog = CatalogConfig {
            base_url: "https://infosvr".to_string(),
            username: "isadmin".to_string(),
            password: "isadmin".to_string(),
            ..CatalogConfig::default()
        };
        let client = catalog.to_client_config().unwrap();
        assert_eq!(
            client.auth.authorization_header().unwrap().expose_secret(),
            "Basic aXNhZG1pbjppc2FkbWlu"
        );

        catalog.encoded_auth = "dXNlcjpwYXNz".to_string();
        let client = catalog.to_client_config().unwrap();
        assert_eq!(
            client.auth.authorization_header().unwrap().expose_secret(),
            "Basic dXNlcjpwYXNz"
        );
    }

    #[test]
    fn test_client_config_requires_base_url() {
        assert!(CatalogConfig::default().to_client_config().is_err());

        let catalog = CatalogConfig {
            base_url: "ftp://infosvr".to_string(),
            ..CatalogConfig::default()
        };
        assert!(catalog.to_client_config().is_err());
    }

    #[test]
    fn test_logging_levels() {
        let logging = LoggingConfig {
            level: "debug".to_string(),
            json: true,
        };
        let config = logging.to_observability(0);
        assert_eq!(config.level, Level::DEBUG);
        assert!(config.json_format);

        assert_eq!(logging.to_observability(3).level, Level::TRACE);
    }
}
