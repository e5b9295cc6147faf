use crate::collections::IdStrategy;
use crate::records::{is_valid_email, Role};
use crate::session::Credential;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// A validation error in the configuration
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]: {}", self.field, self.message)
    }
}

/// Where collection reads and writes go
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSourceKind {
    /// The local collection store
    #[default]
    Local,
    /// The REST API
    Remote,
}

impl DataSourceKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "local" | "storage" => Some(Self::Local),
            "remote" | "api" | "rest" => Some(Self::Remote),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Remote => "remote",
        }
    }
}

/// Storage adapter selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Lives as long as the process, like a browser tab
    #[default]
    Memory,
    /// One JSON file per key under `storage.dir`
    File,
}

/// Configuration for the storage adapter
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: Option<StorageBackend>,
    #[serde(default)]
    pub dir: Option<PathBuf>,
    #[serde(default)]
    pub quota_bytes: Option<usize>,
    #[serde(default)]
    pub id_strategy: Option<IdStrategy>,
}

impl StorageConfig {
    pub fn backend(&self) -> StorageBackend {
        self.backend.unwrap_or_default()
    }

    pub fn dir(&self) -> PathBuf {
        self.dir
            .clone()
            .unwrap_or_else(|| Path::new(".sitebook").join("storage"))
    }

    pub fn id_strategy(&self) -> IdStrategy {
        self.id_strategy.unwrap_or_default()
    }
}

/// Configuration for the REST data source
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ApiConfig {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

fn default_base_url() -> String {
    "http://localhost:5000/api".to_string()
}

fn default_api_timeout_ms() -> u64 {
    30_000
}

impl ApiConfig {
    pub fn base_url(&self) -> String {
        self.base_url.clone().unwrap_or_else(default_base_url)
    }

    pub fn timeout_ms(&self) -> u64 {
        self.timeout_ms.unwrap_or_else(default_api_timeout_ms)
    }
}

/// Configuration for inbound notifications
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct NotificationsConfig {
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub toast_ms: Option<u64>,
    #[serde(default)]
    pub chime: Option<bool>,
}

impl NotificationsConfig {
    pub fn enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }

    pub fn toast_ms(&self) -> u64 {
        self.toast_ms.unwrap_or(5_000)
    }

    pub fn chime(&self) -> bool {
        self.chime.unwrap_or(true)
    }
}

/// Configuration for the activity log
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct AuditConfig {
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

impl AuditConfig {
    pub fn enabled(&self) -> bool {
        self.enabled.unwrap_or(false)
    }

    pub fn dir(&self) -> PathBuf {
        self.dir
            .clone()
            .unwrap_or_else(|| Path::new(".sitebook").join("audit"))
    }
}

/// Built-in demo accounts
pub fn default_credentials() -> Vec<Credential> {
    vec![
        Credential {
            id: "1".to_string(),
            name: "Admin User".to_string(),
            email: "admin@construction.com".to_string(),
            role: Role::Admin,
            password: "password123".to_string(),
        },
        Credential {
            id: "2".to_string(),
            name: "Rajesh Kumar".to_string(),
            email: "rajesh@construction.com".to_string(),
            role: Role::SiteManager,
            password: "manager123".to_string(),
        },
    ]
}

/// Main configuration structure
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data_source: Option<DataSourceKind>,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub credentials: Vec<Credential>,
    #[serde(default)]
    pub notifications: NotificationsConfig,
    #[serde(default)]
    pub audit: AuditConfig,
}

impl Config {
    /// Defaults with the built-in credential table
    pub fn with_defaults() -> Self {
        Config {
            credentials: default_credentials(),
            ..Config::default()
        }
    }

    /// Load configuration from default paths
    /// Priority: local (.sitebook/config.local.toml) > project (.sitebook/config.toml) > user (~/.sitebook/config.toml)
    pub fn load() -> Result<Self> {
        let mut config = Self::with_defaults();

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".sitebook").join("config.toml");
            if user_config.exists() {
                config.merge(Self::load_from(&user_config)?);
            }
        }

        let project_config = Path::new(".sitebook").join("config.toml");
        if project_config.exists() {
            config.merge(Self::load_from(&project_config)?);
        }

        // Should be gitignored
        let local_config = Path::new(".sitebook").join("config.local.toml");
        if local_config.exists() {
            config.merge(Self::load_from(&local_config)?);
        }

        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Merge another config into this one (other takes priority)
    /// Scalars are overridden when set; a non-empty credential list replaces the table
    pub fn merge(&mut self, other: Config) {
        if other.data_source.is_some() {
            self.data_source = other.data_source;
        }

        if other.storage.backend.is_some() {
            self.storage.backend = other.storage.backend;
        }
        if other.storage.dir.is_some() {
            self.storage.dir = other.storage.dir;
        }
        if other.storage.quota_bytes.is_some() {
            self.storage.quota_bytes = other.storage.quota_bytes;
        }
        if other.storage.id_strategy.is_some() {
            self.storage.id_strategy = other.storage.id_strategy;
        }

        if other.api.base_url.is_some() {
            self.api.base_url = other.api.base_url;
        }
        if other.api.timeout_ms.is_some() {
            self.api.timeout_ms = other.api.timeout_ms;
        }

        if !other.credentials.is_empty() {
            self.credentials = other.credentials;
        }

        if other.notifications.enabled.is_some() {
            self.notifications.enabled = other.notifications.enabled;
        }
        if other.notifications.toast_ms.is_some() {
            self.notifications.toast_ms = other.notifications.toast_ms;
        }
        if other.notifications.chime.is_some() {
            self.notifications.chime = other.notifications.chime;
        }

        if other.audit.enabled.is_some() {
            self.audit.enabled = other.audit.enabled;
        }
        if other.audit.dir.is_some() {
            self.audit.dir = other.audit.dir;
        }
    }

    pub fn data_source(&self) -> DataSourceKind {
        self.data_source.unwrap_or_default()
    }

    /// Validate configuration and return any errors found
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if self.credentials.is_empty() {
            errors.push(ValidationError {
                field: "credentials".to_string(),
                message: "At least one credential is required".to_string(),
            });
        }

        let mut ids = HashSet::new();
        let mut emails = HashSet::new();
        for (i, credential) in self.credentials.iter().enumerate() {
            if !is_valid_email(&credential.email) {
                errors.push(ValidationError {
                    field: format!("credentials[{}].email", i),
                    message: format!("Invalid email '{}'", credential.email),
                });
            }
            if credential.password.is_empty() {
                errors.push(ValidationError {
                    field: format!("credentials[{}].password", i),
                    message: "Password must not be empty".to_string(),
                });
            }
            if !ids.insert(credential.id.clone()) {
                errors.push(ValidationError {
                    field: format!("credentials[{}].id", i),
                    message: format!("Duplicate id '{}'", credential.id),
                });
            }
            // Login compares emails case-insensitively
            if !emails.insert(credential.email.trim().to_lowercase()) {
                errors.push(ValidationError {
                    field: format!("credentials[{}].email", i),
                    message: format!("Duplicate email '{}'", credential.email),
                });
            }
        }

        let base_url = self.api.base_url();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            errors.push(ValidationError {
                field: "api.base_url".to_string(),
                message: format!("Expected an http(s) URL, got '{}'", base_url),
            });
        }
        if self.api.timeout_ms() == 0 {
            errors.push(ValidationError {
                field: "api.timeout_ms".to_string(),
                message: "Must be greater than 0".to_string(),
            });
        }

        if self.storage.quota_bytes == Some(0) {
            errors.push(ValidationError {
                field: "storage.quota_bytes".to_string(),
                message: "Must be greater than 0".to_string(),
            });
        }
        if self.storage.quota_bytes.is_some() && self.storage.backend() == StorageBackend::File {
            errors.push(ValidationError {
                field: "storage.quota_bytes".to_string(),
                message: "Only the memory backend enforces a quota".to_string(),
            });
        }

        if self.notifications.toast_ms() == 0 {
            errors.push(ValidationError {
                field: "notifications.toast_ms".to_string(),
                message: "Must be greater than 0".to_string(),
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_validate_default_config() {
        let config = Config::with_defaults();
        assert!(config.validate().is_ok());
        assert_eq!(config.data_source(), DataSourceKind::Local);
        assert_eq!(config.storage.backend(), StorageBackend::Memory);
        assert_eq!(config.api.base_url(), "http://localhost:5000/api");
        assert_eq!(config.notifications.toast_ms(), 5_000);
    }

    #[test]
    fn test_validate_missing_credentials() {
        let config = Config::default();
        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "credentials");
    }

    #[test]
    fn test_validate_duplicate_email_ignores_case() {
        let mut config = Config::with_defaults();
        let mut dup = config.credentials[0].clone();
        dup.id = "3".to_string();
        dup.email = "ADMIN@construction.com".to_string();
        config.credentials.push(dup);

        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("Duplicate email"));
    }

    #[test]
    fn test_validate_bad_email_and_password() {
        let mut config = Config::with_defaults();
        config.credentials[1].email = "rajesh".to_string();
        config.credentials[1].password = String::new();
        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(|e| e.field.starts_with("credentials[1]")));
    }

    #[test]
    fn test_validate_api_url() {
        let mut config = Config::with_defaults();
        config.api.base_url = Some("localhost:5000".to_string());
        let errors = config.validate().unwrap_err();
        assert_eq!(errors[0].field, "api.base_url");
    }

    #[test]
    fn test_validate_quota_on_file_backend() {
        let mut config = Config::with_defaults();
        config.storage.backend = Some(StorageBackend::File);
        config.storage.quota_bytes = Some(1024);
        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("memory backend"));
    }

    #[test]
    fn test_load_and_merge() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
data_source = "remote"

[storage]
backend = "file"
dir = "/tmp/sitebook"
id_strategy = "timestamp"

[api]
base_url = "https://sites.example.com/api"

[notifications]
chime = false

[[credentials]]
id = "7"
name = "Priya"
email = "priya@construction.com"
role = "sitemanager"
password = "site-pass"
"#,
        )
        .unwrap();

        let mut config = Config::with_defaults();
        config.merge(Config::load_from(&path).unwrap());

        assert_eq!(config.data_source(), DataSourceKind::Remote);
        assert_eq!(config.storage.backend(), StorageBackend::File);
        assert_eq!(config.storage.dir(), PathBuf::from("/tmp/sitebook"));
        assert_eq!(config.storage.id_strategy(), IdStrategy::Timestamp);
        assert_eq!(config.api.base_url(), "https://sites.example.com/api");
        assert_eq!(config.api.timeout_ms(), 30_000);
        assert!(!config.notifications.chime());
        assert!(config.notifications.enabled());
        assert_eq!(config.credentials.len(), 1);
        assert_eq!(config.credentials[0].role, Role::SiteManager);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_merge_keeps_unset_values() {
        let mut config = Config::with_defaults();
        config.api.base_url = Some("https://a.example.com/api".to_string());
        config.merge(Config::default());
        assert_eq!(config.api.base_url(), "https://a.example.com/api");
        assert_eq!(config.credentials.len(), 2);
    }

    #[test]
    fn test_parse_kinds() {
        assert_eq!(DataSourceKind::parse("API"), Some(DataSourceKind::Remote));
        assert_eq!(DataSourceKind::parse("local"), Some(DataSourceKind::Local));
        assert!(DataSourceKind::parse("cloud").is_none());
        assert_eq!(IdStrategy::parse("UUID"), Some(IdStrategy::Uuid));
    }
}
