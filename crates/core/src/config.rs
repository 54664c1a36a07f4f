use serde::Deserialize;
use std::path::Path;
use uuid::Uuid;

/// Root application configuration. Loaded from an optional TOML file and
/// environment variables with the prefix `MKTOPS__`.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_service_name")]
    pub service_name: String,
    #[serde(default)]
    pub versioning: VersioningConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VersioningConfig {
    /// Total attempts (first try included) when an append hits a version conflict.
    #[serde(default = "default_max_conflict_attempts")]
    pub max_conflict_attempts: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_seed_demo_data")]
    pub seed_demo_data: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// 0 disables expiry.
    #[serde(default = "default_session_ttl_hours")]
    pub session_ttl_hours: u32,
    #[serde(default)]
    pub sessions: Vec<SessionConfig>,
}

/// A pre-issued session, standing in for the external identity provider.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub token: String,
    pub user_id: Uuid,
    pub display_name: String,
    #[serde(default)]
    pub organizations: Vec<Uuid>,
}

fn default_service_name() -> String {
    "content-versioner".to_string()
}
fn default_max_conflict_attempts() -> u32 {
    3
}
fn default_seed_demo_data() -> bool {
    false
}
fn default_session_ttl_hours() -> u32 {
    24
}

impl Default for VersioningConfig {
    fn default() -> Self {
        Self {
            max_conflict_attempts: default_max_conflict_attempts(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            seed_demo_data: default_seed_demo_data(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_ttl_hours: default_session_ttl_hours(),
            sessions: Vec::new(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            versioning: VersioningConfig::default(),
            store: StoreConfig::default(),
            auth: AuthConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables only.
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration from an optional TOML file, then environment
    /// variables. Environment values win.
    pub fn load_from(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            tracing::debug!(path = %path.display(), "Reading config file");
            builder = builder.add_source(
                config::File::from(path)
                    .format(config::FileFormat::Toml)
                    .required(true),
            );
        }

        let config = builder
            .add_source(
                config::Environment::with_prefix("MKTOPS")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        let mut cfg: Self = config.try_deserialize()?;
        if cfg.versioning.max_conflict_attempts == 0 {
            tracing::warn!("versioning.max_conflict_attempts was 0, using 1");
            cfg.versioning.max_conflict_attempts = 1;
        }
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.service_name, "content-versioner");
        assert_eq!(cfg.versioning.max_conflict_attempts, 3);
        assert!(!cfg.store.seed_demo_data);
        assert_eq!(cfg.auth.session_ttl_hours, 24);
        assert!(cfg.auth.sessions.is_empty());
    }

    #[test]
    fn test_load_from_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[versioning]
max_conflict_attempts = 5

[store]
seed_demo_data = true

[[auth.sessions]]
token = "sess-editor"
user_id = "6f1c2c1e-3d0b-4c55-9d7e-0c9a3b3b1a01"
display_name = "Editor"
organizations = ["0b7f5e4a-1111-4a2b-8c3d-222233334444"]
"#
        )
        .unwrap();

        let cfg = AppConfig::load_from(Some(file.path())).unwrap();
        assert_eq!(cfg.versioning.max_conflict_attempts, 5);
        assert!(cfg.store.seed_demo_data);
        assert_eq!(cfg.auth.sessions.len(), 1);
        assert_eq!(cfg.auth.sessions[0].token, "sess-editor");
        assert_eq!(cfg.auth.sessions[0].organizations.len(), 1);
        // Unset keys keep their defaults.
        assert_eq!(cfg.auth.session_ttl_hours, 24);
    }

    #[test]
    fn test_zero_attempts_is_clamped() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[versioning]\nmax_conflict_attempts = 0").unwrap();
        let cfg = AppConfig::load_from(Some(file.path())).unwrap();
        assert_eq!(cfg.versioning.max_conflict_attempts, 1);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result = AppConfig::load_from(Some(Path::new("/nonexistent/mktops.toml")));
        assert!(result.is_err());
    }
}
