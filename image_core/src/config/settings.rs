use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_MAX_FILE_SIZE: u64 = 10_000_000;

pub const DEFAULT_ALLOWED_CONTENT_TYPES: [&str; 4] =
    ["image/jpeg", "image/png", "image/gif", "image/webp"];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub cors: CorsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Where uploads land and what they may look like.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub upload_dir: PathBuf,
    /// Upper bound in bytes, inclusive.
    pub max_file_size: u64,
    pub allowed_content_types: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Empty means any origin.
    pub allowed_origins: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            cors: CorsConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("uploaded_images"),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            allowed_content_types: DEFAULT_ALLOWED_CONTENT_TYPES
                .iter()
                .map(|t| t.to_string())
                .collect(),
        }
    }
}

impl StorageConfig {
    pub fn with_upload_dir(upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            upload_dir: upload_dir.into(),
            ..Self::default()
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .add_source(Config::try_from(&AppConfig::default())?);

        if std::path::Path::new("config.toml").exists() {
            builder = builder.add_source(File::with_name("config"));
        }

        // APP_STORAGE__UPLOAD_DIR -> storage.upload_dir
        builder = builder.add_source(
            Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        let app_config: AppConfig = config.try_deserialize()?;

        app_config.validate()?;

        Ok(app_config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Message("Server port cannot be 0".to_string()));
        }

        if self.storage.upload_dir.as_os_str().is_empty() {
            return Err(ConfigError::Message(
                "Upload directory cannot be empty".to_string(),
            ));
        }

        if self.storage.max_file_size == 0 {
            return Err(ConfigError::Message(
                "Max file size must be greater than 0".to_string(),
            ));
        }

        if self.storage.allowed_content_types.is_empty() {
            return Err(ConfigError::Message(
                "At least one content type must be allowed".to_string(),
            ));
        }

        if self.cors.allowed_origins.is_empty() {
            tracing::warn!("No CORS origins configured - allowing any origin");
        }

        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.storage.upload_dir, PathBuf::from("uploaded_images"));
        assert_eq!(config.storage.max_file_size, 10_000_000);
        assert_eq!(
            config.storage.allowed_content_types,
            vec!["image/jpeg", "image/png", "image/gif", "image/webp"]
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = AppConfig::default();

        config.server.port = 0;
        assert!(config.validate().is_err());

        config = AppConfig::default();
        config.storage.max_file_size = 0;
        assert!(config.validate().is_err());

        config = AppConfig::default();
        config.storage.allowed_content_types.clear();
        assert!(config.validate().is_err());

        config = AppConfig::default();
        config.storage.upload_dir = PathBuf::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bind_address() {
        let config = AppConfig::default();
        assert_eq!(config.bind_address(), "127.0.0.1:3000");

        let mut config = AppConfig::default();
        config.server.host = "0.0.0.0".to_string();
        config.server.port = 8080;
        assert_eq!(config.bind_address(), "0.0.0.0:8080");
    }

    #[test]
    fn test_config_loading() {
        let config = AppConfig::load().expect("Should load default configuration");

        assert!(!config.server.host.is_empty());
        assert!(config.server.port > 0);
        assert!(config.storage.max_file_size > 0);
        assert!(!config.storage.allowed_content_types.is_empty());
    }

    #[test]
    fn test_storage_config_with_upload_dir() {
        let storage = StorageConfig::with_upload_dir("/tmp/images");
        assert_eq!(storage.upload_dir, PathBuf::from("/tmp/images"));
        assert_eq!(storage.max_file_size, DEFAULT_MAX_FILE_SIZE);
    }

    #[test]
    fn test_empty_defaults_survive_layering() {
        // Empty collections are dropped when defaults are fed back through `config`.
        let config = Config::builder()
            .add_source(Config::try_from(&AppConfig::default()).unwrap())
            .build()
            .unwrap();
        let app_config: AppConfig = config.try_deserialize().unwrap();

        assert!(app_config.cors.allowed_origins.is_empty());
        assert_eq!(app_config.storage.max_file_size, DEFAULT_MAX_FILE_SIZE);
        assert!(app_config.validate().is_ok());
    }

    #[test]
    fn test_partial_sections_fall_back_to_defaults() {
        let config = Config::builder()
            .add_source(File::from_str("[server]\nport = 8080\n", FileFormat::Toml))
            .build()
            .unwrap();
        let app_config: AppConfig = config.try_deserialize().unwrap();

        assert_eq!(app_config.server.port, 8080);
        assert_eq!(app_config.server.host, "127.0.0.1");
        assert_eq!(app_config.storage.upload_dir, PathBuf::from("uploaded_images"));
        assert!(app_config.cors.allowed_origins.is_empty());
    }
}
