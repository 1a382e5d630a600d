use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_ID_TOKEN_SECRET: &str = "podium-dev-id-token-secret-change-me-0001";
pub const DEFAULT_SESSION_SECRET: &str = "podium-dev-session-secret-change-me-00002";

/// Longest session cookie the identity provider will mint.
pub const MAX_SESSION_LIFETIME_DAYS: i64 = 14;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
    pub cors: CorsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory whose contents are served publicly.
    pub public_dir: PathBuf,
    /// Name of the uploads directory inside `public_dir`; also the URL prefix.
    pub uploads_dir: String,
    pub max_upload_size_mb: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub session_cookie_name: String,
    pub session_lifetime_days: i64,
    pub id_token_secret: String,
    pub id_token_issuer: String,
    pub session_secret: String,
    pub session_issuer: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            auth: AuthConfig::default(),
            cors: CorsConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            environment: "development".to_string(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            public_dir: PathBuf::from("./public"),
            uploads_dir: "uploads".to_string(),
            max_upload_size_mb: 50,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_cookie_name: "session".to_string(),
            session_lifetime_days: 14,
            id_token_secret: DEFAULT_ID_TOKEN_SECRET.to_string(),
            id_token_issuer: "podium-identity".to_string(),
            session_secret: DEFAULT_SESSION_SECRET.to_string(),
            session_issuer: "podium-session".to_string(),
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
        }
    }
}

impl StorageConfig {
    pub fn max_upload_size_bytes(&self) -> usize {
        (self.max_upload_size_mb as usize).saturating_mul(1024 * 1024)
    }

    pub fn uploads_root(&self) -> PathBuf {
        self.public_dir.join(&self.uploads_dir)
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .add_source(Config::try_from(&AppConfig::default())?);

        if std::path::Path::new("podium.toml").exists() {
            builder = builder.add_source(File::with_name("podium"));
        }

        builder = builder.add_source(
            Environment::with_prefix("PODIUM")
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

        if self.storage.uploads_dir.is_empty()
            || self.storage.uploads_dir.contains(['/', '\\'])
            || self.storage.uploads_dir == ".."
        {
            return Err(ConfigError::Message(
                "Uploads directory must be a single path segment".to_string(),
            ));
        }

        if self.storage.max_upload_size_mb == 0 {
            return Err(ConfigError::Message(
                "Max upload size must be greater than 0".to_string(),
            ));
        }

        if self.auth.session_cookie_name.is_empty() {
            return Err(ConfigError::Message(
                "Session cookie name cannot be empty".to_string(),
            ));
        }

        if self.auth.session_lifetime_days <= 0
            || self.auth.session_lifetime_days > MAX_SESSION_LIFETIME_DAYS
        {
            return Err(ConfigError::Message(format!(
                "Session lifetime must be between 1 and {} days",
                MAX_SESSION_LIFETIME_DAYS
            )));
        }

        for (name, secret) in [
            ("ID token", &self.auth.id_token_secret),
            ("Session", &self.auth.session_secret),
        ] {
            if secret.len() < 32 {
                return Err(ConfigError::Message(format!(
                    "{} secret must be at least 32 characters long",
                    name
                )));
            }
        }

        if self.auth.id_token_secret == DEFAULT_ID_TOKEN_SECRET
            || self.auth.session_secret == DEFAULT_SESSION_SECRET
        {
            tracing::warn!("Using default identity secrets - change these in production!");
        }

        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.server.environment.eq_ignore_ascii_case("production")
    }

    pub fn create_directories(&self) -> Result<(), std::io::Error> {
        std::fs::create_dir_all(self.storage.uploads_root())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
