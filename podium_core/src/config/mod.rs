pub mod settings;

pub use settings::{
    AppConfig, AuthConfig, CorsConfig, ServerConfig, StorageConfig, MAX_SESSION_LIFETIME_DAYS,
};
