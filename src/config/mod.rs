/// Database configuration and connection management
pub mod database;

/// Application settings and reward policy from config.toml / environment
pub mod settings;

pub use settings::{AppConfig, load_app_configuration};
