/// Database connection management and schema creation
pub mod database;

/// Application settings loaded from config.toml and the environment
pub mod settings;
