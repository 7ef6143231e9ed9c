use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub identity_api_url: String,
    pub identity_secret_key: String,
    pub completion_api_url: String,
    pub completion_api_key: String,
    pub image_api_url: String,
    pub image_api_key: String,
    pub asset_api_url: String,
    pub asset_cloud_name: String,
    pub asset_api_key: String,
    pub asset_api_secret: String,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            identity_api_url: env_or("IDENTITY_API_URL", "https://api.clerk.com"),
            identity_secret_key: require_env("IDENTITY_SECRET_KEY")?,
            completion_api_url: env_or(
                "COMPLETION_API_URL",
                "https://generativelanguage.googleapis.com/v1beta/openai",
            ),
            completion_api_key: require_env("COMPLETION_API_KEY")?,
            image_api_url: env_or("IMAGE_API_URL", "https://clipdrop-api.co"),
            image_api_key: require_env("IMAGE_API_KEY")?,
            asset_api_url: env_or("ASSET_API_URL", "https://api.cloudinary.com"),
            asset_cloud_name: require_env("ASSET_CLOUD_NAME")?,
            asset_api_key: require_env("ASSET_API_KEY")?,
            asset_api_secret: require_env("ASSET_API_SECRET")?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
