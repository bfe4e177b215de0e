//! Application configuration loaded from environment variables.

use givers_core::YearlyNormalization;

use crate::errors::{ApiError, Result};

#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the SQLite database file
    pub database_url: String,
    /// Port for the REST API server
    pub api_port: u16,
    /// Base URL of the external checkout provider
    pub checkout_base_url: String,
    /// Project whose achievement drives the navigation health mark
    pub platform_project_id: Option<String>,
    /// How yearly-interval amounts count toward monthly totals
    pub yearly_normalization: YearlyNormalization,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Config {
            database_url: env_var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:./givers.db".to_string()),
            api_port: env_var("API_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .map_err(|_| ApiError::Config("Invalid API_PORT".to_string()))?,
            checkout_base_url: env_var("CHECKOUT_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:9292".to_string()),
            platform_project_id: env_var("PLATFORM_PROJECT_ID").ok(),
            yearly_normalization: match env_var("YEARLY_PRORATE")
                .unwrap_or_else(|_| "true".to_string())
                .as_str()
            {
                "true" | "1" => YearlyNormalization::DivideBy12,
                "false" | "0" => YearlyNormalization::FaceValue,
                _ => return Err(ApiError::Config("Invalid YEARLY_PRORATE".to_string())),
            },
        })
    }
}

fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| ApiError::Config(format!("Missing env var: {key}")))
}
