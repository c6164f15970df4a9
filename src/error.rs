use thiserror::Error;

#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication failed: {message}")]
    Auth { message: String },

    #[error("Raw document does not match expected tabular report shape: {0}")]
    Structure(String),

    #[error("Unknown or unusable column: {0}")]
    Column(String),
}

pub type Result<T> = std::result::Result<T, DashboardError>;
