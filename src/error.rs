use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractorError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Fetch failed: {message}")]
    Fetch { message: String },

    #[error("Payload shape not recognized: {0}")]
    Shape(String),

    #[error("Encoding failed: {message}")]
    Encode { message: String },

    #[error("Storage write failed: {message}")]
    Storage { message: String },
}

pub type Result<T> = std::result::Result<T, ExtractorError>;
