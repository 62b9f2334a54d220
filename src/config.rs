use crate::encode::OutputFormat;
use crate::error::{ExtractorError, Result};
use crate::normalize::ValidationMode;
use std::env;
use tracing::warn;

pub const DEFAULT_PREFIX: &str = "raw/";

/// Runtime configuration, read from the environment.
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    /// Destination bucket for landed artifacts.
    pub bucket: String,
    /// Key prefix inside the bucket.
    pub prefix: String,
    /// Source feed URL.
    pub api_url: String,
    /// Requested output format.
    pub format: OutputFormat,
    /// Record validation policy.
    pub validation: ValidationMode,
}

impl ExtractorConfig {
    /// Reads configuration from the process environment. Missing required
    /// keys fail here, before any I/O happens.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let bucket = require(&get, "BUCKET")?;
        let api_url = require(&get, "API_URL")?;
        let prefix = get("PREFIX").unwrap_or_else(|| DEFAULT_PREFIX.to_string());

        // Unrecognized selector values fall back to the defaults rather than
        // failing the run; the selectors are case-insensitive.
        let format = match get("FILE_FORMAT") {
            Some(raw) => OutputFormat::parse(&raw).unwrap_or_else(|| {
                warn!("Unrecognized FILE_FORMAT {:?}, defaulting to ndjson", raw);
                OutputFormat::Ndjson
            }),
            None => OutputFormat::Ndjson,
        };

        let validation = match get("VALIDATION_MODE") {
            Some(raw) => ValidationMode::parse(&raw).unwrap_or_else(|| {
                warn!("Unrecognized VALIDATION_MODE {:?}, defaulting to lenient", raw);
                ValidationMode::Lenient
            }),
            None => ValidationMode::Lenient,
        };

        Ok(Self {
            bucket,
            prefix,
            api_url,
            format,
            validation,
        })
    }
}

fn require(get: &impl Fn(&str) -> Option<String>, key: &str) -> Result<String> {
    match get(key) {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ExtractorError::Config(format!("{} env var required", key))),
    }
}
