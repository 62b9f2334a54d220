pub mod ndjson;
#[cfg(feature = "parquet")]
pub mod parquet;

use crate::error::Result;
use crate::schema::NormalizedRecord;
use serde::{Deserialize, Serialize};
use std::fmt;

#[cfg(not(feature = "parquet"))]
use crate::error::ExtractorError;

/// Output format for the landed batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Ndjson,
    Parquet,
}

impl OutputFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "ndjson" => Some(OutputFormat::Ndjson),
            "parquet" => Some(OutputFormat::Parquet),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Ndjson => "ndjson",
            OutputFormat::Parquet => "parquet",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            OutputFormat::Ndjson => "application/x-ndjson; charset=utf-8",
            OutputFormat::Parquet => "application/octet-stream",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Ndjson => "ndjson",
            OutputFormat::Parquet => "parquet",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Columnar codec capability, resolved once at startup. The codec is a
/// compile-time feature, so the answer never changes at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnarCodec {
    Available,
    Unavailable,
}

impl ColumnarCodec {
    pub fn resolve() -> Self {
        if cfg!(feature = "parquet") {
            ColumnarCodec::Available
        } else {
            ColumnarCodec::Unavailable
        }
    }
}

/// Two-step write plan: a primary format and at most one fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptPlan {
    pub primary: OutputFormat,
    pub fallback: Option<OutputFormat>,
}

impl AttemptPlan {
    /// Resolves the formats to try for a requested format under the given
    /// codec capability. A columnar request degrades to NDJSON up front when
    /// the codec is missing; otherwise NDJSON stays behind it as the one
    /// fallback. NDJSON itself never falls back.
    pub fn resolve(requested: OutputFormat, codec: ColumnarCodec) -> Self {
        match (requested, codec) {
            (OutputFormat::Parquet, ColumnarCodec::Available) => Self {
                primary: OutputFormat::Parquet,
                fallback: Some(OutputFormat::Ndjson),
            },
            (OutputFormat::Parquet, ColumnarCodec::Unavailable) => Self {
                primary: OutputFormat::Ndjson,
                fallback: None,
            },
            (OutputFormat::Ndjson, _) => Self {
                primary: OutputFormat::Ndjson,
                fallback: None,
            },
        }
    }
}

/// Encodes the batch in the given format.
pub fn encode(batch: &[NormalizedRecord], format: OutputFormat) -> Result<Vec<u8>> {
    match format {
        OutputFormat::Ndjson => ndjson::encode(batch),
        #[cfg(feature = "parquet")]
        OutputFormat::Parquet => parquet::encode(batch),
        #[cfg(not(feature = "parquet"))]
        OutputFormat::Parquet => Err(ExtractorError::Encode {
            message: "parquet codec not compiled into this build".to_string(),
        }),
    }
}
