use crate::config::ExtractorConfig;
use crate::encode::{self, AttemptPlan, ColumnarCodec, OutputFormat};
use crate::error::Result;
use crate::fetch::{resolve_items, Fetcher};
use crate::normalize::Normalizer;
use crate::observability::metrics;
use crate::schema::NormalizedRecord;
use crate::storage::ObjectStore;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Terminal outcome of one extraction run. Serialized to stdout as the
/// machine-readable run report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExtractionReport {
    Ok {
        key: String,
        format: OutputFormat,
        records: usize,
    },
    NoRecords {
        fetched: usize,
    },
}

/// One-shot extraction pipeline: fetch the feed, normalize it, encode the
/// batch, land a single artifact.
pub struct Extractor {
    fetcher: Fetcher,
    normalizer: Normalizer,
    codec: ColumnarCodec,
    store: Arc<dyn ObjectStore>,
    config: ExtractorConfig,
}

impl Extractor {
    pub fn new(
        fetcher: Fetcher,
        normalizer: Normalizer,
        codec: ColumnarCodec,
        store: Arc<dyn ObjectStore>,
        config: ExtractorConfig,
    ) -> Self {
        Self {
            fetcher,
            normalizer,
            codec,
            store,
            config,
        }
    }

    /// Drives the pipeline to one of its terminal outcomes. Fetch and shape
    /// errors abort before anything is written; an empty post-filter batch
    /// short-circuits to `NoRecords` without touching storage.
    pub async fn run(&self) -> Result<ExtractionReport> {
        info!(
            url = %self.config.api_url,
            format = %self.config.format,
            validation = self.config.validation.as_str(),
            "Starting extraction run"
        );

        let payload = self.fetcher.fetch(&self.config.api_url).await?;
        let items = resolve_items(payload)?;
        let fetched = items.len();

        let batch: Vec<NormalizedRecord> = items
            .iter()
            .filter_map(|item| self.normalizer.normalize(item))
            .collect();
        let dropped = fetched - batch.len();
        metrics::normalize::records_emitted(batch.len() as u64);
        metrics::normalize::records_dropped(dropped as u64);
        if dropped > 0 {
            warn!(dropped, fetched, "Dropped records during normalization");
        }

        if batch.is_empty() {
            warn!(fetched, "No records to write after normalization");
            return Ok(ExtractionReport::NoRecords { fetched });
        }

        // One timestamp per run; both attempts land under the same base key.
        let base = artifact_base(&self.config.prefix, chrono::Utc::now().timestamp());
        let records = batch.len();

        let plan = AttemptPlan::resolve(self.config.format, self.codec);
        if plan.primary != self.config.format {
            info!(
                requested = %self.config.format,
                "Columnar codec unavailable, writing ndjson instead"
            );
        }

        match self.attempt(&batch, &base, plan.primary).await {
            Ok(key) => {
                info!(key = %key, format = %plan.primary, records, "Extraction run complete");
                Ok(ExtractionReport::Ok {
                    key,
                    format: plan.primary,
                    records,
                })
            }
            Err(primary_err) => match plan.fallback {
                Some(fallback) => {
                    metrics::encode::fallback();
                    warn!(
                        format = %plan.primary,
                        error = %primary_err,
                        "Write attempt failed, falling back to ndjson"
                    );
                    let key = self.attempt(&batch, &base, fallback).await?;
                    info!(key = %key, format = %fallback, records, "Extraction run complete");
                    Ok(ExtractionReport::Ok {
                        key,
                        format: fallback,
                        records,
                    })
                }
                None => Err(primary_err),
            },
        }
    }

    /// Encodes the batch in one format and writes it under the shared base key.
    async fn attempt(
        &self,
        batch: &[NormalizedRecord],
        base: &str,
        format: OutputFormat,
    ) -> Result<String> {
        let bytes = encode::encode(batch, format)?;
        metrics::encode::artifact_bytes(format.as_str(), bytes.len());

        let key = format!("{}.{}", base, format.extension());
        let started = Instant::now();
        match self.store.put(&key, bytes, format.content_type()).await {
            Ok(()) => {
                metrics::sink::write_success(format.as_str());
                metrics::sink::put_duration(started.elapsed().as_secs_f64());
                Ok(key)
            }
            Err(e) => {
                metrics::sink::write_error(format.as_str());
                Err(e)
            }
        }
    }
}

fn artifact_base(prefix: &str, unix_ts: i64) -> String {
    format!("{}/users_{}", prefix.trim_end_matches('/'), unix_ts)
}
