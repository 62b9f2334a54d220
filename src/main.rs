use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::{error, info, warn};

use userdir_extractor::config::ExtractorConfig;
use userdir_extractor::encode::{ColumnarCodec, OutputFormat};
use userdir_extractor::error::{ExtractorError, Result};
use userdir_extractor::extractor::{ExtractionReport, Extractor};
use userdir_extractor::fetch::{build_client, Fetcher};
use userdir_extractor::normalize::Normalizer;
use userdir_extractor::observability::{init_logging, metrics};
use userdir_extractor::schema::USER_SCHEMA_JSON;
use userdir_extractor::storage::{FsObjectStore, ObjectStore, S3ObjectStore};

#[derive(Parser)]
#[command(name = "userdir_extractor")]
#[command(about = "User directory feed extractor: fetch, normalize, land one artifact")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one extraction and print the run report to stdout
    Run {
        /// Output format (ndjson or parquet); overrides FILE_FORMAT
        #[arg(long)]
        format: Option<String>,
        /// Write under this local directory instead of S3
        #[arg(long)]
        local_root: Option<String>,
    },
    /// Print the embedded user contract schema
    Schema,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_logging();

    let cli = Cli::parse();

    match cli.command {
        // Every fatal error funnels through here so it is logged before the
        // process exits nonzero, configuration failures included.
        Commands::Run { format, local_root } => match run(format, local_root).await {
            Ok(report) => {
                println!("{}", serde_json::to_string(&report)?);
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Extraction run failed");
                Err(e.into())
            }
        },
        Commands::Schema => {
            println!("{}", USER_SCHEMA_JSON);
            Ok(())
        }
    }
}

async fn run(
    format_override: Option<String>,
    local_root: Option<String>,
) -> Result<ExtractionReport> {
    if let Err(e) = metrics::init() {
        warn!(error = %e, "Metrics recorder not installed, continuing without metrics");
    }

    let mut config = ExtractorConfig::from_env()?;
    if let Some(requested) = format_override {
        config.format = OutputFormat::parse(&requested)
            .ok_or_else(|| ExtractorError::Config(format!("unknown output format: {requested}")))?;
    }

    let store: Arc<dyn ObjectStore> = match local_root {
        Some(root) => {
            info!(root = %root, "Writing artifacts to the local filesystem");
            Arc::new(FsObjectStore::new(root))
        }
        None => Arc::new(S3ObjectStore::from_env(&config.bucket).await),
    };

    let extractor = Extractor::new(
        Fetcher::new(build_client()?),
        Normalizer::new(config.validation)?,
        ColumnarCodec::resolve(),
        store,
        config,
    );

    let outcome = extractor.run().await;
    if let Err(e) = metrics::push_all_metrics().await {
        warn!(error = %e, "Metrics push failed");
    }
    outcome
}
