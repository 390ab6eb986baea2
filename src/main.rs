use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use tracing::{error, info, warn};

use hospital_mrf_etl::config::Config;
use hospital_mrf_etl::error::IngestError;
use hospital_mrf_etl::fetch::Fetcher;
use hospital_mrf_etl::index;
use hospital_mrf_etl::loader::PgLoader;
use hospital_mrf_etl::pipeline::{Pipeline, WorkItem};

#[derive(Parser)]
#[command(name = "mrf-ingest", about = "Ingest hospital price-transparency MRFs")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch, transform, and load every hospital in a hospital-list file.
    Run {
        #[arg(long)]
        hospital_list: PathBuf,

        #[arg(long, default_value = "./downloads")]
        download_dir: PathBuf,

        #[arg(long, default_value_t = 3)]
        max_buffered: usize,
    },
}

#[tokio::main]
async fn main() -> Result<(), IngestError> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Run {
            hospital_list,
            download_dir,
            max_buffered,
        } => run(hospital_list, download_dir, max_buffered).await,
    }
}

async fn run(
    hospital_list: PathBuf,
    download_dir: PathBuf,
    max_buffered: usize,
) -> Result<(), IngestError> {
    let config = Config::load(&hospital_list, download_dir.clone(), max_buffered)?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await
        .map_err(|e| IngestError::Config(format!("failed to connect to database: {e}")))?;

    let fetcher = Fetcher::new()?;
    let loader = Arc::new(PgLoader::new(pool));
    let pipeline = Pipeline::new(fetcher.clone(), download_dir.clone(), max_buffered);

    let mut items = Vec::new();
    for hospital in &config.hospitals {
        if let Some(index_url) = &hospital.index_url {
            match fetch_index(&fetcher, index_url, &download_dir).await {
                Ok(entries) => {
                    for entry in entries {
                        items.push(WorkItem {
                            url: entry.url,
                            location_name: entry
                                .location_name
                                .or_else(|| Some(hospital.location_name.clone())),
                        });
                    }
                }
                Err(e) => {
                    warn!(index_url, error = %e, "failed to fetch index file, skipping hospital");
                }
            }
        }
        if let Some(mrf_url) = &hospital.mrf_url {
            items.push(WorkItem {
                url: mrf_url.clone(),
                location_name: Some(hospital.location_name.clone()),
            });
        }
    }

    info!(hospitals = config.hospitals.len(), urls = items.len(), "starting run");

    let processed = pipeline.run(items, loader).await;
    info!(processed, "run complete");

    Ok(())
}

async fn fetch_index(
    fetcher: &Fetcher,
    index_url: &str,
    download_dir: &std::path::Path,
) -> Result<Vec<index::IndexEntry>, IngestError> {
    let path = fetcher.download(index_url, download_dir).await?;
    let content = tokio::fs::read_to_string(&path).await?;
    let entries = index::scan_index(&content);
    if let Err(e) = tokio::fs::remove_file(&path).await {
        error!(path = %path.display(), error = %e, "failed to clean up index file");
    }
    Ok(entries)
}
