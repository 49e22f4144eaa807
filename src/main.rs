use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result, bail};
use chrono::Utc;
use clap::{Parser, Subcommand};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{Instrument, error, info, info_span, warn};
use tracing_subscriber::EnvFilter;

use containerdisks::cloud::{ArtifactDetails, Metadata, prepare_tags};
use containerdisks::helpers::getter::{Getter, HttpGetter};
use containerdisks::helpers::image_resolver::download_verified;
use containerdisks::repositories::{self as repos, Artifact, ArtifactError, RegistryEntry};

#[derive(Debug, Parser)]
#[command(name = "medius", version, about = "Resolve published cloud images into containerdisk artifacts")]
struct Cli {
    /// Catalog JSON replacing the built-in one.
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// Only handle `name:version`, or every version with `name:*`.
    #[arg(long, global = true, default_value = "")]
    focus: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Resolve every artifact and report its checksum and tags.
    Inspect {
        /// Number of artifacts inspected concurrently.
        #[arg(long, default_value_t = 1)]
        workers: usize,

        /// Registry prefix used when naming tags.
        #[arg(long, default_value = "quay.io/containerdisks")]
        registry: String,

        /// Write a JSON summary of every artifact to this file.
        #[arg(long)]
        results_file: Option<PathBuf>,

        /// Exit successfully even when some artifacts fail.
        #[arg(long)]
        no_fail: bool,
    },
    /// Resolve the focused artifacts and download them verified.
    Download {
        /// Directory the images are written to.
        #[arg(long, default_value = ".")]
        dest: PathBuf,
    },
}

#[derive(Debug, Default, Serialize)]
struct ArtifactResult {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    checksum: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    err: Option<String>,
}

fn result_key(metadata: &Metadata) -> String {
    match metadata.arch() {
        Some(arch) => format!("{}/{arch}", metadata.describe()),
        None => metadata.describe(),
    }
}

async fn load_registry(catalog: Option<&Path>, getter: Arc<dyn Getter>) -> Result<Vec<RegistryEntry>> {
    let entries = match catalog {
        Some(path) => repos::load_from_file(path).with_context(|| format!("load catalog {}", path.display()))?,
        None => repos::default_catalog().context("load built-in catalog")?,
    };
    Ok(repos::new_registry(&entries, getter).await?)
}

fn focused_artifacts(registry: &[RegistryEntry], focus: &str) -> Vec<Arc<dyn Artifact>> {
    registry
        .iter()
        .filter(|entry| !repos::should_skip(focus, entry))
        .flat_map(|entry| entry.artifacts.iter().cloned())
        .collect()
}

/// At least one worker, and never more than there are artifacts.
fn worker_count(requested: usize, artifacts: usize) -> usize {
    requested.clamp(1, artifacts.max(1))
}

/// Stop scheduling new artifacts once Ctrl-C is received.
fn watch_for_interrupt() -> Arc<AtomicBool> {
    let cancelled = Arc::new(AtomicBool::new(false));
    let flag = cancelled.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, waiting for running inspections");
            flag.store(true, Ordering::SeqCst);
        }
    });
    cancelled
}

async fn inspect_one(artifact: Arc<dyn Artifact>) -> (Metadata, Result<ArtifactDetails, ArtifactError>) {
    let metadata = artifact.metadata();
    let span = info_span!("inspect", name = metadata.name(), version = metadata.version());
    let result = async {
        let result = artifact.inspect().await;
        match &result {
            Ok(details) => info!(checksum = details.checksum_value(), url = details.download_url(), "resolved artifact"),
            Err(err) => error!(%err, "failed to inspect artifact"),
        }
        result
    }
    .instrument(span)
    .await;
    (metadata, result)
}

async fn run_inspect(
    artifacts: Vec<Arc<dyn Artifact>>,
    workers: usize,
    registry: &str,
    results_file: Option<&Path>,
    no_fail: bool,
) -> Result<()> {
    let workers = worker_count(workers, artifacts.len());
    let cancelled = watch_for_interrupt();
    let timestamp = Utc::now();

    let outcomes: Vec<_> = stream::iter(artifacts)
        .map(|artifact| {
            let cancelled = cancelled.clone();
            async move {
                if cancelled.load(Ordering::SeqCst) {
                    return None;
                }
                Some(inspect_one(artifact).await)
            }
        })
        .buffer_unordered(workers)
        .filter_map(|outcome| async move { outcome })
        .collect()
        .await;

    let mut results = BTreeMap::new();
    let mut failures = 0;
    for (metadata, outcome) in outcomes {
        let entry = match outcome {
            Ok(details) => ArtifactResult {
                tags: prepare_tags(timestamp, registry, &metadata, &details),
                checksum: Some(details.checksum_value().to_string()),
                err: None,
            },
            Err(err) => {
                failures += 1;
                ArtifactResult {
                    err: Some(err.to_string()),
                    ..Default::default()
                }
            }
        };
        results.insert(result_key(&metadata), entry);
    }

    if let Some(path) = results_file {
        let json = serde_json::to_string_pretty(&results)?;
        std::fs::write(path, json).with_context(|| format!("write results to {}", path.display()))?;
        info!(path = %path.display(), "wrote results");
    }

    if cancelled.load(Ordering::SeqCst) {
        bail!("interrupted");
    }
    if failures > 0 && !no_fail {
        bail!("{failures} artifact(s) failed");
    }
    Ok(())
}

async fn run_download(artifacts: Vec<Arc<dyn Artifact>>, getter: &dyn Getter, dest: &Path) -> Result<()> {
    for artifact in artifacts {
        let metadata = artifact.metadata();
        let span = info_span!("download", name = metadata.name(), version = metadata.version());
        async {
            let details = artifact.inspect().await?;
            let path = download_verified(getter, &details, dest).await?;
            info!(path = %path.display(), "saved image");
            anyhow::Ok(())
        }
        .instrument(span)
        .await
        .with_context(|| format!("download {}", result_key(&metadata)))?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let getter: Arc<dyn Getter> = Arc::new(HttpGetter::new());
    let entries = load_registry(cli.catalog.as_deref(), getter.clone()).await?;
    let artifacts = focused_artifacts(&entries, &cli.focus);
    info!(artifacts = artifacts.len(), focus = %cli.focus, "selected artifacts");

    match cli.command {
        Command::Inspect {
            workers,
            registry,
            results_file,
            no_fail,
        } => run_inspect(artifacts, workers, &registry, results_file.as_deref(), no_fail).await,
        Command::Download { dest } => {
            if cli.focus.is_empty() {
                bail!("download needs --focus to pick the images");
            }
            run_download(artifacts, getter.as_ref(), &dest).await
        }
    }
}
