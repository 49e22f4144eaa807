//! Distribution drivers and the catalog that wires them together.

pub mod centos;
pub mod centos_stream;
pub mod debian;
pub mod fedora;
pub mod generic;
mod models;
pub mod opensuse;
mod registry;
pub mod rhcos;
pub mod rhcos_prerelease;
pub mod ubuntu;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::cloud::{ArchitectureError, ArtifactDetails, ChecksumKind, Metadata};
use crate::hashsum::{self, ChecksumFormat, ChecksumMap};
use crate::helpers::getter::{FetchError, Getter};

pub use models::{ArtifactConfig, EntryConfig, ReposError, default_catalog, load_from_file, load_from_json_str};
pub use registry::{RegistryEntry, new_registry, should_skip};

/// A published disk image that can be resolved to a concrete artifact.
#[async_trait]
pub trait Artifact: Send + Sync {
    /// Fetch the upstream manifest and resolve the current artifact.
    async fn inspect(&self) -> Result<ArtifactDetails, ArtifactError>;

    fn metadata(&self) -> Metadata;
}

/// Discovers artifacts that are not listed statically, one group per version.
#[async_trait]
pub trait ArtifactsGatherer: Send + Sync {
    async fn gather(&self) -> Result<Vec<Vec<Arc<dyn Artifact>>>, ArtifactError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("can't understand provided {name} version {version:?}")]
    UnknownVersion { name: &'static str, version: String },

    #[error(transparent)]
    UnsupportedArchitecture(#[from] ArchitectureError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("error reading the checksum file {file}: {source}")]
    ParseChecksums {
        file: String,
        #[source]
        source: std::io::Error,
    },

    #[error("error decoding the release feed {file}: {source}")]
    ParseReleases {
        file: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("no candidate found for version {version} and variant {variant}")]
    NotFound { version: String, variant: String },

    #[error("file {name:?} has no checksum in {file}")]
    Inconsistent { name: String, file: String },
}

/// Download and parse the checksum manifest at `url`.
pub(crate) async fn fetch_checksums(
    getter: &dyn Getter,
    url: &str,
    format: ChecksumFormat,
    kind: ChecksumKind,
) -> Result<ChecksumMap, ArtifactError> {
    let raw = getter.get_all(url).await?;
    let checksums = hashsum::parse(raw.as_slice(), format, kind).map_err(|source| ArtifactError::ParseChecksums {
        file: url.to_string(),
        source,
    })?;
    debug!(url, entries = checksums.len(), "parsed checksum manifest");
    Ok(checksums)
}

/// Checksum of `name`, or an inconsistency error pointing at `file`.
pub(crate) fn checksum_of(checksums: &ChecksumMap, name: &str, file: &str) -> Result<String, ArtifactError> {
    checksums
        .get(name)
        .cloned()
        .ok_or_else(|| ArtifactError::Inconsistent {
            name: name.to_string(),
            file: file.to_string(),
        })
}
