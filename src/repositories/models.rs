use std::sync::Arc;
use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use super::centos::CentOs;
use super::centos_stream::CentOsStream;
use super::debian::Debian;
use super::fedora::Fedora;
use super::generic::Generic;
use super::opensuse::{Leap, Tumbleweed};
use super::rhcos::Rhcos;
use super::rhcos_prerelease::RhcosPrerelease;
use super::ubuntu::Ubuntu;
use super::{Artifact, ArtifactError};
use crate::cloud::{ArtifactDetails, Metadata};
use crate::helpers::getter::Getter;

const DEFAULT_CATALOG: &str = include_str!("../../resources/catalog.json");

fn default_arch() -> String {
    "x86_64".to_string()
}

/// One artifact of a catalog entry, keyed by the `distro` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "distro", rename_all = "kebab-case")]
pub enum ArtifactConfig {
    Centos {
        version: String,
    },
    CentosStream {
        version: String,
        #[serde(default = "default_arch")]
        arch: String,
    },
    Fedora {
        version: String,
        #[serde(default = "default_arch")]
        arch: String,
    },
    Debian {
        version: String,
        codename: String,
        #[serde(default = "default_arch")]
        arch: String,
    },
    Ubuntu {
        version: String,
        #[serde(default = "default_arch")]
        arch: String,
    },
    OpensuseLeap {
        version: String,
        #[serde(default = "default_arch")]
        arch: String,
    },
    OpensuseTumbleweed {
        #[serde(default = "default_arch")]
        arch: String,
    },
    Rhcos {
        version: String,
    },
    RhcosPrerelease {
        version: String,
    },
    Generic {
        metadata: Metadata,
        details: ArtifactDetails,
    },
}

impl ArtifactConfig {
    /// Construct the driver, validating version and architecture.
    pub fn build(&self, getter: Arc<dyn Getter>) -> Result<Arc<dyn Artifact>, ArtifactError> {
        let artifact: Arc<dyn Artifact> = match self {
            ArtifactConfig::Centos { version } => Arc::new(CentOs::new(version, getter)?),
            ArtifactConfig::CentosStream { version, arch } => Arc::new(CentOsStream::new(version, arch, getter)?),
            ArtifactConfig::Fedora { version, arch } => Arc::new(Fedora::new(version, arch, getter)?),
            ArtifactConfig::Debian { version, codename, arch } => {
                Arc::new(Debian::new(version, codename, arch, getter)?)
            }
            ArtifactConfig::Ubuntu { version, arch } => Arc::new(Ubuntu::new(version, arch, getter)?),
            ArtifactConfig::OpensuseLeap { version, arch } => Arc::new(Leap::new(version, arch, getter)?),
            ArtifactConfig::OpensuseTumbleweed { arch } => Arc::new(Tumbleweed::new(arch, getter)?),
            ArtifactConfig::Rhcos { version } => Arc::new(Rhcos::new(version, getter)?),
            ArtifactConfig::RhcosPrerelease { version } => Arc::new(RhcosPrerelease::new(version, getter)?),
            ArtifactConfig::Generic { metadata, details } => Arc::new(Generic::new(details.clone(), metadata.clone())),
        };
        Ok(artifact)
    }
}

/// A group of artifacts published together, usually one per architecture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryConfig {
    artifacts: Vec<ArtifactConfig>,
    #[serde(default)]
    use_for_docs: bool,
    #[serde(default)]
    use_for_latest: bool,
    #[serde(default)]
    skip_when_not_focused: bool,
}

#[allow(unused)]
impl EntryConfig {
    pub fn artifacts(&self) -> &[ArtifactConfig] {
        &self.artifacts
    }

    pub fn use_for_docs(&self) -> bool {
        self.use_for_docs
    }

    pub fn use_for_latest(&self) -> bool {
        self.use_for_latest
    }

    pub fn skip_when_not_focused(&self) -> bool {
        self.skip_when_not_focused
    }
}

/// Load a catalog from a JSON file.
pub fn load_from_file(path: impl AsRef<Path>) -> Result<Vec<EntryConfig>, ReposError> {
    let data = fs::read_to_string(path)?;
    load_from_json_str(&data)
}

pub fn load_from_json_str(json: &str) -> Result<Vec<EntryConfig>, ReposError> {
    Ok(serde_json::from_str(json)?)
}

/// The catalog shipped with the binary.
pub fn default_catalog() -> Result<Vec<EntryConfig>, ReposError> {
    load_from_json_str(DEFAULT_CATALOG)
}

#[derive(thiserror::Error, Debug)]
pub enum ReposError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid catalog entry: {0}")]
    Artifact(#[from] ArtifactError),
}
