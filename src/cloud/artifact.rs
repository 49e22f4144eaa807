use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::checksum::{ChecksumKind, ImageChecksum};

/// Compression applied to the published disk image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    #[default]
    None,
    Gzip,
    Xz,
}

impl Compression {
    pub fn as_str(&self) -> &'static str {
        match self {
            Compression::None => "none",
            Compression::Gzip => "gzip",
            Compression::Xz => "xz",
        }
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolved artifact, regardless of which distribution feed produced it.
///
/// The build stage reads the download URL, checksum, compression and
/// architecture; tag naming reads the additional unique tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactDetails {
    checksum: ImageChecksum,
    download_url: String,
    #[serde(default)]
    compression: Compression,
    image_architecture: String,
    #[serde(default)]
    additional_unique_tags: Vec<String>,
}

impl ArtifactDetails {
    pub fn new(
        checksum: ImageChecksum,
        download_url: impl Into<String>,
        image_architecture: impl Into<String>,
    ) -> Self {
        Self {
            checksum,
            download_url: download_url.into(),
            compression: Compression::None,
            image_architecture: image_architecture.into(),
            additional_unique_tags: Vec::new(),
        }
    }

    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    pub fn with_additional_unique_tags(mut self, tags: Vec<String>) -> Self {
        self.additional_unique_tags = tags;
        self
    }

    pub fn checksum(&self) -> &ImageChecksum {
        &self.checksum
    }

    pub fn checksum_value(&self) -> &str {
        self.checksum.value()
    }

    pub fn checksum_kind(&self) -> ChecksumKind {
        self.checksum.kind()
    }

    pub fn download_url(&self) -> &str {
        &self.download_url
    }

    pub fn compression(&self) -> Compression {
        self.compression
    }

    /// e.g. amd64
    pub fn image_architecture(&self) -> &str {
        &self.image_architecture
    }

    /// Most specific tag first.
    pub fn additional_unique_tags(&self) -> &[String] {
        &self.additional_unique_tags
    }

    /// Whether an image labelled with `published` must be rebuilt.
    pub fn needs_update(&self, published: Option<&str>, force: bool) -> bool {
        force || !published.is_some_and(|checksum| self.checksum.matches(checksum))
    }
}

/// Identity of an artifact, used for logging, focus filters and results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    name: String,
    version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    arch: Option<String>,
}

impl Metadata {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            arch: None,
        }
    }

    pub fn with_arch(mut self, arch: impl Into<String>) -> Self {
        self.arch = Some(arch.into());
        self
    }

    /// e.g. centos-stream
    pub fn name(&self) -> &str {
        &self.name
    }

    /// e.g. 9
    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn arch(&self) -> Option<&str> {
        self.arch.as_deref()
    }

    /// `name:version`, the moving tag of the containerdisk.
    pub fn describe(&self) -> String {
        format!("{}:{}", self.name, self.version)
    }
}

fn join_path(registry: &str, rest: &str) -> String {
    let registry = registry.trim_end_matches('/');
    if registry.is_empty() {
        rest.to_string()
    } else {
        format!("{registry}/{rest}")
    }
}

/// Image references a resolved artifact is published under.
///
/// The timestamped reference comes first, then one reference per additional
/// unique tag, and the moving `name:version` tag last.
pub fn prepare_tags(
    timestamp: DateTime<Utc>,
    registry: &str,
    metadata: &Metadata,
    details: &ArtifactDetails,
) -> Vec<String> {
    let image_name = join_path(registry, &metadata.describe());
    let mut names = vec![format!("{image_name}-{}", timestamp.format("%y%m%d%H%M"))];

    for tag in details.additional_unique_tags() {
        if tag.is_empty() {
            continue;
        }
        names.push(format!("{}:{tag}", join_path(registry, metadata.name())));
    }

    names.push(image_name);
    names
}
