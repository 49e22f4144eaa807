//! CentOS Stream cloud images.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::{Artifact, ArtifactError, checksum_of, fetch_checksums};
use crate::cloud::{ArtifactDetails, ChecksumKind, ImageChecksum, Metadata, image_architecture};
use crate::hashsum::ChecksumFormat;
use crate::helpers::candidates::{select_latest, trim_affixes};
use crate::helpers::getter::Getter;

const NAME: &str = "centos-stream";
const VARIANT: &str = "GenericCloud";
const VALID_VERSION_PREFIXES: [&str; 3] = ["8", "9", "10"];

pub struct CentOsStream {
    version: String,
    arch: String,
    image_arch: &'static str,
    getter: Arc<dyn Getter>,
}

impl CentOsStream {
    pub fn new(version: &str, arch: &str, getter: Arc<dyn Getter>) -> Result<Self, ArtifactError> {
        if !VALID_VERSION_PREFIXES.iter().any(|prefix| version.starts_with(prefix)) {
            return Err(ArtifactError::UnknownVersion {
                name: NAME,
                version: version.to_string(),
            });
        }

        Ok(Self {
            version: version.to_string(),
            arch: arch.to_string(),
            image_arch: image_architecture(arch)?,
            getter,
        })
    }

    fn base_url(&self) -> String {
        format!("https://cloud.centos.org/centos/{}-stream/{}/images/", self.version, self.arch)
    }
}

#[async_trait]
impl Artifact for CentOsStream {
    async fn inspect(&self) -> Result<ArtifactDetails, ArtifactError> {
        let base_url = self.base_url();
        let checksum_url = format!("{base_url}CHECKSUM");
        let checksums =
            fetch_checksums(self.getter.as_ref(), &checksum_url, ChecksumFormat::Bsd, ChecksumKind::Sha256).await?;

        let name_prefix = format!("CentOS-Stream-{VARIANT}-");
        let prefix = format!("{name_prefix}{}", self.version);
        let suffix = format!(".{}.qcow2", self.arch);
        let candidate = select_latest(&checksums, |name| name.starts_with(&prefix) && name.ends_with(&suffix))
            .ok_or_else(|| ArtifactError::NotFound {
                version: self.version.clone(),
                variant: VARIANT.to_string(),
            })?;
        debug!(candidate, "selected candidate");

        let checksum = checksum_of(&checksums, candidate, &checksum_url)?;
        let tag = trim_affixes(candidate, &name_prefix, &suffix);

        Ok(ArtifactDetails::new(
            ImageChecksum::new(ChecksumKind::Sha256, checksum),
            format!("{base_url}{candidate}"),
            self.image_arch,
        )
        .with_additional_unique_tags(vec![tag.to_string()]))
    }

    fn metadata(&self) -> Metadata {
        Metadata::new(NAME, &self.version).with_arch(&self.arch)
    }
}
