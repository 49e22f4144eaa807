//! Debian generic cloud images.

use std::sync::Arc;

use async_trait::async_trait;

use super::{Artifact, ArtifactError, fetch_checksums};
use crate::cloud::{ArtifactDetails, ChecksumKind, ImageChecksum, Metadata, image_architecture};
use crate::hashsum::ChecksumFormat;
use crate::helpers::getter::Getter;

const NAME: &str = "debian";
const VALID_VERSION_PREFIXES: [&str; 3] = ["11", "12", "13"];

pub struct Debian {
    version: String,
    codename: String,
    arch: String,
    image_arch: &'static str,
    getter: Arc<dyn Getter>,
}

impl Debian {
    /// `codename` names the release directory, e.g. `bookworm` for 12.
    pub fn new(version: &str, codename: &str, arch: &str, getter: Arc<dyn Getter>) -> Result<Self, ArtifactError> {
        if !VALID_VERSION_PREFIXES.iter().any(|prefix| version.starts_with(prefix)) {
            return Err(ArtifactError::UnknownVersion {
                name: NAME,
                version: version.to_string(),
            });
        }

        Ok(Self {
            version: version.to_string(),
            codename: codename.to_string(),
            arch: arch.to_string(),
            image_arch: image_architecture(arch)?,
            getter,
        })
    }

    fn base_url(&self) -> String {
        format!("https://cloud.debian.org/images/cloud/{}/latest/", self.codename)
    }

    fn variant(&self) -> String {
        format!("debian-{}-genericcloud-{}.qcow2", self.version, self.image_arch)
    }
}

#[async_trait]
impl Artifact for Debian {
    async fn inspect(&self) -> Result<ArtifactDetails, ArtifactError> {
        let base_url = self.base_url();
        let checksum_url = format!("{base_url}SHA512SUMS");
        let checksums =
            fetch_checksums(self.getter.as_ref(), &checksum_url, ChecksumFormat::Gnu, ChecksumKind::Sha512).await?;

        let variant = self.variant();
        let checksum = checksums.get(&variant).ok_or_else(|| ArtifactError::NotFound {
            version: self.version.clone(),
            variant: variant.clone(),
        })?;

        Ok(ArtifactDetails::new(
            ImageChecksum::new(ChecksumKind::Sha512, checksum.as_str()),
            format!("{base_url}{variant}"),
            self.image_arch,
        )
        .with_additional_unique_tags(vec![checksum.clone()]))
    }

    fn metadata(&self) -> Metadata {
        Metadata::new(NAME, &self.version).with_arch(&self.arch)
    }
}
