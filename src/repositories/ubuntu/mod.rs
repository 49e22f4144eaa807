//! Ubuntu server cloud images.

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use regex::Regex;

use super::{Artifact, ArtifactError, fetch_checksums};
use crate::cloud::{ArtifactDetails, ChecksumKind, ImageChecksum, Metadata, image_architecture};
use crate::hashsum::ChecksumFormat;
use crate::helpers::getter::Getter;

const NAME: &str = "ubuntu";

fn version_regex() -> &'static Regex {
    static VERSION_RE: OnceLock<Regex> = OnceLock::new();
    VERSION_RE.get_or_init(|| Regex::new(r"^\d\d\.\d\d$").expect("invalid ubuntu version regex"))
}

pub struct Ubuntu {
    version: String,
    arch: String,
    image_arch: &'static str,
    getter: Arc<dyn Getter>,
}

impl Ubuntu {
    /// `version` is a release number such as `24.04`.
    pub fn new(version: &str, arch: &str, getter: Arc<dyn Getter>) -> Result<Self, ArtifactError> {
        if !version_regex().is_match(version) {
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
        format!("https://cloud-images.ubuntu.com/releases/{}/release/", self.version)
    }

    fn variant(&self) -> String {
        format!("ubuntu-{}-server-cloudimg-{}.img", self.version, self.image_arch)
    }
}

#[async_trait]
impl Artifact for Ubuntu {
    async fn inspect(&self) -> Result<ArtifactDetails, ArtifactError> {
        let base_url = self.base_url();
        let checksum_url = format!("{base_url}SHA256SUMS");
        let checksums =
            fetch_checksums(self.getter.as_ref(), &checksum_url, ChecksumFormat::Gnu, ChecksumKind::Sha256).await?;

        let variant = self.variant();
        let checksum = checksums.get(&variant).ok_or_else(|| ArtifactError::NotFound {
            version: self.version.clone(),
            variant: variant.clone(),
        })?;

        Ok(ArtifactDetails::new(
            ImageChecksum::new(ChecksumKind::Sha256, checksum.as_str()),
            format!("{base_url}{variant}"),
            self.image_arch,
        )
        .with_additional_unique_tags(vec![checksum.clone()]))
    }

    fn metadata(&self) -> Metadata {
        Metadata::new(NAME, &self.version).with_arch(&self.arch)
    }
}
