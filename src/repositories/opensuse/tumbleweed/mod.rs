use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::MINIMAL_VM;
use crate::cloud::{ArtifactDetails, ChecksumKind, ImageChecksum, Metadata, image_architecture};
use crate::hashsum::ChecksumFormat;
use crate::helpers::candidates::select_latest;
use crate::helpers::getter::Getter;
use crate::repositories::{Artifact, ArtifactError, checksum_of, fetch_checksums};

const NAME: &str = "opensuse-tumbleweed";
const VERSION: &str = "1.0.0";
const VARIANT: &str = "openSUSE-Tumbleweed";
const S390X: &str = "s390x";

pub struct Tumbleweed {
    arch: String,
    image_arch: &'static str,
    /// e.g. `openSUSE-Tumbleweed-Minimal-VM.x86_64-1.0.0-Cloud`
    marker: String,
    getter: Arc<dyn Getter>,
}

impl Tumbleweed {
    pub fn new(arch: &str, getter: Arc<dyn Getter>) -> Result<Self, ArtifactError> {
        let image_arch = image_architecture(arch)?;

        // s390x snapshots carry their own version and repeat the architecture.
        let version = if arch == S390X {
            format!("16.0.0-{S390X}")
        } else {
            VERSION.to_string()
        };
        let marker = format!("{VARIANT}-{MINIMAL_VM}.{arch}-{version}-Cloud");

        Ok(Self {
            arch: arch.to_string(),
            image_arch,
            marker,
            getter,
        })
    }

    fn base_url(&self) -> &'static str {
        if self.arch == S390X {
            "https://download.opensuse.org/ports/zsystems/tumbleweed/appliances/"
        } else {
            "https://download.opensuse.org/tumbleweed/appliances/"
        }
    }
}

#[async_trait]
impl Artifact for Tumbleweed {
    async fn inspect(&self) -> Result<ArtifactDetails, ArtifactError> {
        let base_url = self.base_url();
        let checksum_url = format!("{base_url}SHA256SUMS");
        let checksums =
            fetch_checksums(self.getter.as_ref(), &checksum_url, ChecksumFormat::Gnu, ChecksumKind::Sha256).await?;

        let candidate = select_latest(&checksums, |name| name.contains(&self.marker) && name.ends_with("qcow2"))
            .ok_or_else(|| ArtifactError::NotFound {
                version: VERSION.to_string(),
                variant: MINIMAL_VM.to_string(),
            })?;
        debug!(candidate, "selected candidate");

        let checksum = checksum_of(&checksums, candidate, &checksum_url)?;
        Ok(ArtifactDetails::new(
            ImageChecksum::new(ChecksumKind::Sha256, checksum),
            format!("{base_url}{candidate}"),
            self.image_arch,
        ))
    }

    fn metadata(&self) -> Metadata {
        Metadata::new(NAME, VERSION).with_arch(&self.arch)
    }
}
