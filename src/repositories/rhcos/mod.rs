//! Red Hat CoreOS stable OpenStack images.

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use regex::Regex;

use super::{Artifact, ArtifactError, fetch_checksums};
use crate::cloud::{ArtifactDetails, ChecksumKind, Compression, ImageChecksum, Metadata, image_architecture};
use crate::hashsum::ChecksumFormat;
use crate::helpers::getter::Getter;

const NAME: &str = "rhcos";
const ARCH: &str = "x86_64";

fn version_regex() -> &'static Regex {
    static VERSION_RE: OnceLock<Regex> = OnceLock::new();
    VERSION_RE.get_or_init(|| Regex::new(r"^\d+\.\d+$").expect("invalid rhcos version regex"))
}

pub struct Rhcos {
    version: String,
    getter: Arc<dyn Getter>,
}

impl Rhcos {
    /// `version` is a minor stream such as `4.9`.
    pub fn new(version: &str, getter: Arc<dyn Getter>) -> Result<Self, ArtifactError> {
        if !version_regex().is_match(version) {
            return Err(ArtifactError::UnknownVersion {
                name: NAME,
                version: version.to_string(),
            });
        }

        Ok(Self {
            version: version.to_string(),
            getter,
        })
    }

    fn base_url(&self) -> String {
        format!(
            "https://mirror.openshift.com/pub/openshift-v4/dependencies/rhcos/{}/latest/",
            self.version
        )
    }
}

#[async_trait]
impl Artifact for Rhcos {
    async fn inspect(&self) -> Result<ArtifactDetails, ArtifactError> {
        let base_url = self.base_url();
        let checksum_url = format!("{base_url}sha256sum.txt");
        let checksums =
            fetch_checksums(self.getter.as_ref(), &checksum_url, ChecksumFormat::Gnu, ChecksumKind::Sha256).await?;

        let variant = format!("rhcos-openstack.{ARCH}.qcow2.gz");
        let checksum = checksums.get(&variant).ok_or_else(|| ArtifactError::NotFound {
            version: self.version.clone(),
            variant: variant.clone(),
        })?;

        Ok(ArtifactDetails::new(
            ImageChecksum::new(ChecksumKind::Sha256, checksum.as_str()),
            format!("{base_url}{variant}"),
            image_architecture(ARCH)?,
        )
        .with_compression(Compression::Gzip)
        .with_additional_unique_tags(vec![checksum.clone()]))
    }

    fn metadata(&self) -> Metadata {
        Metadata::new(NAME, &self.version)
    }
}
