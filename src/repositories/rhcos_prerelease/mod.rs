//! Red Hat CoreOS pre-release OpenStack images.
//!
//! Pre-release streams publish a moving `rhcos-openstack` image plus the same
//! bytes under versioned names. Versioned names containing `rc.` become tags.

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use regex::Regex;
use tracing::debug;

use super::{Artifact, ArtifactError, fetch_checksums};
use crate::cloud::{ArtifactDetails, ChecksumKind, Compression, ImageChecksum, Metadata, image_architecture};
use crate::hashsum::ChecksumFormat;
use crate::helpers::candidates::{aliases_with_checksum, trim_affixes};
use crate::helpers::getter::Getter;

const NAME: &str = "rhcos";
const ARCH: &str = "x86_64";

fn version_regex() -> &'static Regex {
    static VERSION_RE: OnceLock<Regex> = OnceLock::new();
    VERSION_RE.get_or_init(|| Regex::new(r"^latest(-\d+\.\d+)?$").expect("invalid rhcos pre-release version regex"))
}

pub struct RhcosPrerelease {
    version: String,
    getter: Arc<dyn Getter>,
}

impl RhcosPrerelease {
    /// `version` is `latest` or `latest-<major>.<minor>`.
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
            "https://mirror.openshift.com/pub/openshift-v4/{ARCH}/dependencies/rhcos/pre-release/{}/",
            self.version
        )
    }
}

#[async_trait]
impl Artifact for RhcosPrerelease {
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

        let alias_suffix = format!("-{ARCH}-openstack.{ARCH}.qcow2.gz");
        let mut tags: Vec<String> = aliases_with_checksum(&checksums, checksum, &variant)
            .into_iter()
            .map(|alias| trim_affixes(alias, "rhcos-", &alias_suffix))
            .filter(|alias| alias.contains("rc."))
            .map(str::to_string)
            .collect();
        debug!(?tags, "found release candidate aliases");
        tags.push(checksum.clone());

        Ok(ArtifactDetails::new(
            ImageChecksum::new(ChecksumKind::Sha256, checksum.as_str()),
            format!("{base_url}{variant}"),
            image_architecture(ARCH)?,
        )
        .with_compression(Compression::Gzip)
        .with_additional_unique_tags(tags))
    }

    /// `latest-4.9` becomes `4.9-pre-release`, `latest` becomes `latest-pre-release`.
    fn metadata(&self) -> Metadata {
        let version = self.version.strip_prefix("latest-").unwrap_or(&self.version);
        Metadata::new(NAME, format!("{version}-pre-release"))
    }
}
