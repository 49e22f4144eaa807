//! CentOS Linux 7 and 8 cloud images.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::{Artifact, ArtifactError, checksum_of, fetch_checksums};
use crate::cloud::{ArtifactDetails, ChecksumKind, ImageChecksum, Metadata, image_architecture};
use crate::hashsum::ChecksumFormat;
use crate::helpers::candidates::{select_latest, trim_affixes};
use crate::helpers::getter::Getter;

const NAME: &str = "centos";
const ARCH: &str = "x86_64";
const VARIANT: &str = "GenericCloud";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Release {
    /// 8.x point releases, listed in a BSD `CHECKSUM` file.
    Eight,
    /// 7-<build>, listed in a GNU `sha256sum.txt`.
    Seven { build: String },
}

pub struct CentOs {
    version: String,
    release: Release,
    getter: Arc<dyn Getter>,
}

impl CentOs {
    /// `version` is either `8.<minor>` or `7-<build>`.
    pub fn new(version: &str, getter: Arc<dyn Getter>) -> Result<Self, ArtifactError> {
        let release = if version.starts_with("8.") {
            Release::Eight
        } else if let Some(build) = version.strip_prefix("7-").filter(|b| !b.is_empty()) {
            Release::Seven {
                build: build.to_string(),
            }
        } else {
            return Err(ArtifactError::UnknownVersion {
                name: NAME,
                version: version.to_string(),
            });
        };

        Ok(Self {
            version: version.to_string(),
            release,
            getter,
        })
    }

    fn base_url(&self) -> &'static str {
        match self.release {
            Release::Eight => "https://cloud.centos.org/centos/8/x86_64/images/",
            Release::Seven { .. } => "https://cloud.centos.org/centos/7/images/",
        }
    }

    fn candidate_prefix(&self) -> String {
        match &self.release {
            Release::Eight => format!("CentOS-8-{VARIANT}-{}", self.version),
            Release::Seven { build } => format!("CentOS-7-{ARCH}-{VARIANT}-{build}.qcow2"),
        }
    }
}

/// `8.4.2105-20210603.0` and, when it splits in two, `8.4.2105`.
fn centos8_tags(candidate: &str) -> Vec<String> {
    let fine = trim_affixes(candidate, &format!("CentOS-8-{VARIANT}-"), &format!(".{ARCH}.qcow2"));
    let mut tags = vec![fine.to_string()];

    let segments: Vec<&str> = fine.split('-').collect();
    if segments.len() == 2 {
        tags.push(segments[0].to_string());
    }
    tags
}

#[async_trait]
impl Artifact for CentOs {
    async fn inspect(&self) -> Result<ArtifactDetails, ArtifactError> {
        let base_url = self.base_url();
        let (file, format) = match self.release {
            Release::Eight => ("CHECKSUM", ChecksumFormat::Bsd),
            Release::Seven { .. } => ("sha256sum.txt", ChecksumFormat::Gnu),
        };
        let checksum_url = format!("{base_url}{file}");
        let checksums = fetch_checksums(self.getter.as_ref(), &checksum_url, format, ChecksumKind::Sha256).await?;

        let prefix = self.candidate_prefix();
        let candidate = select_latest(&checksums, |name| name.starts_with(&prefix) && name.ends_with("qcow2"))
            .ok_or_else(|| ArtifactError::NotFound {
                version: self.version.clone(),
                variant: VARIANT.to_string(),
            })?;
        debug!(candidate, "selected candidate");

        let checksum = checksum_of(&checksums, candidate, &checksum_url)?;
        let tags = match self.release {
            Release::Eight => centos8_tags(candidate),
            Release::Seven { .. } => Vec::new(),
        };

        Ok(ArtifactDetails::new(
            ImageChecksum::new(ChecksumKind::Sha256, checksum),
            format!("{base_url}{candidate}"),
            image_architecture(ARCH)?,
        )
        .with_additional_unique_tags(tags))
    }

    fn metadata(&self) -> Metadata {
        Metadata::new(NAME, &self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::FixtureGetter;
    use rstest::rstest;

    #[tokio::test]
    async fn resolves_latest_centos8_build() {
        let getter = FixtureGetter::new("centos/centos8.checksum");
        let centos = CentOs::new("8.4", getter.clone()).unwrap();

        let details = centos.inspect().await.unwrap();

        let expected = ArtifactDetails::new(
            ImageChecksum::new(
                ChecksumKind::Sha256,
                "3510fc7deb3e1939dbf3fe6f65a02ab1efcc763480bc352e4c06eca2e4f7c2a2",
            ),
            "https://cloud.centos.org/centos/8/x86_64/images/CentOS-8-GenericCloud-8.4.2105-20210603.0.x86_64.qcow2",
            "amd64",
        )
        .with_additional_unique_tags(vec!["8.4.2105-20210603.0".into(), "8.4.2105".into()]);
        assert_eq!(details, expected);
        assert_eq!(
            getter.requested(),
            vec!["https://cloud.centos.org/centos/8/x86_64/images/CHECKSUM".to_string()]
        );
        assert_eq!(centos.metadata(), Metadata::new("centos", "8.4"));
    }

    #[tokio::test]
    async fn resolves_exact_centos7_build() {
        let getter = FixtureGetter::new("centos/centos7.checksum");
        let centos = CentOs::new("7-2009", getter.clone()).unwrap();

        let details = centos.inspect().await.unwrap();

        let expected = ArtifactDetails::new(
            ImageChecksum::new(
                ChecksumKind::Sha256,
                "e38bab0475cc6d004d2e17015969c659e5a308111851b0e2715e84646035bdd3",
            ),
            "https://cloud.centos.org/centos/7/images/CentOS-7-x86_64-GenericCloud-2009.qcow2",
            "amd64",
        );
        assert_eq!(details, expected);
        assert!(details.additional_unique_tags().is_empty());
        assert_eq!(
            getter.requested(),
            vec!["https://cloud.centos.org/centos/7/images/sha256sum.txt".to_string()]
        );
    }

    #[tokio::test]
    async fn missing_build_is_not_found() {
        let getter = FixtureGetter::new("centos/centos7.checksum");
        let centos = CentOs::new("7-1111", getter).unwrap();

        let err = centos.inspect().await.expect_err("no such build");
        match err {
            ArtifactError::NotFound { version, variant } => {
                assert_eq!(version, "7-1111");
                assert_eq!(variant, "GenericCloud");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[rstest]
    #[case("9")]
    #[case("7")]
    #[case("7-")]
    #[case("6.10")]
    #[case("")]
    fn rejects_unknown_versions(#[case] version: &str) {
        let getter = FixtureGetter::new("centos/centos8.checksum");
        assert!(matches!(
            CentOs::new(version, getter),
            Err(ArtifactError::UnknownVersion { name: "centos", .. })
        ));
    }

    #[rstest]
    #[case("CentOS-8-GenericCloud-8.4.2105-20210603.0.x86_64.qcow2", &["8.4.2105-20210603.0", "8.4.2105"])]
    #[case("CentOS-8-GenericCloud-8.4.x86_64.qcow2", &["8.4"])]
    #[case("CentOS-8-GenericCloud-8.4-a-b.x86_64.qcow2", &["8.4-a-b"])]
    fn extracts_centos8_tags(#[case] candidate: &str, #[case] expected: &[&str]) {
        assert_eq!(centos8_tags(candidate), expected);
    }
}
