use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::MINIMAL_VM;
use crate::cloud::{ArtifactDetails, ChecksumKind, ImageChecksum, Metadata, image_architecture};
use crate::hashsum::ChecksumFormat;
use crate::helpers::candidates::select_latest;
use crate::helpers::getter::Getter;
use crate::repositories::{Artifact, ArtifactError, checksum_of, fetch_checksums};

const NAME: &str = "opensuse-leap";

pub struct Leap {
    version: String,
    arch: String,
    image_arch: &'static str,
    /// File name stem up to and including the architecture.
    stem: String,
    getter: Arc<dyn Getter>,
}

impl Leap {
    /// `version` is a 15.x or 16.x release such as `15.6`.
    pub fn new(version: &str, arch: &str, getter: Arc<dyn Getter>) -> Result<Self, ArtifactError> {
        let stem = if version.starts_with("15.") {
            format!("openSUSE-Leap-{version}-{MINIMAL_VM}.{arch}")
        } else if version.starts_with("16.") {
            format!("Leap-{version}-{MINIMAL_VM}.{arch}")
        } else {
            return Err(ArtifactError::UnknownVersion {
                name: NAME,
                version: version.to_string(),
            });
        };

        Ok(Self {
            version: version.to_string(),
            arch: arch.to_string(),
            image_arch: image_architecture(arch)?,
            stem,
            getter,
        })
    }

    /// Stable link that always points at the current build.
    fn download_url(&self) -> String {
        format!(
            "https://download.opensuse.org/distribution/leap/{}/appliances/{}-Cloud.qcow2",
            self.version, self.stem
        )
    }
}

#[async_trait]
impl Artifact for Leap {
    async fn inspect(&self) -> Result<ArtifactDetails, ArtifactError> {
        let download_url = self.download_url();
        let checksum_url = format!("{download_url}.sha256");
        let checksums =
            fetch_checksums(self.getter.as_ref(), &checksum_url, ChecksumFormat::Gnu, ChecksumKind::Sha256).await?;

        // The companion file names the build the stable link resolves to.
        let candidate = select_latest(&checksums, |name| name.starts_with(&self.stem) && name.ends_with("qcow2"))
            .ok_or_else(|| ArtifactError::NotFound {
                version: self.version.clone(),
                variant: MINIMAL_VM.to_string(),
            })?;
        debug!(candidate, "selected candidate");

        let checksum = checksum_of(&checksums, candidate, &checksum_url)?;
        Ok(ArtifactDetails::new(
            ImageChecksum::new(ChecksumKind::Sha256, checksum),
            download_url,
            self.image_arch,
        ))
    }

    fn metadata(&self) -> Metadata {
        Metadata::new(NAME, &self.version).with_arch(&self.arch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    use crate::testutil::FixtureGetter;

    #[rstest]
    #[case(
        "x86_64",
        "amd64",
        "0f7f09a9a083088b51aa365fe0e4310e6b156c2153d6aa03a77b81eee884e52a"
    )]
    #[case(
        "aarch64",
        "arm64",
        "d2ff40176f8823ab869bf4d728f827ffd6c7f180940b9ccca865be6dc20b06dd"
    )]
    #[tokio::test]
    async fn resolves_checksum_from_companion_file(
        #[case] arch: &str,
        #[case] image_arch: &str,
        #[case] checksum: &str,
    ) {
        let getter = FixtureGetter::new(&format!("opensuse/openSUSE-Leap-15.6-Minimal-VM.{arch}-Cloud.qcow2.sha256"));
        let leap = Leap::new("15.6", arch, getter.clone()).unwrap();

        let details = leap.inspect().await.unwrap();

        let url = format!(
            "https://download.opensuse.org/distribution/leap/15.6/appliances/openSUSE-Leap-15.6-Minimal-VM.{arch}-Cloud.qcow2"
        );
        let expected = ArtifactDetails::new(ImageChecksum::new(ChecksumKind::Sha256, checksum), url.clone(), image_arch);
        assert_eq!(details, expected);
        assert!(details.additional_unique_tags().is_empty());
        assert_eq!(getter.requested(), vec![format!("{url}.sha256")]);
    }

    #[tokio::test]
    async fn leap16_uses_short_file_names() {
        let getter = FixtureGetter::new("opensuse/openSUSE-Leap-15.6-Minimal-VM.x86_64-Cloud.qcow2.sha256");
        let leap = Leap::new("16.0", "x86_64", getter.clone()).unwrap();

        let err = leap.inspect().await.expect_err("15.6 manifest has no 16.0 image");
        assert!(matches!(err, ArtifactError::NotFound { .. }), "{err}");
        assert_eq!(
            getter.requested(),
            vec![
                "https://download.opensuse.org/distribution/leap/16.0/appliances/Leap-16.0-Minimal-VM.x86_64-Cloud.qcow2.sha256"
                    .to_string()
            ]
        );
    }

    #[rstest]
    #[case("42.3")]
    #[case("15")]
    #[case("tumbleweed")]
    fn rejects_unknown_versions(#[case] version: &str) {
        let getter = FixtureGetter::new("opensuse/openSUSE-Leap-15.6-Minimal-VM.x86_64-Cloud.qcow2.sha256");
        assert!(matches!(
            Leap::new(version, "x86_64", getter),
            Err(ArtifactError::UnknownVersion { name: "opensuse-leap", .. })
        ));
    }
}
