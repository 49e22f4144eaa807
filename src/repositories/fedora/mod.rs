//! Fedora Cloud Base images, resolved from the `releases.json` feed.

use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use regex::Regex;
use tracing::debug;

use super::{Artifact, ArtifactError, ArtifactsGatherer};
use crate::cloud::{ArtifactDetails, ChecksumKind, ImageChecksum, Metadata, ReleaseRecord, image_architecture, parse_releases};
use crate::helpers::getter::Getter;

const NAME: &str = "fedora";
const RELEASES_URL: &str = "https://getfedora.org/releases.json";
const VARIANT: &str = "Cloud";
const SUBVARIANT: &str = "Cloud_Base";
const MINIMUM_VERSION: u32 = 38;
const GATHERED_ARCHS: [&str; 2] = ["x86_64", "aarch64"];

fn unique_tag_regex() -> &'static Regex {
    static TAG_RE: OnceLock<Regex> = OnceLock::new();
    TAG_RE.get_or_init(|| Regex::new(r"\d+-\d+\.\d+").expect("invalid fedora tag regex"))
}

async fn fetch_releases(getter: &dyn Getter) -> Result<Vec<ReleaseRecord>, ArtifactError> {
    let raw = getter.get_all(RELEASES_URL).await?;
    parse_releases(&raw).map_err(|source| ArtifactError::ParseReleases {
        file: RELEASES_URL.to_string(),
        source,
    })
}

pub struct Fedora {
    version: String,
    arch: String,
    image_arch: &'static str,
    getter: Arc<dyn Getter>,
}

impl Fedora {
    /// `version` is a plain release number such as `39`.
    pub fn new(version: &str, arch: &str, getter: Arc<dyn Getter>) -> Result<Self, ArtifactError> {
        if version.parse::<u32>().is_err() {
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

    fn release_matches(&self, release: &ReleaseRecord) -> bool {
        release.version() == self.version
            && release.arch() == self.arch
            && release.variant() == VARIANT
            && release.link().ends_with("qcow2")
    }
}

#[async_trait]
impl Artifact for Fedora {
    async fn inspect(&self) -> Result<ArtifactDetails, ArtifactError> {
        let releases = fetch_releases(self.getter.as_ref()).await?;

        // Feed order decides between duplicate records.
        let release = releases
            .iter()
            .find(|release| self.release_matches(release))
            .ok_or_else(|| ArtifactError::NotFound {
                version: self.version.clone(),
                variant: VARIANT.to_string(),
            })?;
        debug!(link = release.link(), "selected release");

        let checksum = release.sha256().ok_or_else(|| ArtifactError::Inconsistent {
            name: release.file_name(),
            file: RELEASES_URL.to_string(),
        })?;

        let tags = unique_tag_regex()
            .find(&release.file_name())
            .map(|m| vec![m.as_str().to_string()])
            .unwrap_or_default();

        Ok(ArtifactDetails::new(
            ImageChecksum::new(ChecksumKind::Sha256, checksum),
            release.link(),
            self.image_arch,
        )
        .with_additional_unique_tags(tags))
    }

    fn metadata(&self) -> Metadata {
        Metadata::new(NAME, &self.version).with_arch(&self.arch)
    }
}

/// Finds every Fedora release recent enough to be published.
pub struct FedoraGatherer {
    getter: Arc<dyn Getter>,
}

impl FedoraGatherer {
    pub fn new(getter: Arc<dyn Getter>) -> Self {
        Self { getter }
    }

    fn release_version(release: &ReleaseRecord) -> Option<u32> {
        let version = release.version().parse::<u32>().ok()?;
        let matches = version >= MINIMUM_VERSION
            && GATHERED_ARCHS.contains(&release.arch())
            && release.variant() == VARIANT
            && release.subvariant() == SUBVARIANT
            && release.link().ends_with("qcow2");
        matches.then_some(version)
    }
}

#[async_trait]
impl ArtifactsGatherer for FedoraGatherer {
    /// One group per version, newest first; architectures in feed order.
    async fn gather(&self) -> Result<Vec<Vec<Arc<dyn Artifact>>>, ArtifactError> {
        let releases = fetch_releases(self.getter.as_ref()).await?;

        let mut versions: BTreeMap<u32, Vec<&ReleaseRecord>> = BTreeMap::new();
        for release in &releases {
            if let Some(version) = Self::release_version(release) {
                let group = versions.entry(version).or_default();
                if !group.iter().any(|r| r.arch() == release.arch()) {
                    group.push(release);
                }
            }
        }

        let mut artifacts = Vec::with_capacity(versions.len());
        for group in versions.into_values().rev() {
            let mut group_artifacts: Vec<Arc<dyn Artifact>> = Vec::with_capacity(group.len());
            for release in group {
                let fedora = Fedora::new(release.version(), release.arch(), self.getter.clone())?;
                group_artifacts.push(Arc::new(fedora));
            }
            artifacts.push(group_artifacts);
        }

        debug!(versions = artifacts.len(), "gathered fedora releases");
        Ok(artifacts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::getter::{FetchError, MockGetter};
    use crate::testutil::FixtureGetter;
    use rstest::rstest;

    #[rstest]
    #[case(
        "35",
        "x86_64",
        "amd64",
        "fe84502779b3477284a8d4c86731f642ca10dd3984d2b5eccdf82630a9ca2de6",
        "https://download.fedoraproject.org/pub/fedora/linux/releases/35/Cloud/x86_64/images/Fedora-Cloud-Base-35-1.2.x86_64.qcow2",
        "35-1.2"
    )]
    #[case(
        "35",
        "aarch64",
        "arm64",
        "1cafc8a5e50697051053c7795a6fe8473eb87a6ae067b4fe9fd786d7e54fa06e",
        "https://download.fedoraproject.org/pub/fedora/linux/releases/35/Cloud/aarch64/images/Fedora-Cloud-Base-35-1.2.aarch64.qcow2",
        "35-1.2"
    )]
    #[case(
        "34",
        "x86_64",
        "amd64",
        "b9b621b26725ba95442d9a56cbaa054784e0779a9522ec6eafff07c6e6f717ea",
        "https://download.fedoraproject.org/pub/fedora/linux/releases/34/Cloud/x86_64/images/Fedora-Cloud-Base-34-1.2.x86_64.qcow2",
        "34-1.2"
    )]
    #[tokio::test]
    async fn resolves_first_matching_release(
        #[case] version: &str,
        #[case] arch: &str,
        #[case] image_arch: &str,
        #[case] checksum: &str,
        #[case] link: &str,
        #[case] tag: &str,
    ) {
        let getter = FixtureGetter::new("fedora/releases.json");
        let fedora = Fedora::new(version, arch, getter.clone()).unwrap();

        let details = fedora.inspect().await.unwrap();

        let expected = ArtifactDetails::new(ImageChecksum::new(ChecksumKind::Sha256, checksum), link, image_arch)
            .with_additional_unique_tags(vec![tag.to_string()]);
        assert_eq!(details, expected);
        assert_eq!(getter.requested(), vec![RELEASES_URL.to_string()]);
    }

    #[tokio::test]
    async fn release_without_checksum_is_inconsistent() {
        let getter = FixtureGetter::new("fedora/releases.json");
        let fedora = Fedora::new("33", "x86_64", getter).unwrap();

        let err = fedora.inspect().await.expect_err("33 has no checksum");
        assert!(matches!(err, ArtifactError::Inconsistent { .. }), "{err}");
    }

    #[tokio::test]
    async fn unknown_release_is_not_found() {
        let getter = FixtureGetter::new("fedora/releases.json");
        let fedora = Fedora::new("30", "x86_64", getter).unwrap();

        let err = fedora.inspect().await.expect_err("30 is not in the feed");
        assert_eq!(err.to_string(), "no candidate found for version 30 and variant Cloud");
    }

    #[tokio::test]
    async fn malformed_feed_is_a_parse_error() {
        let getter = FixtureGetter::new("fedora/broken.json");
        let fedora = Fedora::new("35", "x86_64", getter).unwrap();

        let err = fedora.inspect().await.expect_err("feed is broken");
        assert!(matches!(err, ArtifactError::ParseReleases { .. }), "{err}");
    }

    #[tokio::test]
    async fn transport_failure_is_propagated() {
        let mut getter = MockGetter::new();
        getter
            .expect_get_all()
            .withf(|url| url == RELEASES_URL)
            .times(1)
            .returning(|url| {
                Err(FetchError::Io {
                    url: url.to_string(),
                    source: std::io::Error::other("timeout"),
                })
            });
        let fedora = Fedora::new("35", "x86_64", Arc::new(getter)).unwrap();

        let err = fedora.inspect().await.expect_err("transport fails");
        assert!(matches!(err, ArtifactError::Fetch(_)), "{err}");
    }

    #[rstest]
    #[case("rawhide", "x86_64")]
    #[case("", "x86_64")]
    fn rejects_non_numeric_versions(#[case] version: &str, #[case] arch: &str) {
        let getter = FixtureGetter::new("fedora/releases.json");
        assert!(matches!(
            Fedora::new(version, arch, getter),
            Err(ArtifactError::UnknownVersion { .. })
        ));
    }

    #[tokio::test]
    async fn gatherer_groups_recent_versions_newest_first() {
        let getter = FixtureGetter::new("fedora/releases.json");
        let gatherer = FedoraGatherer::new(getter);

        let groups = gatherer.gather().await.unwrap();

        let described: Vec<Vec<Metadata>> = groups
            .iter()
            .map(|group| group.iter().map(|artifact| artifact.metadata()).collect())
            .collect();
        assert_eq!(
            described,
            vec![
                vec![
                    Metadata::new("fedora", "39").with_arch("x86_64"),
                    Metadata::new("fedora", "39").with_arch("aarch64"),
                ],
                vec![
                    Metadata::new("fedora", "38").with_arch("x86_64"),
                    Metadata::new("fedora", "38").with_arch("aarch64"),
                ],
            ]
        );
    }

    #[tokio::test]
    async fn gathered_artifacts_resolve_against_the_feed() {
        let getter = FixtureGetter::new("fedora/releases.json");
        let groups = FedoraGatherer::new(getter).gather().await.unwrap();

        let details = groups[0][0].inspect().await.unwrap();
        assert!(details.download_url().ends_with("Fedora-Cloud-Base-39-1.5.x86_64.qcow2"));
        assert_eq!(details.additional_unique_tags(), ["39-1.5".to_string()]);
    }
}
