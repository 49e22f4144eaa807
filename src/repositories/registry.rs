use std::sync::Arc;

use tracing::warn;

use super::fedora::FedoraGatherer;
use super::models::{EntryConfig, ReposError};
use super::{Artifact, ArtifactsGatherer};
use crate::helpers::getter::Getter;

/// Constructed artifacts of one catalog entry plus its publishing flags.
#[derive(Clone)]
pub struct RegistryEntry {
    pub artifacts: Vec<Arc<dyn Artifact>>,
    pub use_for_docs: bool,
    pub use_for_latest: bool,
    pub skip_when_not_focused: bool,
}

impl RegistryEntry {
    /// `name:version` of the first artifact, if any.
    pub fn describe(&self) -> Option<String> {
        self.artifacts.first().map(|artifact| artifact.metadata().describe())
    }
}

/// Build the registry from `entries`, then append gathered Fedora releases.
///
/// # Errors
///
/// Fails when a catalog entry names an unknown version or architecture.
/// Gatherer failures are only logged.
pub async fn new_registry(entries: &[EntryConfig], getter: Arc<dyn Getter>) -> Result<Vec<RegistryEntry>, ReposError> {
    let mut registry = Vec::with_capacity(entries.len());
    for entry in entries {
        let artifacts = entry
            .artifacts()
            .iter()
            .map(|config| config.build(getter.clone()))
            .collect::<Result<Vec<_>, _>>()?;

        registry.push(RegistryEntry {
            artifacts,
            use_for_docs: entry.use_for_docs(),
            use_for_latest: entry.use_for_latest(),
            skip_when_not_focused: entry.skip_when_not_focused(),
        });
    }

    let gatherers: Vec<Box<dyn ArtifactsGatherer>> = vec![Box::new(FedoraGatherer::new(getter))];
    gather_artifacts(&mut registry, &gatherers).await;

    Ok(registry)
}

async fn gather_artifacts(registry: &mut Vec<RegistryEntry>, gatherers: &[Box<dyn ArtifactsGatherer>]) {
    for gatherer in gatherers {
        match gatherer.gather().await {
            Ok(groups) => {
                for (i, artifacts) in groups.into_iter().enumerate() {
                    registry.push(RegistryEntry {
                        artifacts,
                        use_for_docs: i == 0,
                        use_for_latest: i == 0,
                        skip_when_not_focused: false,
                    });
                }
            }
            Err(err) => warn!(%err, "failed to gather artifacts"),
        }
    }
}

/// Whether `entry` is excluded by `focus`.
///
/// An empty focus only skips entries marked `skip_when_not_focused`.
/// `name:*` selects every version of `name`; anything else must equal the
/// `name:version` of the entry's first artifact.
pub fn should_skip(focus: &str, entry: &RegistryEntry) -> bool {
    if focus.is_empty() {
        return entry.skip_when_not_focused;
    }

    let Some(first) = entry.artifacts.first() else {
        return true;
    };
    let metadata = first.metadata();

    match focus.split_once(':') {
        Some((name, "*")) => name != metadata.name(),
        _ => focus != metadata.describe(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::{ArtifactDetails, ChecksumKind, ImageChecksum, Metadata};
    use crate::repositories::ArtifactError;
    use crate::repositories::generic::Generic;
    use crate::repositories::models::load_from_json_str;
    use crate::testutil::FixtureGetter;
    use async_trait::async_trait;
    use rstest::rstest;

    fn entry(name: &str, version: &str, skip_when_not_focused: bool) -> RegistryEntry {
        let details = ArtifactDetails::new(
            ImageChecksum::new(ChecksumKind::Sha256, "00"),
            "https://example.org/disk.img",
            "amd64",
        );
        RegistryEntry {
            artifacts: vec![Arc::new(Generic::new(details, Metadata::new(name, version)))],
            use_for_docs: false,
            use_for_latest: false,
            skip_when_not_focused,
        }
    }

    #[rstest]
    #[case("", false, false)]
    #[case("", true, true)]
    #[case("centos-stream:9", false, false)]
    #[case("centos-stream:9", true, false)]
    #[case("centos-stream:8", false, true)]
    #[case("centos-stream:*", true, false)]
    #[case("fedora:*", false, true)]
    #[case("centos-stream", false, true)]
    fn focus_filters_entries(#[case] focus: &str, #[case] skip_flag: bool, #[case] skipped: bool) {
        assert_eq!(should_skip(focus, &entry("centos-stream", "9", skip_flag)), skipped);
    }

    #[test]
    fn empty_entries_are_skipped_under_focus() {
        let empty = RegistryEntry {
            artifacts: Vec::new(),
            use_for_docs: false,
            use_for_latest: false,
            skip_when_not_focused: false,
        };
        assert!(should_skip("centos:8.4", &empty));
        assert!(!should_skip("", &empty));
        assert_eq!(empty.describe(), None);
    }

    #[tokio::test]
    async fn registry_appends_gathered_fedora_releases() {
        let entries = load_from_json_str(r#"[{"artifacts": [{"distro": "centos", "version": "8.4"}]}]"#).unwrap();
        let getter = FixtureGetter::new("fedora/releases.json");

        let registry = new_registry(&entries, getter).await.unwrap();

        let described: Vec<_> = registry.iter().map(|entry| entry.describe().unwrap()).collect();
        assert_eq!(described, vec!["centos:8.4", "fedora:39", "fedora:38"]);
        assert!(registry[1].use_for_latest && registry[1].use_for_docs);
        assert!(!registry[2].use_for_latest && !registry[2].use_for_docs);
    }

    #[tokio::test]
    async fn gatherer_failure_keeps_static_entries() {
        let entries = load_from_json_str(r#"[{"artifacts": [{"distro": "rhcos", "version": "4.9"}]}]"#).unwrap();
        let getter = FixtureGetter::new("fedora/broken.json");

        let registry = new_registry(&entries, getter).await.unwrap();

        assert_eq!(registry.len(), 1);
        assert_eq!(registry[0].describe().as_deref(), Some("rhcos:4.9"));
    }

    #[tokio::test]
    async fn invalid_entry_fails_construction() {
        let entries = load_from_json_str(r#"[{"artifacts": [{"distro": "centos", "version": "6"}]}]"#).unwrap();
        let getter = FixtureGetter::new("fedora/releases.json");

        let result = new_registry(&entries, getter).await;
        assert!(matches!(result, Err(ReposError::Artifact(ArtifactError::UnknownVersion { .. }))));
    }

    struct EmptyGatherer;

    #[async_trait]
    impl ArtifactsGatherer for EmptyGatherer {
        async fn gather(&self) -> Result<Vec<Vec<Arc<dyn Artifact>>>, ArtifactError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn empty_gather_adds_nothing() {
        let mut registry = vec![entry("cirros", "6.1", true)];
        let gatherers: Vec<Box<dyn ArtifactsGatherer>> = vec![Box::new(EmptyGatherer)];

        gather_artifacts(&mut registry, &gatherers).await;
        assert_eq!(registry.len(), 1);
    }
}
