use serde::{Deserialize, Serialize};
use url::Url;

/// One entry of a JSON release feed such as Fedora's `releases.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseRecord {
    #[serde(default)]
    subvariant: String,
    #[serde(default)]
    variant: String,
    version: String,
    link: String,
    // Absent for some images; the digest then lives in a companion file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sha256: Option<String>,
    arch: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    size: Option<String>,
}

#[allow(unused)]
impl ReleaseRecord {
    /// e.g. Cloud_Base
    pub fn subvariant(&self) -> &str {
        &self.subvariant
    }

    /// e.g. Cloud
    pub fn variant(&self) -> &str {
        &self.variant
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn link(&self) -> &str {
        &self.link
    }

    pub fn sha256(&self) -> Option<&str> {
        self.sha256.as_deref().filter(|s| !s.is_empty())
    }

    pub fn arch(&self) -> &str {
        &self.arch
    }

    pub fn size(&self) -> Option<&str> {
        self.size.as_deref()
    }

    /// Last path segment of the download link.
    pub fn file_name(&self) -> String {
        Url::parse(&self.link)
            .ok()
            .and_then(|url| {
                url.path_segments()
                    .and_then(|mut segments| segments.next_back().map(str::to_string))
            })
            .unwrap_or_else(|| {
                self.link
                    .rsplit('/')
                    .next()
                    .unwrap_or_default()
                    .to_string()
            })
    }
}

/// Deserialize a release feed. No filtering happens here.
pub fn parse_releases(raw: &[u8]) -> Result<Vec<ReleaseRecord>, serde_json::Error> {
    serde_json::from_slice(raw)
}
