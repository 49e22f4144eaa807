/// Raised for upstream architecture names with no container image equivalent.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("can't map unknown architecture {0:?} to image architecture")]
pub struct ArchitectureError(pub String);

/// Map an upstream architecture name to the one used in container images.
pub fn image_architecture(arch: &str) -> Result<&'static str, ArchitectureError> {
    match arch {
        "x86_64" => Ok("amd64"),
        "aarch64" => Ok("arm64"),
        "s390x" => Ok("s390x"),
        other => Err(ArchitectureError(other.to_string())),
    }
}
