mod architecture;
mod artifact;
mod checksum;
mod release;

pub use architecture::{ArchitectureError, image_architecture};
pub use artifact::{ArtifactDetails, Compression, Metadata, prepare_tags};
pub use checksum::{ChecksumKind, Hasher, ImageChecksum};
pub use release::{ReleaseRecord, parse_releases};
