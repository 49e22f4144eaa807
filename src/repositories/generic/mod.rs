use async_trait::async_trait;

use super::{Artifact, ArtifactError};
use crate::cloud::{ArtifactDetails, Metadata};

/// Artifact whose descriptor is known up front; nothing is fetched.
#[derive(Debug, Clone)]
pub struct Generic {
    details: ArtifactDetails,
    metadata: Metadata,
}

impl Generic {
    pub fn new(details: ArtifactDetails, metadata: Metadata) -> Self {
        Self { details, metadata }
    }
}

#[async_trait]
impl Artifact for Generic {
    async fn inspect(&self) -> Result<ArtifactDetails, ArtifactError> {
        Ok(self.details.clone())
    }

    fn metadata(&self) -> Metadata {
        self.metadata.clone()
    }
}
