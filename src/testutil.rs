use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;

use crate::cloud::ChecksumKind;
use crate::helpers::getter::{ChecksumReader, FetchError, Getter};

const CHUNK_SIZE: usize = 4096;

pub fn fixture_path(rel: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("testdata").join(rel)
}

/// Serves one fixture file for every URL and records what was requested.
#[derive(Debug)]
pub struct FixtureGetter {
    file: PathBuf,
    requested: Mutex<Vec<String>>,
}

impl FixtureGetter {
    pub fn new(rel: &str) -> Arc<Self> {
        Arc::new(Self {
            file: fixture_path(rel),
            requested: Mutex::new(Vec::new()),
        })
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }

    fn read(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.requested.lock().unwrap().push(url.to_string());
        std::fs::read(&self.file).map_err(|source| FetchError::Io {
            url: url.to_string(),
            source,
        })
    }
}

#[async_trait]
impl Getter for FixtureGetter {
    async fn get_all(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.read(url)
    }

    async fn get_with_checksum(&self, url: &str, kind: ChecksumKind) -> Result<ChecksumReader, FetchError> {
        let body = self.read(url)?;
        let len = body.len() as u64;
        let chunks: Vec<Result<Bytes, FetchError>> = body
            .chunks(CHUNK_SIZE)
            .map(|chunk| Ok(Bytes::copy_from_slice(chunk)))
            .collect();
        Ok(ChecksumReader::new(futures::stream::iter(chunks), kind, Some(len)))
    }
}
