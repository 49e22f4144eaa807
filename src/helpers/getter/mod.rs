//! Fetch capability consumed by the distribution drivers.
//!
//! Drivers only see the [`Getter`] trait, so tests can substitute fixtures
//! for the network.

use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{BoxStream, Stream, StreamExt};
use reqwest::{Client, Response, StatusCode};
use tracing::debug;

use crate::cloud::{ChecksumKind, Hasher};

const USER_AGENT: &str = "containerdisks-medius/0.1";

/// Errors arising while retrieving remote files.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("failed to load {url}: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to download {url}: status {status}")]
    Status { url: String, status: StatusCode },

    #[error("failed to read {url}: {source}")]
    Io {
        url: String,
        #[source]
        source: std::io::Error,
    },
}

/// Retrieves remote files, either whole or as a checksummed stream.
///
/// Dropping a returned future cancels the transfer.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Getter: Send + Sync {
    /// Download `url` into memory.
    async fn get_all(&self, url: &str) -> Result<Vec<u8>, FetchError>;

    /// Open `url` as a stream whose digest is computed while it is read.
    async fn get_with_checksum(&self, url: &str, kind: ChecksumKind) -> Result<ChecksumReader, FetchError>;
}

/// Chunked body that hashes every chunk handed out.
pub struct ChecksumReader {
    chunks: BoxStream<'static, Result<Bytes, FetchError>>,
    hasher: Hasher,
    content_length: Option<u64>,
}

impl ChecksumReader {
    pub fn new<S>(chunks: S, kind: ChecksumKind, content_length: Option<u64>) -> Self
    where
        S: Stream<Item = Result<Bytes, FetchError>> + Send + 'static,
    {
        Self {
            chunks: chunks.boxed(),
            hasher: kind.hasher(),
            content_length,
        }
    }

    /// Next chunk of the body, `None` once it is exhausted.
    pub async fn chunk(&mut self) -> Result<Option<Bytes>, FetchError> {
        match self.chunks.next().await {
            Some(Ok(chunk)) => {
                self.hasher.update(&chunk);
                Ok(Some(chunk))
            }
            Some(Err(err)) => Err(err),
            None => Ok(None),
        }
    }

    /// Digest over the chunks read so far.
    pub fn checksum(&self) -> String {
        self.hasher.hex_digest()
    }

    pub fn content_length(&self) -> Option<u64> {
        self.content_length
    }
}

impl fmt::Debug for ChecksumReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChecksumReader")
            .field("hasher", &self.hasher)
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// [`Getter`] backed by a shared `reqwest` client.
#[derive(Debug, Clone, Default)]
pub struct HttpGetter {
    client: Client,
}

impl HttpGetter {
    pub fn new() -> Self {
        Self::default()
    }

    async fn send(&self, url: &str) -> Result<Response, FetchError> {
        debug!(url, "GET");
        let res = self
            .client
            .get(url)
            .header("User-Agent", USER_AGENT)
            .send()
            .await
            .map_err(|source| FetchError::Request {
                url: url.to_string(),
                source,
            })?;

        let status = res.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }

        Ok(res)
    }
}

#[async_trait]
impl Getter for HttpGetter {
    async fn get_all(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let res = self.send(url).await?;
        let bytes = res.bytes().await.map_err(|source| FetchError::Request {
            url: url.to_string(),
            source,
        })?;
        Ok(bytes.to_vec())
    }

    async fn get_with_checksum(&self, url: &str, kind: ChecksumKind) -> Result<ChecksumReader, FetchError> {
        let res = self.send(url).await?;
        let content_length = res.content_length();
        let url = url.to_string();

        // Response::chunk avoids depending on reqwest's stream feature.
        let chunks = futures_util::stream::try_unfold(res, move |mut res| {
            let url = url.clone();
            async move {
                match res.chunk().await {
                    Ok(Some(chunk)) => Ok(Some((chunk, res))),
                    Ok(None) => Ok(None),
                    Err(source) => Err(FetchError::Request { url, source }),
                }
            }
        });

        Ok(ChecksumReader::new(chunks, kind, content_length))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    #[tokio::test]
    async fn checksum_reader_hashes_every_chunk() {
        let chunks = vec![Ok(Bytes::from_static(b"a")), Ok(Bytes::from_static(b"bc"))];
        let mut reader = ChecksumReader::new(stream::iter(chunks), ChecksumKind::Sha256, Some(3));

        let mut body = Vec::new();
        while let Some(chunk) = reader.chunk().await.unwrap() {
            body.extend_from_slice(&chunk);
        }

        assert_eq!(body, b"abc");
        assert_eq!(reader.content_length(), Some(3));
        assert_eq!(
            reader.checksum(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[tokio::test]
    async fn checksum_reader_surfaces_stream_errors() {
        let chunks = vec![
            Ok(Bytes::from_static(b"a")),
            Err(FetchError::Io {
                url: "https://example.org/disk.img".to_string(),
                source: std::io::Error::other("reset"),
            }),
        ];
        let mut reader = ChecksumReader::new(stream::iter(chunks), ChecksumKind::Sha512, None);

        assert!(reader.chunk().await.unwrap().is_some());
        let err = reader.chunk().await.expect_err("second chunk fails");
        assert_eq!(err.to_string(), "failed to read https://example.org/disk.img: reset");
    }
}
