//! Download stage: streams a resolved artifact to disk and verifies it.

use std::cmp::min;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use crate::cloud::ArtifactDetails;
use crate::helpers::getter::{FetchError, Getter};

#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to build progress style: {0}")]
    Style(#[from] indicatif::style::TemplateError),

    #[error("expected {kind} checksum {expected} for {url}, got {actual}")]
    ChecksumMismatch {
        url: String,
        kind: String,
        expected: String,
        actual: String,
    },
}

/// Name of the local file for `url`, falling back to "download".
pub fn file_name_for(url: &str) -> &str {
    url.rsplit('/').find(|s| !s.is_empty()).unwrap_or("download")
}

fn progress_bar(total: Option<u64>, url: &str) -> Result<ProgressBar, DownloadError> {
    let pb = match total {
        Some(total) => ProgressBar::new(total),
        None => ProgressBar::no_length(),
    };
    let style = ProgressStyle::with_template(
        "{msg}\n{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] \
         {bytes}/{total_bytes} ({bytes_per_sec}, {eta})",
    )?
    .progress_chars("#>-");
    pb.set_style(style);
    pb.set_message(format!("Downloading {url}"));
    Ok(pb)
}

/// Download `details` into `dest_dir` and check it against its checksum.
///
/// On a mismatch the partial file is removed before returning the error.
pub async fn download_verified(
    getter: &dyn Getter,
    details: &ArtifactDetails,
    dest_dir: &Path,
) -> Result<PathBuf, DownloadError> {
    let url = details.download_url();
    let mut reader = getter.get_with_checksum(url, details.checksum_kind()).await?;
    let pb = progress_bar(reader.content_length(), url)?;

    let out_path = dest_dir.join(file_name_for(url));
    let write_err = |source| DownloadError::Write {
        path: out_path.clone(),
        source,
    };
    let mut file = File::create(&out_path).map_err(write_err)?;
    let mut downloaded: u64 = 0;

    while let Some(chunk) = reader.chunk().await? {
        file.write_all(&chunk).map_err(write_err)?;

        downloaded += chunk.len() as u64;
        match reader.content_length() {
            Some(total) => pb.set_position(min(downloaded, total)),
            None => pb.set_position(downloaded),
        }
    }
    file.flush().map_err(write_err)?;
    drop(file);

    let actual = reader.checksum();
    if !details.checksum().matches(&actual) {
        pb.abandon_with_message(format!("Checksum mismatch for {url}"));
        if let Err(err) = fs::remove_file(&out_path) {
            debug!(path = %out_path.display(), %err, "failed to remove corrupt download");
        }
        return Err(DownloadError::ChecksumMismatch {
            url: url.to_string(),
            kind: details.checksum_kind().to_string(),
            expected: details.checksum_value().to_string(),
            actual,
        });
    }

    pb.finish_with_message(format!("Downloaded {url} to {}", out_path.display()));
    info!(url, path = %out_path.display(), "download verified");
    Ok(out_path)
}
