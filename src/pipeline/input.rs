//! Input acquisition: turn a user-supplied path or URL into an
//! [`UploadedDocument`] held in memory.
//!
//! The documents are small (a CV, a job advert), so both are read fully into
//! memory; the filename travels with the bytes because the extractor picks
//! its parser from the suffix alone.

use crate::error::AnalyserError;
use std::path::Path;
use tracing::{debug, info};

/// One uploaded document: raw bytes plus the filename used to pick a parser.
#[derive(Clone, PartialEq, Eq)]
pub struct UploadedDocument {
    pub bytes: Vec<u8>,
    pub filename: String,
}

impl std::fmt::Debug for UploadedDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadedDocument")
            .field("filename", &self.filename)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl UploadedDocument {
    pub fn new(bytes: impl Into<Vec<u8>>, filename: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            filename: filename.into(),
        }
    }

    /// Read a document from a local path or download it from an HTTP(S) URL.
    pub async fn load(input: &str, download_timeout_secs: u64) -> Result<Self, AnalyserError> {
        if is_url(input) {
            download_url(input, download_timeout_secs).await
        } else {
            read_local(Path::new(input)).await
        }
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

async fn read_local(path: &Path) -> Result<UploadedDocument, AnalyserError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => AnalyserError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => AnalyserError::DocumentNotFound {
            path: path.to_path_buf(),
        },
    })?;

    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned());

    debug!("Read {} ({} bytes)", path.display(), bytes.len());
    Ok(UploadedDocument { bytes, filename })
}

/// Download a URL into memory.
async fn download_url(url: &str, timeout_secs: u64) -> Result<UploadedDocument, AnalyserError> {
    info!("Downloading document from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| AnalyserError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            AnalyserError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            AnalyserError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(AnalyserError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| AnalyserError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    info!("Downloaded {} bytes", bytes.len());
    Ok(UploadedDocument {
        bytes: bytes.to_vec(),
        filename: filename_from_url(url),
    })
}

/// Last path segment of the URL, or a neutral name without a known suffix.
fn filename_from_url(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() && last.contains('.') {
                    return last.to_string();
                }
            }
        }
    }

    "download".to_string()
}
