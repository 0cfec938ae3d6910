//! Per-request upload files
//!
//! Each upload is written to a uniquely named file in the upload directory.
//! The file is removed when the guard is closed or dropped, so every exit
//! path of the request handler cleans up.

use crate::error::AnalyzerError;
use crate::Result;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

const FILE_PREFIX: &str = "financial_document_";
const FILE_SUFFIX: &str = ".pdf";

/// An uploaded document on disk, deleted with the guard
#[derive(Debug)]
pub struct UploadedDocument {
    file: NamedTempFile,
}

impl UploadedDocument {
    /// Write `bytes` to a fresh file inside `dir`.
    pub async fn persist(dir: &Path, bytes: Vec<u8>) -> Result<Self> {
        let dir = dir.to_path_buf();

        let file = tokio::task::spawn_blocking(move || -> Result<NamedTempFile> {
            std::fs::create_dir_all(&dir)?;
            let mut file = tempfile::Builder::new()
                .prefix(FILE_PREFIX)
                .suffix(FILE_SUFFIX)
                .tempfile_in(&dir)?;
            file.write_all(&bytes)?;
            file.flush()?;
            Ok(file)
        })
        .await
        .map_err(|e| AnalyzerError::PipelineError(format!("upload writer aborted: {}", e)))??;

        debug!(path = %file.path().display(), "Upload persisted");
        Ok(Self { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn path_string(&self) -> String {
        self.file.path().to_string_lossy().to_string()
    }

    /// Delete the file now, logging instead of failing if removal errors.
    pub fn close(self) {
        let path: PathBuf = self.file.path().to_path_buf();
        match self.file.close() {
            Ok(()) => debug!(path = %path.display(), "Upload removed"),
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove upload"),
        }
    }
}
