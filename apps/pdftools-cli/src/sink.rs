//! Delivering finished documents to disk

use pdftools_core::{DeliverySink, PdfToolsError, Result};
use std::fs;
use std::path::PathBuf;

/// Where a finished document is written
#[derive(Debug, Clone)]
pub enum FileSink {
    /// Write into a directory under the suggested filename
    Directory(PathBuf),
    /// Write to an explicit path, ignoring the suggestion
    File(PathBuf),
}

impl FileSink {
    pub fn target(&self, suggested_filename: &str) -> PathBuf {
        match self {
            FileSink::Directory(dir) => dir.join(suggested_filename),
            FileSink::File(path) => path.clone(),
        }
    }
}

impl DeliverySink for FileSink {
    fn deliver(&self, bytes: &[u8], suggested_filename: &str) -> Result<()> {
        let target = self.target(suggested_filename);
        if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                PdfToolsError::Internal(format!("Cannot create {}: {}", parent.display(), e))
            })?;
        }
        fs::write(&target, bytes).map_err(|e| {
            PdfToolsError::Internal(format!("Cannot write {}: {}", target.display(), e))
        })?;
        tracing::info!(path = %target.display(), bytes = bytes.len(), "Wrote document");
        Ok(())
    }
}
