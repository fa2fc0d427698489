//! Engine configuration

use crate::encryption::EncryptionStrength;
use crate::error::{PdfToolsError, Result};
use crate::layout::PageSize;
use serde::{Deserialize, Serialize};

/// Settings that stay fixed for the lifetime of an `Engine`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Page size used for pages created from images
    pub page_size: PageSize,
    /// Key strength used by the default encryption provider
    pub encryption: EncryptionStrength,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            page_size: PageSize::LETTER,
            encryption: EncryptionStrength::Rc4_128,
        }
    }
}

impl EngineConfig {
    /// Reject page sizes that cannot hold an image
    pub fn validate(&self) -> Result<()> {
        let PageSize { width, height } = self.page_size;
        if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
            return Err(PdfToolsError::Validation(format!(
                "Page size must be positive, got {} x {}",
                width, height
            )));
        }
        Ok(())
    }
}
