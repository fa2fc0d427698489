use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PdfToolsError {
    /// Caller-correctable precondition failure, reported before heavy work
    #[error("{0}")]
    Validation(String),

    #[error("Failed to parse PDF: {0}")]
    Parse(String),

    /// Per-image condition; `images_to_pdf` skips the item instead of failing
    #[error("Unsupported image: {0}")]
    UnsupportedFormat(String),

    #[error("Encryption failed: {0}")]
    Encryption(String),

    #[error("PDF operation failed: {0}")]
    Internal(String),
}

impl PdfToolsError {
    /// Whether the user can fix the failure by changing their input
    pub fn is_user_correctable(&self) -> bool {
        matches!(self, PdfToolsError::Validation(_))
    }
}

impl From<lopdf::Error> for PdfToolsError {
    fn from(err: lopdf::Error) -> Self {
        PdfToolsError::Internal(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PdfToolsError>;
