//! PDF merge, split, image conversion and password protection
//!
//! This crate transforms PDF bytes into new PDF bytes using lopdf. It does no
//! file or network I/O; callers hand over bytes and receive bytes plus a
//! suggested download name.
//!
//! The main entry point is [`Engine`]; the free functions below wrap a
//! default-configured engine.

pub mod assemble;
pub mod command;
pub mod config;
pub mod delivery;
pub mod document;
pub mod encryption;
pub mod engine;
pub mod error;
pub mod inspect;
pub mod layout;
pub mod protect;
pub mod ranges;
pub mod raster;
mod rc4;

pub use command::{execute, PdfCommand, ProcessMetrics, ProcessResult};
pub use config::EngineConfig;
pub use delivery::{suggested_filename, DeliverySink, Operation};
pub use encryption::{EncryptionProvider, EncryptionStrength, StandardSecurityHandler};
pub use engine::{Engine, ImageInput};
pub use error::{PdfToolsError, Result};
pub use inspect::{inspect, PageInfo, PageOrientation, PdfInfo};
pub use layout::{fit, ImagePlacement, PageSize};
pub use ranges::parse_page_ranges;

/// Parse PDF bytes and return page count
pub fn get_page_count(bytes: &[u8]) -> Result<u32> {
    let doc = lopdf::Document::load_mem(bytes).map_err(|e| PdfToolsError::Parse(e.to_string()))?;
    Ok(doc.get_pages().len() as u32)
}

/// Merge documents in order with default settings
pub fn merge_documents(documents: &[Vec<u8>]) -> Result<Vec<u8>> {
    Engine::default().merge(documents)
}

/// Extract the pages named by `range` with default settings
pub fn split_document(document: &[u8], range: &str) -> Result<Vec<u8>> {
    Engine::default().split(document, range)
}

/// One Letter page per supported image
pub fn images_to_pdf(images: &[ImageInput]) -> Result<Vec<u8>> {
    Engine::default().images_to_pdf(images)
}

/// Encrypt with 128-bit RC4 under `password`
pub fn protect_document(document: &[u8], password: &str) -> Result<Vec<u8>> {
    Engine::default().protect(document, password)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::fixtures::create_test_pdf;

    #[test]
    fn test_get_page_count() {
        assert_eq!(get_page_count(&create_test_pdf(7, "L")).unwrap(), 7);
        assert!(matches!(
            get_page_count(b"garbage"),
            Err(PdfToolsError::Parse(_))
        ));
    }

    #[test]
    fn test_convenience_functions_use_defaults() {
        let merged = merge_documents(&[create_test_pdf(1, "A"), create_test_pdf(2, "B")]).unwrap();
        assert_eq!(get_page_count(&merged).unwrap(), 3);

        let split = split_document(&merged, "2").unwrap();
        assert_eq!(get_page_count(&split).unwrap(), 1);

        let protected = protect_document(&split, "pw").unwrap();
        assert!(inspect(&protected).unwrap().encrypted);
    }
}
