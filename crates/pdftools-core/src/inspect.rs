//! Document summaries
//!
//! Reads what a caller needs to show before running an operation: page
//! count, header version, encryption, metadata and per-page geometry.
//! Encrypted files are summarized too; only their page geometry may be
//! missing.

use crate::document::inherited_attribute;
use crate::error::{PdfToolsError, Result};
use lopdf::{Dictionary, Document, Object};
use serde::Serialize;

/// File-level information
#[derive(Debug, Clone, Serialize, Default)]
pub struct PdfInfo {
    /// Number of pages in the document
    pub page_count: u32,
    /// Header version (e.g. "1.7")
    pub version: String,
    pub encrypted: bool,
    pub size_bytes: usize,
    /// Document title from the Info dictionary
    pub title: Option<String>,
    /// Document author from the Info dictionary
    pub author: Option<String>,
    pub pages: Vec<PageInfo>,
}

/// Information about a single page
#[derive(Debug, Clone, Serialize)]
pub struct PageInfo {
    /// Page number (1-indexed)
    pub page_num: u32,
    /// Width in points
    pub width: f32,
    /// Height in points
    pub height: f32,
    /// Rotation in degrees (0, 90, 180, 270)
    pub rotation: i32,
    pub has_content: bool,
    /// Orientation as displayed, after rotation
    pub orientation: PageOrientation,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum PageOrientation {
    Portrait,
    Landscape,
    Square,
}

impl PageOrientation {
    fn from_dimensions(width: f64, height: f64, rotation: i32) -> Self {
        let (w, h) = if rotation == 90 || rotation == 270 {
            (height, width)
        } else {
            (width, height)
        };
        if (w - h).abs() < 1.0 {
            PageOrientation::Square
        } else if w > h {
            PageOrientation::Landscape
        } else {
            PageOrientation::Portrait
        }
    }
}

/// Summarize a PDF without modifying it
pub fn inspect(bytes: &[u8]) -> Result<PdfInfo> {
    quick_validate(bytes)?;

    let document =
        Document::load_mem(bytes).map_err(|e| PdfToolsError::Parse(e.to_string()))?;
    let encrypted = document.is_encrypted();

    let page_ids = document.get_pages();
    if page_ids.is_empty() {
        return Err(PdfToolsError::Parse("PDF has no pages".into()));
    }

    let mut pages = Vec::with_capacity(page_ids.len());
    for (&page_num, &page_id) in &page_ids {
        let dict = document
            .get_object(page_id)
            .and_then(Object::as_dict)
            .map_err(|e| PdfToolsError::Parse(format!("Page {}: {}", page_num, e)))?;
        pages.push(page_info(&document, dict, page_num)?);
    }

    let (title, author) = if encrypted {
        (None, None)
    } else {
        (
            info_string(&document, b"Title"),
            info_string(&document, b"Author"),
        )
    };

    Ok(PdfInfo {
        page_count: page_ids.len() as u32,
        version: extract_version(bytes),
        encrypted,
        size_bytes: bytes.len(),
        title,
        author,
        pages,
    })
}

/// Header and trailer sanity check without parsing the object graph
pub fn quick_validate(bytes: &[u8]) -> Result<()> {
    if bytes.len() < 8 {
        return Err(PdfToolsError::Parse("File too small to be a valid PDF".into()));
    }
    if !bytes.starts_with(b"%PDF-") {
        return Err(PdfToolsError::Parse(
            "Not a valid PDF file (missing %PDF- header)".into(),
        ));
    }

    let tail = &bytes[bytes.len().saturating_sub(1024)..];
    if !tail.windows(5).any(|w| w == b"%%EOF") {
        return Err(PdfToolsError::Parse(
            "PDF appears truncated (missing %%EOF marker)".into(),
        ));
    }
    Ok(())
}

fn page_info(doc: &Document, page: &Dictionary, page_num: u32) -> Result<PageInfo> {
    let media_box = match page_attribute(doc, page, b"MediaBox") {
        Some(obj) => parse_box(obj)
            .map_err(|reason| PdfToolsError::Parse(format!("Page {}: {}", page_num, reason)))?,
        None => [0.0, 0.0, 612.0, 792.0],
    };
    let width = (media_box[2] - media_box[0]).abs();
    let height = (media_box[3] - media_box[1]).abs();

    let rotation = page_attribute(doc, page, b"Rotate")
        .and_then(|obj| obj.as_i64().ok())
        .map(normalize_rotation)
        .unwrap_or(0);

    Ok(PageInfo {
        page_num,
        width: width as f32,
        height: height as f32,
        rotation,
        has_content: page.has(b"Contents"),
        orientation: PageOrientation::from_dimensions(width, height, rotation),
    })
}

fn page_attribute<'a>(doc: &'a Document, page: &'a Dictionary, key: &[u8]) -> Option<&'a Object> {
    page.get(key)
        .ok()
        .or_else(|| inherited_attribute(doc, page, key))
}

fn parse_box(obj: &Object) -> std::result::Result<[f64; 4], String> {
    let array = obj.as_array().map_err(|_| "MediaBox is not an array".to_string())?;
    if array.len() != 4 {
        return Err("MediaBox must have 4 elements".into());
    }

    let mut result = [0.0; 4];
    for (i, value) in array.iter().enumerate() {
        result[i] = match value {
            Object::Integer(n) => *n as f64,
            Object::Real(n) => *n as f64,
            _ => return Err(format!("MediaBox element {} is not a number", i)),
        };
    }
    Ok(result)
}

fn normalize_rotation(angle: i64) -> i32 {
    angle.rem_euclid(360) as i32
}

fn extract_version(bytes: &[u8]) -> String {
    bytes
        .get(5..8)
        .and_then(|v| std::str::from_utf8(v).ok())
        .map(|v| v.trim().to_string())
        .unwrap_or_else(|| "1.4".to_string())
}

fn info_string(doc: &Document, key: &[u8]) -> Option<String> {
    let info_id = doc.trailer.get(b"Info").ok()?.as_reference().ok()?;
    let info = doc.get_object(info_id).ok()?.as_dict().ok()?;
    let raw = info.get(key).ok()?.as_str().ok()?;
    let text = decode_text_string(raw);
    (!text.is_empty()).then_some(text)
}

/// PDF text strings are PDFDocEncoding or UTF-16BE with a BOM
fn decode_text_string(raw: &[u8]) -> String {
    match raw.strip_prefix(&[0xFE, 0xFF]) {
        Some(utf16) => {
            let units: Vec<u16> = utf16
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect();
            String::from_utf16_lossy(&units)
        }
        None => String::from_utf8_lossy(raw).into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::fixtures::create_test_pdf;
    use crate::encryption::{EncryptionProvider, StandardSecurityHandler};
    use lopdf::StringFormat;
    use pretty_assertions::assert_eq;

    fn with_info(bytes: &[u8], title: &[u8], author: &str) -> Vec<u8> {
        let mut doc = Document::load_mem(bytes).unwrap();
        let info_id = doc.add_object(Dictionary::from_iter(vec![
            ("Title", Object::String(title.to_vec(), StringFormat::Literal)),
            (
                "Author",
                Object::String(author.as_bytes().to_vec(), StringFormat::Literal),
            ),
        ]));
        doc.trailer.set("Info", Object::Reference(info_id));
        let mut out = Vec::new();
        doc.save_to(&mut out).unwrap();
        out
    }

    #[test]
    fn test_inspect_counts_pages_and_inherits_media_box() {
        let info = inspect(&create_test_pdf(4, "I")).unwrap();
        assert_eq!(info.page_count, 4);
        assert_eq!(info.version, "1.7");
        assert!(!info.encrypted);
        assert_eq!(info.pages.len(), 4);
        assert_eq!(info.pages[0].page_num, 1);
        assert_eq!(info.pages[0].width, 612.0);
        assert_eq!(info.pages[0].height, 792.0);
        assert_eq!(info.pages[0].orientation, PageOrientation::Portrait);
        assert!(info.pages[0].has_content);
    }

    #[test]
    fn test_inspect_reads_metadata() {
        let mut title = vec![0xFE, 0xFF];
        for unit in "Résumé".encode_utf16() {
            title.extend_from_slice(&unit.to_be_bytes());
        }
        let pdf = with_info(&create_test_pdf(1, "I"), &title, "Ada");
        let info = inspect(&pdf).unwrap();
        assert_eq!(info.title.as_deref(), Some("Résumé"));
        assert_eq!(info.author.as_deref(), Some("Ada"));
    }

    #[test]
    fn test_inspect_flags_encrypted_documents() {
        let pdf = create_test_pdf(2, "I");
        let encrypted = StandardSecurityHandler::default().encrypt(&pdf, "pw").unwrap();
        let info = inspect(&encrypted).unwrap();
        assert!(info.encrypted);
        assert_eq!(info.page_count, 2);
    }

    #[test]
    fn test_quick_validate() {
        assert!(quick_validate(b"tiny").is_err());
        assert!(quick_validate(b"not a pdf file").is_err());
        assert!(quick_validate(b"%PDF-1.7\n1 0 obj").is_err());
        assert!(quick_validate(&create_test_pdf(1, "I")).is_ok());
    }

    #[test]
    fn test_normalize_rotation() {
        assert_eq!(normalize_rotation(0), 0);
        assert_eq!(normalize_rotation(450), 90);
        assert_eq!(normalize_rotation(-90), 270);
        assert_eq!(normalize_rotation(360), 0);
    }

    #[test]
    fn test_orientation_accounts_for_rotation() {
        assert_eq!(
            PageOrientation::from_dimensions(612.0, 792.0, 90),
            PageOrientation::Landscape
        );
        assert_eq!(
            PageOrientation::from_dimensions(500.0, 500.5, 0),
            PageOrientation::Square
        );
    }

    #[test]
    fn test_parse_box_rejects_short_arrays() {
        let short = Object::Array(vec![Object::Integer(0), Object::Integer(0)]);
        assert!(parse_box(&short).is_err());
    }
}
