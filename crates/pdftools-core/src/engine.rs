//! Transformation entry points
//!
//! Every operation has the same shape: check preconditions, build a page
//! selection (or image pages), serialize, and for `protect` encrypt. Nothing
//! is kept between calls.

use crate::assemble::{assemble, select_all, select_pages};
use crate::config::EngineConfig;
use crate::document::{OutputDocument, SourceDocument};
use crate::encryption::{EncryptionProvider, StandardSecurityHandler};
use crate::error::{PdfToolsError, Result};
use crate::layout::fit;
use crate::protect::protect;
use crate::raster::ImageFormat;
use crate::ranges::parse_page_ranges;
use serde::{Deserialize, Serialize};

/// An image to convert, with the media type its uploader declared
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageInput {
    pub bytes: Vec<u8>,
    pub media_type: String,
}

impl ImageInput {
    pub fn new(bytes: impl Into<Vec<u8>>, media_type: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            media_type: media_type.into(),
        }
    }
}

/// The transformation engine
pub struct Engine {
    config: EngineConfig,
    provider: Box<dyn EncryptionProvider>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Engine using the standard security handler at the configured strength
    pub fn new(config: EngineConfig) -> Self {
        let provider = StandardSecurityHandler::new(config.encryption);
        Self::with_provider(config, Box::new(provider))
    }

    pub fn with_provider(config: EngineConfig, provider: Box<dyn EncryptionProvider>) -> Self {
        Self { config, provider }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Concatenate all pages of at least two documents, in input order
    pub fn merge(&self, documents: &[Vec<u8>]) -> Result<Vec<u8>> {
        if documents.len() < 2 {
            return Err(PdfToolsError::Validation(
                "Please provide at least two PDF files to merge".into(),
            ));
        }

        let mut loaded = Vec::with_capacity(documents.len());
        for (i, bytes) in documents.iter().enumerate() {
            let doc = SourceDocument::load(bytes).map_err(|e| match e {
                PdfToolsError::Parse(msg) => {
                    PdfToolsError::Parse(format!("Document {}: {}", i + 1, msg))
                }
                other => other,
            })?;
            loaded.push(doc);
        }

        let selection = select_all(&loaded);
        tracing::info!(
            documents = loaded.len(),
            pages = selection.len(),
            "Merging documents"
        );

        assemble(&selection)?.serialize()
    }

    /// Extract the pages named by a range expression such as "1-3, 5"
    pub fn split(&self, document: &[u8], range: &str) -> Result<Vec<u8>> {
        if document.is_empty() {
            return Err(PdfToolsError::Validation(
                "Please provide a PDF file to split".into(),
            ));
        }
        if range.trim().is_empty() {
            return Err(PdfToolsError::Validation(
                "Please specify a page range".into(),
            ));
        }

        let source = SourceDocument::load(document)?;
        let indices = parse_page_ranges(range, source.page_count());
        if indices.is_empty() {
            return Err(PdfToolsError::Validation(format!(
                "Nothing to extract: \"{}\" selects no pages of a {}-page document",
                range,
                source.page_count()
            )));
        }

        tracing::info!(
            range,
            selected = indices.len(),
            total = source.page_count(),
            "Splitting document"
        );

        let selection = select_pages(&source, &indices)?;
        assemble(&selection)?.serialize()
    }

    /// One page per supported image, each image fitted and centered.
    ///
    /// Items that are not JPEG or PNG, or that fail to decode, are skipped.
    pub fn images_to_pdf(&self, images: &[ImageInput]) -> Result<Vec<u8>> {
        if images.is_empty() {
            return Err(PdfToolsError::Validation(
                "Please provide at least one image".into(),
            ));
        }
        self.config.validate()?;

        let page_size = self.config.page_size;
        let mut output = OutputDocument::new();

        for (i, input) in images.iter().enumerate() {
            let Some(format) = ImageFormat::from_media_type(&input.media_type) else {
                tracing::warn!(item = i, media_type = %input.media_type, "Skipping unsupported image type");
                continue;
            };

            let image = match output.embed_image(&input.bytes, format) {
                Ok(image) => image,
                Err(PdfToolsError::UnsupportedFormat(reason)) => {
                    tracing::warn!(item = i, %reason, "Skipping undecodable image");
                    continue;
                }
                Err(other) => return Err(other),
            };

            let placement = fit(
                image.width as f64,
                image.height as f64,
                page_size.width,
                page_size.height,
            )?;
            let page = output.create_page(page_size);
            output.draw_image(page, &image, &placement)?;
            output.append_page(page);
        }

        if output.page_count() == 0 {
            return Err(PdfToolsError::Validation(
                "None of the files is a supported image (JPEG or PNG)".into(),
            ));
        }

        tracing::info!(
            images = images.len(),
            pages = output.page_count(),
            "Converted images"
        );
        output.serialize()
    }

    /// Encrypt a document so `password` is needed to open it
    pub fn protect(&self, document: &[u8], password: &str) -> Result<Vec<u8>> {
        if document.is_empty() {
            return Err(PdfToolsError::Validation(
                "Please provide a PDF file to protect".into(),
            ));
        }
        if password.is_empty() {
            return Err(PdfToolsError::Validation(
                "Please enter a password".into(),
            ));
        }

        // Round-trip through the document model to normalize the file
        let source = SourceDocument::load(document)?;
        let normalized = source.serialize()?;

        tracing::info!(pages = source.page_count(), "Protecting document");
        protect(&normalized, password, self.provider.as_ref())
    }
}
