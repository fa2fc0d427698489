//! Page selection and document assembly
//!
//! A selection is an ordered list of (document, page index) pairs. Assembly
//! copies those pages verbatim, in order, into a fresh output document.

use crate::document::{OutputDocument, SourceDocument};
use crate::error::{PdfToolsError, Result};

/// One page of one source document
#[derive(Debug, Clone, Copy)]
pub struct PageReference<'a> {
    document: &'a SourceDocument,
    index: usize,
}

impl<'a> PageReference<'a> {
    /// Reference a zero-based page, checking it exists
    pub fn new(document: &'a SourceDocument, index: usize) -> Result<Self> {
        if index >= document.page_count() {
            return Err(PdfToolsError::Validation(format!(
                "Page index {} is out of range (document has {} pages)",
                index,
                document.page_count()
            )));
        }
        Ok(Self { document, index })
    }

    pub fn document(&self) -> &'a SourceDocument {
        self.document
    }

    pub fn index(&self) -> usize {
        self.index
    }
}

/// Ordered page references; duplicates allowed
pub type PageSelection<'a> = Vec<PageReference<'a>>;

/// Every page of every document, documents in the given order
pub fn select_all<'a>(documents: &'a [SourceDocument]) -> PageSelection<'a> {
    documents
        .iter()
        .flat_map(|document| {
            (0..document.page_count()).map(move |index| PageReference { document, index })
        })
        .collect()
}

/// The given zero-based pages of one document, in the given order
pub fn select_pages<'a>(document: &'a SourceDocument, indices: &[usize]) -> Result<PageSelection<'a>> {
    indices
        .iter()
        .map(|&index| PageReference::new(document, index))
        .collect()
}

/// Build a new document holding exactly the selected pages, in order
pub fn assemble(selection: &[PageReference<'_>]) -> Result<OutputDocument> {
    let mut output = OutputDocument::new();

    // Copy runs of consecutive pages from the same document in one batch so
    // shared resources such as fonts are imported once per run
    for run in selection.chunk_by(|a, b| std::ptr::eq(a.document, b.document)) {
        let indices: Vec<usize> = run.iter().map(|r| r.index).collect();
        for page in output.copy_pages(run[0].document, &indices)? {
            output.append_page(page);
        }
    }

    tracing::debug!(pages = output.page_count(), "Assembled document");
    Ok(output)
}
