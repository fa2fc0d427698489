//! Handing finished bytes to the caller's storage

use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which transformation produced a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Merge,
    Split,
    ImagesToPdf,
    Protect,
}

impl Operation {
    fn filename_prefix(self) -> &'static str {
        match self {
            Operation::Merge => "merged-pdfs",
            Operation::Split => "split",
            Operation::ImagesToPdf => "images",
            Operation::Protect => "protected",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Merge => "merge",
            Operation::Split => "split",
            Operation::ImagesToPdf => "images-to-pdf",
            Operation::Protect => "protect",
        };
        f.write_str(name)
    }
}

/// Download name for an operation's output, e.g. `split-1700000000000.pdf`
pub fn suggested_filename(operation: Operation, at: DateTime<Utc>) -> String {
    format!("{}-{}.pdf", operation.filename_prefix(), at.timestamp_millis())
}

/// Destination for finished documents (a download, a file, an upload...)
pub trait DeliverySink {
    fn deliver(&self, bytes: &[u8], suggested_filename: &str) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::cell::RefCell;

    #[derive(Default)]
    struct MemorySink {
        delivered: RefCell<Vec<(String, usize)>>,
    }

    impl DeliverySink for MemorySink {
        fn deliver(&self, bytes: &[u8], suggested_filename: &str) -> Result<()> {
            self.delivered
                .borrow_mut()
                .push((suggested_filename.to_string(), bytes.len()));
            Ok(())
        }
    }

    #[test]
    fn test_suggested_filenames() {
        let at = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        assert_eq!(
            suggested_filename(Operation::Merge, at),
            "merged-pdfs-1700000000123.pdf"
        );
        assert_eq!(suggested_filename(Operation::Split, at), "split-1700000000123.pdf");
        assert_eq!(
            suggested_filename(Operation::ImagesToPdf, at),
            "images-1700000000123.pdf"
        );
        assert_eq!(
            suggested_filename(Operation::Protect, at),
            "protected-1700000000123.pdf"
        );
    }

    #[test]
    fn test_sink_receives_bytes() {
        let sink = MemorySink::default();
        sink.deliver(b"%PDF-1.7", "split-1.pdf").unwrap();
        assert_eq!(
            sink.delivered.borrow().as_slice(),
            &[("split-1.pdf".to_string(), 8)]
        );
    }

    #[test]
    fn test_operation_display() {
        assert_eq!(Operation::ImagesToPdf.to_string(), "images-to-pdf");
    }
}
