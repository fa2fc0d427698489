use crate::delivery::{suggested_filename, Operation};
use crate::engine::{Engine, ImageInput};
use crate::error::Result;
use base64::Engine as _;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::time::Instant;

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum PdfCommand {
    Merge { files: Vec<Vec<u8>> },
    Split { file: Vec<u8>, range: String },
    ImagesToPdf { images: Vec<ImageInput> },
    Protect { file: Vec<u8>, password: String },
}

impl PdfCommand {
    pub fn operation(&self) -> Operation {
        match self {
            PdfCommand::Merge { .. } => Operation::Merge,
            PdfCommand::Split { .. } => Operation::Split,
            PdfCommand::ImagesToPdf { .. } => Operation::ImagesToPdf,
            PdfCommand::Protect { .. } => Operation::Protect,
        }
    }

    fn input_size(&self) -> usize {
        match self {
            PdfCommand::Merge { files } => files.iter().map(Vec::len).sum(),
            PdfCommand::Split { file, .. } | PdfCommand::Protect { file, .. } => file.len(),
            PdfCommand::ImagesToPdf { images } => images.iter().map(|i| i.bytes.len()).sum(),
        }
    }

    fn run(&self, engine: &Engine) -> Result<Vec<u8>> {
        match self {
            PdfCommand::Merge { files } => engine.merge(files),
            PdfCommand::Split { file, range } => engine.split(file, range),
            PdfCommand::ImagesToPdf { images } => engine.images_to_pdf(images),
            PdfCommand::Protect { file, password } => engine.protect(file, password),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessResult {
    pub success: bool,
    /// Base64-encoded PDF data
    pub data: Option<String>,
    pub suggested_filename: Option<String>,
    pub error: Option<String>,
    pub metrics: Option<ProcessMetrics>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessMetrics {
    pub input_size_bytes: usize,
    pub output_size_bytes: usize,
    /// Pages in the output; absent for encrypted output
    pub page_count: Option<u32>,
    pub processing_time_ms: u64,
}

/// Run a command and wrap the outcome for a JSON caller
pub fn execute(engine: &Engine, command: &PdfCommand) -> ProcessResult {
    let started = Instant::now();
    let operation = command.operation();

    match command.run(engine) {
        Ok(bytes) => {
            let page_count = match operation {
                Operation::Protect => None,
                _ => crate::get_page_count(&bytes).ok(),
            };
            let metrics = ProcessMetrics {
                input_size_bytes: command.input_size(),
                output_size_bytes: bytes.len(),
                page_count,
                processing_time_ms: started.elapsed().as_millis() as u64,
            };
            tracing::debug!(%operation, ?metrics, "Command finished");

            ProcessResult {
                success: true,
                data: Some(base64::engine::general_purpose::STANDARD.encode(&bytes)),
                suggested_filename: Some(suggested_filename(operation, Utc::now())),
                error: None,
                metrics: Some(metrics),
            }
        }
        Err(err) => {
            tracing::warn!(%operation, error = %err, "Command failed");
            ProcessResult {
                success: false,
                data: None,
                suggested_filename: None,
                error: Some(err.to_string()),
                metrics: None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::fixtures::create_test_pdf;

    #[test]
    fn test_command_deserializes_merge() {
        let json = r#"{"type":"Merge","files":[]}"#;
        let cmd: PdfCommand = serde_json::from_str(json).unwrap();
        assert!(matches!(cmd, PdfCommand::Merge { .. }));
    }

    #[test]
    fn test_command_deserializes_split() {
        let json = r#"{"type":"Split","file":[],"range":"1-3, 5"}"#;
        let cmd: PdfCommand = serde_json::from_str(json).unwrap();
        assert!(matches!(cmd, PdfCommand::Split { ref range, .. } if range == "1-3, 5"));
    }

    #[test]
    fn test_command_deserializes_images() {
        let json = r#"{"type":"ImagesToPdf","images":[{"bytes":[1,2],"media_type":"image/png"}]}"#;
        let cmd: PdfCommand = serde_json::from_str(json).unwrap();
        assert_eq!(cmd.operation(), Operation::ImagesToPdf);
    }

    #[test]
    fn test_execute_split_success() {
        let cmd = PdfCommand::Split {
            file: create_test_pdf(4, "C"),
            range: "2-3".into(),
        };
        let result = execute(&Engine::default(), &cmd);
        assert!(result.success);
        assert!(result.error.is_none());
        assert!(result
            .suggested_filename
            .as_deref()
            .is_some_and(|name| name.starts_with("split-") && name.ends_with(".pdf")));

        let data = base64::engine::general_purpose::STANDARD
            .decode(result.data.unwrap())
            .unwrap();
        assert_eq!(crate::get_page_count(&data).unwrap(), 2);
        assert_eq!(result.metrics.unwrap().page_count, Some(2));
    }

    #[test]
    fn test_execute_failure_carries_message() {
        let cmd = PdfCommand::Merge {
            files: vec![create_test_pdf(1, "C")],
        };
        let result = execute(&Engine::default(), &cmd);
        assert!(!result.success);
        assert!(result.data.is_none());
        assert!(result.error.unwrap().contains("at least two"));
    }

    #[test]
    fn test_execute_protect_omits_page_count() {
        let cmd = PdfCommand::Protect {
            file: create_test_pdf(1, "C"),
            password: "pw".into(),
        };
        let result = execute(&Engine::default(), &cmd);
        assert!(result.success);
        assert_eq!(result.metrics.unwrap().page_count, None);
    }
}
