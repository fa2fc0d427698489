//! pdftools command-line tool
//!
//! Reads files, runs one engine operation and writes the result.

mod config;
mod sink;

use anyhow::{bail, Context};
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use pdftools_core::raster::ImageFormat;
use pdftools_core::{
    suggested_filename, DeliverySink, Engine, ImageInput, Operation, PageSize, PdfCommand,
};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::CliConfig;
use crate::sink::FileSink;

#[derive(Parser, Debug)]
#[command(name = "pdftools")]
#[command(version, about = "Merge, split, convert and protect PDF files")]
struct Args {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Output file (defaults to a timestamped name in the output directory)
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Combine two or more PDFs in the given order
    Merge {
        #[arg(required = true, num_args = 2..)]
        files: Vec<PathBuf>,
    },
    /// Extract pages, e.g. `split report.pdf "1-3, 5"`
    Split { file: PathBuf, range: String },
    /// One page per JPEG or PNG image
    Images {
        #[arg(required = true)]
        images: Vec<PathBuf>,
        /// Page size for the generated pages
        #[arg(long, value_enum)]
        page_size: Option<PageSizeArg>,
    },
    /// Encrypt a PDF with a password
    Protect {
        file: PathBuf,
        #[arg(long, env = "PDFTOOLS_PASSWORD")]
        password: String,
    },
    /// Print page count, metadata and page sizes as JSON
    Info { file: PathBuf },
    /// Run a JSON command read from a file or stdin and print the result
    Exec { file: Option<PathBuf> },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PageSizeArg {
    Letter,
    A4,
}

impl From<PageSizeArg> for PageSize {
    fn from(arg: PageSizeArg) -> Self {
        match arg {
            PageSizeArg::Letter => PageSize::LETTER,
            PageSizeArg::A4 => PageSize::A4,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // stdout carries documents and JSON, so logs go to stderr
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut config = match &args.config {
        Some(path) => CliConfig::from_file(path)?,
        None => CliConfig::default(),
    };
    if let Command::Images {
        page_size: Some(size),
        ..
    } = &args.command
    {
        config.engine.page_size = (*size).into();
    }

    let engine = Engine::new(config.engine);
    tracing::debug!(config = ?engine.config(), "Engine ready");
    let sink = match (&args.output, &config.output_dir) {
        (Some(path), _) => FileSink::File(path.clone()),
        (None, Some(dir)) => FileSink::Directory(dir.clone()),
        (None, None) => FileSink::Directory(PathBuf::from(".")),
    };

    run(&engine, args.command, &sink)
}

fn run(engine: &Engine, command: Command, sink: &dyn DeliverySink) -> anyhow::Result<()> {
    let (operation, bytes) = match command {
        Command::Merge { files } => {
            let documents = read_pdfs(&files)?;
            if documents.len() < 2 {
                bail!("Please provide at least two PDF files to merge");
            }
            (Operation::Merge, engine.merge(&documents).context("Merge failed")?)
        }
        Command::Split { file, range } => {
            let document = read_file(&file)?;
            let bytes = engine
                .split(&document, &range)
                .with_context(|| format!("Could not split {}", file.display()))?;
            (Operation::Split, bytes)
        }
        Command::Images { images, .. } => {
            let inputs = images
                .iter()
                .map(|path| {
                    let bytes = read_file(path)?;
                    let media_type = match media_type_for(path).as_str() {
                        "application/octet-stream" => ImageFormat::sniff(&bytes)
                            .map(|format| format.media_type().to_string())
                            .unwrap_or_else(|| "application/octet-stream".to_string()),
                        known => known.to_string(),
                    };
                    Ok(ImageInput::new(bytes, media_type))
                })
                .collect::<anyhow::Result<Vec<_>>>()?;
            let bytes = engine
                .images_to_pdf(&inputs)
                .context("Could not convert images")?;
            (Operation::ImagesToPdf, bytes)
        }
        Command::Protect { file, password } => {
            let document = read_file(&file)?;
            let bytes = engine
                .protect(&document, &password)
                .with_context(|| format!("Could not protect {}", file.display()))?;
            (Operation::Protect, bytes)
        }
        Command::Info { file } => {
            let info = pdftools_core::inspect(&read_file(&file)?)
                .with_context(|| format!("Could not read {}", file.display()))?;
            println!("{}", serde_json::to_string_pretty(&info)?);
            return Ok(());
        }
        Command::Exec { file } => {
            let json = match file {
                Some(path) => fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read {}", path.display()))?,
                None => {
                    let mut buf = String::new();
                    std::io::stdin().read_to_string(&mut buf)?;
                    buf
                }
            };
            let command: PdfCommand =
                serde_json::from_str(&json).context("Invalid command JSON")?;
            let result = pdftools_core::execute(engine, &command);
            println!("{}", serde_json::to_string(&result)?);
            return Ok(());
        }
    };

    let filename = suggested_filename(operation, Utc::now());
    sink.deliver(&bytes, &filename)?;
    Ok(())
}

fn read_file(path: &Path) -> anyhow::Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("Failed to read {}", path.display()))
}

/// Read the inputs that look like PDFs, skipping anything else
fn read_pdfs(paths: &[PathBuf]) -> anyhow::Result<Vec<Vec<u8>>> {
    let mut documents = Vec::with_capacity(paths.len());
    for path in paths {
        if media_type_for(path) != "application/pdf" {
            tracing::warn!(path = %path.display(), "Skipping non-PDF input");
            continue;
        }
        documents.push(read_file(path)?);
    }
    Ok(documents)
}

/// Media type from the file extension, as a browser would report it
fn media_type_for(path: &Path) -> String {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match extension.as_str() {
        "pdf" => "application/pdf",
        "jpg" | "jpeg" | "jpe" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
    .to_string()
}
