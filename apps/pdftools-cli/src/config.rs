//! TOML configuration for the command-line tool
//!
//! ```toml
//! output_dir = "out"
//!
//! [engine]
//! encryption = "rc4_128"
//!
//! [engine.page_size]
//! width = 595.28
//! height = 841.89
//! ```

use anyhow::Context;
use pdftools_core::EngineConfig;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Directory that receives finished documents
    pub output_dir: Option<PathBuf>,
    pub engine: EngineConfig,
}

impl CliConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))
    }

    pub fn from_toml(s: &str) -> anyhow::Result<Self> {
        let config: CliConfig = toml::from_str(s).context("Failed to parse TOML")?;
        config.engine.validate()?;
        Ok(config)
    }
}
