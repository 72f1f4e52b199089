//! Converter configuration.
//!
//! Defaults for the command line come from an optional `webp-batch.toml`.
//! Every flag given on the command line overrides the file value.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! quality = 87              # WebP quality (1-100)
//! keep_workflow = false     # Copy the PNG `workflow` chunk into EXIF (PNG input only)
//! same_folder = false       # Write next to each source file instead of output_dir
//! # output_dir = "webp"     # Shared output directory (required unless same_folder)
//! # threads = 4             # Parallel workers (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "webp-batch.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Converter defaults loaded from TOML.
///
/// All fields have sensible defaults. Config files need only specify the
/// values they want to override.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConverterConfig {
    /// WebP quality, 1-100.
    pub quality: u32,
    /// Maximum number of parallel workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub threads: Option<usize>,
    /// Preserve the PNG workflow chunk as an EXIF comment.
    pub keep_workflow: bool,
    /// Write each output next to its source file.
    pub same_folder: bool,
    /// Shared output directory.
    pub output_dir: Option<PathBuf>,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            quality: 87,
            threads: None,
            keep_workflow: false,
            same_folder: false,
            output_dir: None,
        }
    }
}

impl ConverterConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.quality) {
            return Err(ConfigError::Validation("quality must be 1-100".into()));
        }
        if self.threads == Some(0) {
            return Err(ConfigError::Validation("threads must be at least 1".into()));
        }
        Ok(())
    }
}

/// Resolve the effective thread count.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(threads: Option<usize>) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    threads.map(|n| n.min(cores)).unwrap_or(cores)
}

/// Parse and validate a config from TOML text.
pub fn parse_config(content: &str) -> Result<ConverterConfig, ConfigError> {
    let config: ConverterConfig = toml::from_str(content)?;
    config.validate()?;
    Ok(config)
}

/// Load a config file.
///
/// A missing file yields the stock defaults only when `required` is false.
pub fn load_config(path: &Path, required: bool) -> Result<ConverterConfig, ConfigError> {
    if !required && !path.exists() {
        return Ok(ConverterConfig::default());
    }
    let content = fs::read_to_string(path)?;
    let config = parse_config(&content)?;
    tracing::debug!(path = %path.display(), "loaded config");
    Ok(config)
}

/// A documented stock config file.
pub fn stock_config_toml() -> &'static str {
    r#"# webp-batch configuration
# All options are optional - defaults shown below.
# Command-line flags override these values.

# WebP quality (1-100)
quality = 87

# Copy the PNG `workflow` text chunk into the output's EXIF ImageDescription,
# prefixed with "Workflow:". Only PNG inputs are accepted in this mode.
keep_workflow = false

# Write each converted file next to its source instead of into output_dir
same_folder = false

# Shared output directory (required unless same_folder = true)
# output_dir = "webp"

# Parallel workers; omit to use every CPU core
# threads = 4
"#
}
