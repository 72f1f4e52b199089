//! Codec trait and shared types.
//!
//! The [`Codec`] trait defines the operations the conversion worker needs:
//! decode a source file to pixels, read its text metadata, and encode a
//! bitmap to WebP. Text metadata is a separate call so plain conversions
//! never touch it.
//!
//! The production implementation is
//! [`RustCodec`](super::rust_backend::RustCodec). Tests swap in a recording
//! mock so batch logic runs without real image files.

use super::params::WebpParams;
use image::DynamicImage;
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Decode failed: {0}")]
    Decode(String),
    #[error("Encode failed: {0}")]
    Encode(String),
    #[error("Metadata error: {0}")]
    Metadata(String),
}

/// Textual key/value pairs embedded in a source file (PNG `tEXt`, `zTXt`
/// and `iTXt` chunks).
pub type TextMetadata = BTreeMap<String, String>;

/// Trait for codec implementations.
///
/// `Sync` so one instance can be shared by every worker in the pool.
pub trait Codec: Sync {
    /// Decode an image file into pixels.
    fn decode(&self, path: &Path) -> Result<DynamicImage, CodecError>;

    /// Read the text metadata of an image file. Formats without text chunks
    /// yield an empty map.
    fn read_text(&self, path: &Path) -> Result<TextMetadata, CodecError>;

    /// Encode a bitmap to a complete WebP file in memory.
    fn encode_webp(&self, bitmap: &DynamicImage, params: &WebpParams)
    -> Result<Vec<u8>, CodecError>;
}
