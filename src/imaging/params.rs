//! Parameter types for WebP encoding.
//!
//! These structs describe *what* to encode, not *how*. They are the interface
//! between the conversion worker (which decides the encoding mode) and the
//! [`Codec`](super::backend::Codec) (which does the pixel work), so the
//! worker can be tested against a mock codec.
//!
//! ## Types
//!
//! - [`Quality`]: Lossy encoding quality (1–100, default 87). Validated on construction.
//! - [`WebpParams`]: Full specification for one encode: quality, lossless flag,
//!   encoder method and an optional EXIF image description.

/// Quality setting for WebP encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(u32);

impl Quality {
    pub const MIN: u32 = 1;
    pub const MAX: u32 = 100;

    /// Returns `None` when `value` is outside `1..=100`.
    pub fn new(value: u32) -> Option<Self> {
        (Self::MIN..=Self::MAX)
            .contains(&value)
            .then_some(Self(value))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(87)
    }
}

/// Encoder effort for plain conversions (libwebp's default).
pub const METHOD_DEFAULT: u8 = 4;
/// Encoder effort for workflow-preserving conversions: slowest, smallest output.
pub const METHOD_BEST: u8 = 6;

/// Parameters for a single WebP encode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebpParams {
    pub quality: Quality,
    pub lossless: bool,
    /// libwebp effort, 0 (fast) to 6 (slow).
    pub method: u8,
    /// Stored as EXIF ImageDescription (tag 0x010E) when present.
    pub exif_comment: Option<String>,
}

impl WebpParams {
    /// Lossy encode at the given quality, no metadata.
    pub fn lossy(quality: Quality) -> Self {
        Self {
            quality,
            lossless: false,
            method: METHOD_DEFAULT,
            exif_comment: None,
        }
    }
}
