//! Image codec adapter.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image::ImageReader` (PNG, JPEG, BMP, TIFF) |
//! | **Text metadata** | `png` text chunks |
//! | **Encode → WebP** | libwebp through the `webp` crate |
//! | **EXIF comment** | `little_exif` (ImageDescription into the WebP `EXIF` chunk) |
//!
//! The module is split into:
//! - **Parameters**: [`Quality`] and [`WebpParams`]
//! - **Backend**: [`Codec`] trait + [`RustCodec`]

pub mod backend;
mod params;
pub mod rust_backend;

pub use backend::{Codec, CodecError, TextMetadata};
pub use params::{METHOD_BEST, METHOD_DEFAULT, Quality, WebpParams};
pub use rust_backend::{RustCodec, has_png_extension, is_supported_input};
