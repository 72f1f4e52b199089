//! Production codec built on the `image`, `png`, `webp` and `little_exif` crates.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (PNG, JPEG, BMP, TIFF) | `image::ImageReader` with content sniffing |
//! | PNG text chunks | `png::Decoder::read_info` (`tEXt`, `zTXt`, `iTXt`) |
//! | Encode → WebP | `webp::Encoder::encode_advanced` (libwebp) |
//! | EXIF ImageDescription | `little_exif::metadata::Metadata::write_to_vec` |

use super::backend::{Codec, CodecError, TextMetadata};
use super::params::WebpParams;
use image::{DynamicImage, ImageFormat, ImageReader};
use little_exif::exif_tag::ExifTag;
use little_exif::filetype::FileExtension;
use little_exif::metadata::Metadata;
use std::io::BufReader;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::Path;

/// Extensions accepted as conversion input, with the format they denote.
const INPUT_CANDIDATES: &[(&str, ImageFormat)] = &[
    ("png", ImageFormat::Png),
    ("jpg", ImageFormat::Jpeg),
    ("jpeg", ImageFormat::Jpeg),
    ("bmp", ImageFormat::Bmp),
    ("tiff", ImageFormat::Tiff),
];

/// Returns the image file extensions accepted as input (lowercase).
pub fn supported_input_extensions() -> impl Iterator<Item = &'static str> {
    INPUT_CANDIDATES.iter().map(|(ext, _)| *ext)
}

/// Case-insensitive check of a path's extension against the accepted list.
pub fn is_supported_input(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| supported_input_extensions().any(|s| s.eq_ignore_ascii_case(ext)))
}

/// Whether a path carries a `.png` extension (any case).
pub fn has_png_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("png"))
}

/// Codec backed by pure-Rust decoders and libwebp for encoding.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustCodec;

impl RustCodec {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustCodec {
    fn default() -> Self {
        Self::new()
    }
}

/// Read every text chunk of a PNG into a key/value map.
///
/// Only chunks placed before the image data are visible to `read_info`,
/// which is where encoders put generation metadata.
fn read_png_text(path: &Path) -> Result<TextMetadata, CodecError> {
    let file = std::fs::File::open(path)?;
    let reader = png::Decoder::new(BufReader::new(file))
        .read_info()
        .map_err(|e| CodecError::Metadata(format!("{}: {}", path.display(), e)))?;
    let info = reader.info();

    let mut text = TextMetadata::new();
    for chunk in &info.uncompressed_latin1_text {
        text.insert(chunk.keyword.clone(), chunk.text.clone());
    }
    for chunk in &info.compressed_latin1_text {
        match chunk.get_text() {
            Ok(value) => {
                text.insert(chunk.keyword.clone(), value);
            }
            Err(e) => tracing::warn!(keyword = %chunk.keyword, "unreadable zTXt chunk: {e}"),
        }
    }
    for chunk in &info.utf8_text {
        match chunk.get_text() {
            Ok(value) => {
                text.insert(chunk.keyword.clone(), value);
            }
            Err(e) => tracing::warn!(keyword = %chunk.keyword, "unreadable iTXt chunk: {e}"),
        }
    }
    Ok(text)
}

fn encode_pixels(encoder: webp::Encoder<'_>, params: &WebpParams) -> Result<Vec<u8>, CodecError> {
    let mut config = webp::WebPConfig::new()
        .map_err(|_| CodecError::Encode("libwebp rejected the default config".into()))?;
    config.lossless = i32::from(params.lossless);
    config.quality = params.quality.value() as f32;
    config.method = i32::from(params.method);

    let memory = encoder
        .encode_advanced(&config)
        .map_err(|e| CodecError::Encode(format!("WebP encode failed: {e:?}")))?;
    Ok(memory.to_vec())
}

/// Add an EXIF block holding only ImageDescription (0x010E) to an encoded
/// WebP. The container is promoted to the extended (VP8X) layout as needed.
fn embed_description(webp: &mut Vec<u8>, comment: &str) -> Result<(), CodecError> {
    let mut metadata = Metadata::new();
    metadata.set_tag(ExifTag::ImageDescription(comment.to_string()));

    // little_exif can panic on inputs it does not expect; keep that inside the codec
    match catch_unwind(AssertUnwindSafe(|| {
        metadata.write_to_vec(webp, FileExtension::WEBP)
    })) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(CodecError::Metadata(format!("EXIF embedding failed: {e}"))),
        Err(_) => Err(CodecError::Metadata(
            "EXIF embedding failed: writer panicked".into(),
        )),
    }
}

impl Codec for RustCodec {
    fn decode(&self, path: &Path) -> Result<DynamicImage, CodecError> {
        ImageReader::open(path)?
            .with_guessed_format()?
            .decode()
            .map_err(|e| CodecError::Decode(format!("Failed to decode {}: {}", path.display(), e)))
    }

    fn read_text(&self, path: &Path) -> Result<TextMetadata, CodecError> {
        let format = ImageReader::open(path)?.with_guessed_format()?.format();
        if format == Some(ImageFormat::Png) {
            read_png_text(path)
        } else {
            Ok(TextMetadata::new())
        }
    }

    fn encode_webp(
        &self,
        bitmap: &DynamicImage,
        params: &WebpParams,
    ) -> Result<Vec<u8>, CodecError> {
        let (width, height) = (bitmap.width(), bitmap.height());
        let has_alpha = bitmap.color().has_alpha();

        let mut encoded = if has_alpha {
            let rgba = bitmap.to_rgba8();
            encode_pixels(webp::Encoder::from_rgba(rgba.as_raw(), width, height), params)?
        } else {
            let rgb = bitmap.to_rgb8();
            encode_pixels(webp::Encoder::from_rgb(rgb.as_raw(), width, height), params)?
        };

        if let Some(comment) = &params.exif_comment {
            embed_description(&mut encoded, comment)?;
        }
        Ok(encoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::params::Quality;
    use image::{ImageEncoder, RgbImage, RgbaImage};

    /// Write an RGB PNG, optionally with `tEXt` chunks.
    fn create_test_png(path: &Path, width: u32, height: u32, text: &[(&str, &str)]) {
        let file = std::fs::File::create(path).unwrap();
        let mut encoder = png::Encoder::new(std::io::BufWriter::new(file), width, height);
        encoder.set_color(png::ColorType::Rgb);
        encoder.set_depth(png::BitDepth::Eight);
        for (key, value) in text {
            encoder
                .add_text_chunk(key.to_string(), value.to_string())
                .unwrap();
        }
        let mut writer = encoder.write_header().unwrap();
        let pixels: Vec<u8> = (0..width * height)
            .flat_map(|i| [(i % 256) as u8, 64, 200])
            .collect();
        writer.write_image_data(&pixels).unwrap();
    }

    fn create_test_jpeg(path: &Path, width: u32, height: u32) {
        let img = RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        });
        let file = std::fs::File::create(path).unwrap();
        image::codecs::jpeg::JpegEncoder::new(std::io::BufWriter::new(file))
            .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
            .unwrap();
    }

    #[test]
    fn accepted_extensions_are_case_insensitive() {
        for name in ["a.png", "a.PNG", "a.jpg", "a.JPEG", "a.bmp", "a.Tiff"] {
            assert!(is_supported_input(Path::new(name)), "{name}");
        }
        for name in ["a.gif", "a.webp", "a.tif", "noext"] {
            assert!(!is_supported_input(Path::new(name)), "{name}");
        }
    }

    #[test]
    fn png_extension_check() {
        assert!(has_png_extension(Path::new("x/a.PnG")));
        assert!(!has_png_extension(Path::new("x/a.jpg")));
    }

    #[test]
    fn decode_png_and_read_text_chunks() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("gen.png");
        create_test_png(&path, 16, 8, &[("workflow", "{\"nodes\":[]}"), ("prompt", "{}")]);

        let codec = RustCodec::new();
        let bitmap = codec.decode(&path).unwrap();
        assert_eq!((bitmap.width(), bitmap.height()), (16, 8));

        let text = codec.read_text(&path).unwrap();
        assert_eq!(text.get("workflow").unwrap(), "{\"nodes\":[]}");
        assert_eq!(text.get("prompt").unwrap(), "{}");
    }

    #[test]
    fn png_without_text_chunks_reads_empty() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("plain.png");
        create_test_png(&path, 5, 5, &[]);

        assert_eq!(RustCodec::new().decode(&path).unwrap().width(), 5);
        assert!(RustCodec::new().read_text(&path).unwrap().is_empty());
    }

    #[test]
    fn decode_jpeg_has_no_metadata() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("photo.jpg");
        create_test_jpeg(&path, 20, 10);

        let codec = RustCodec::new();
        assert_eq!(codec.decode(&path).unwrap().width(), 20);
        assert!(codec.read_text(&path).unwrap().is_empty());
    }

    #[test]
    fn decode_corrupt_file_errors() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("broken.png");
        std::fs::write(&path, b"definitely not an image").unwrap();

        assert!(RustCodec::new().decode(&path).is_err());
    }

    #[test]
    fn decode_missing_file_is_io_error() {
        let result = RustCodec::new().decode(Path::new("/nonexistent/image.png"));
        assert!(matches!(result, Err(CodecError::Io(_))));
    }

    #[test]
    fn encode_lossy_roundtrip_dimensions() {
        let bitmap = DynamicImage::ImageRgb8(RgbImage::from_pixel(33, 17, image::Rgb([1, 2, 3])));
        let bytes = RustCodec::new()
            .encode_webp(&bitmap, &WebpParams::lossy(Quality::new(80).unwrap()))
            .unwrap();

        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WEBP");
        let decoded = image::load_from_memory_with_format(&bytes, ImageFormat::WebP).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (33, 17));
    }

    #[test]
    fn encode_keeps_alpha() {
        let bitmap =
            DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 8, image::Rgba([9, 9, 9, 100])));
        let bytes = RustCodec::new()
            .encode_webp(&bitmap, &WebpParams::lossy(Quality::default()))
            .unwrap();

        let decoded = image::load_from_memory_with_format(&bytes, ImageFormat::WebP).unwrap();
        assert!(decoded.color().has_alpha());
    }

    #[test]
    fn encode_with_comment_embeds_exif_description() {
        let bitmap = DynamicImage::ImageRgb8(RgbImage::new(12, 12));
        let params = WebpParams {
            exif_comment: Some("Workflow:{\"nodes\":[]}".into()),
            ..WebpParams::lossy(Quality::new(90).unwrap())
        };
        let bytes = RustCodec::new().encode_webp(&bitmap, &params).unwrap();

        let exif = exif::Reader::new()
            .read_from_container(&mut std::io::Cursor::new(&bytes))
            .expect("EXIF present");
        let field = exif
            .get_field(exif::Tag::ImageDescription, exif::In::PRIMARY)
            .unwrap();
        match &field.value {
            exif::Value::Ascii(parts) => {
                assert_eq!(parts[0], b"Workflow:{\"nodes\":[]}".to_vec())
            }
            other => panic!("unexpected value {other:?}"),
        }

        // Still a decodable image
        let decoded = image::load_from_memory_with_format(&bytes, ImageFormat::WebP).unwrap();
        assert_eq!(decoded.width(), 12);
    }
}
