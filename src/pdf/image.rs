//! Image payloads as the PDF writer can embed them.
//!
//! The writer ingests two encodings natively: JPEG (embedded byte-for-byte with
//! DCTDecode) and PNG (decoded, then re-compressed with Flate; alpha becomes a
//! soft mask). Anything else (WebP, GIF, BMP, ...) is rejected by [EmbeddedImage::open]
//! and has to go through [normalize_to_png] first.

use flate2::write::ZlibEncoder;
use flate2::Compression;
use image::codecs::jpeg::JpegDecoder;
use image::{DynamicImage, ExtendedColorType, ImageDecoder, ImageFormat};
use std::io::{Cursor, Write};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImageDecodeError {
    #[error("unrecognized image data")]
    Unrecognized,

    #[error("{0} images cannot be embedded directly")]
    Unsupported(String),

    #[error("image has zero width or height")]
    Empty,

    #[error("corrupt image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("failed to compress image data: {0}")]
    Compress(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSpace {
    Gray,
    Rgb,
}

/// Stream data for an image XObject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageStream {
    /// Original JPEG bytes.
    Dct(Vec<u8>),
    /// Zlib-compressed 8-bit samples, plus an optional zlib-compressed alpha channel.
    Flate { samples: Vec<u8>, alpha: Option<Vec<u8>> },
}

/// A decoded-enough image ready to be placed on a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedImage {
    pub width: u32,
    pub height: u32,
    pub color: ColorSpace,
    pub stream: ImageStream,
}

impl EmbeddedImage {
    /// Open bytes with the writer's native decoders (JPEG, PNG).
    pub fn open(bytes: &[u8]) -> Result<Self, ImageDecodeError> {
        let format = image::guess_format(bytes).map_err(|_| ImageDecodeError::Unrecognized)?;
        match format {
            ImageFormat::Jpeg => Self::open_jpeg(bytes),
            ImageFormat::Png => Self::open_png(bytes),
            other => Err(ImageDecodeError::Unsupported(
                other.extensions_str().first().copied().unwrap_or("unknown").to_uppercase(),
            )),
        }
    }

    fn open_jpeg(bytes: &[u8]) -> Result<Self, ImageDecodeError> {
        let decoder = JpegDecoder::new(Cursor::new(bytes))?;
        let (width, height) = decoder.dimensions();
        check_size(width, height)?;
        // The decoder converts CMYK/YCCK to RGB on output; the DCT stream itself stays
        // 4-component, so the color space must come from the encoded data.
        let color = jpeg_color_space(decoder.original_color_type())?;
        // Decode once so a truncated or corrupt body is rejected here rather than
        // producing a page a viewer cannot render.
        let mut scratch = vec![0u8; decoder.total_bytes() as usize];
        decoder.read_image(&mut scratch)?;
        Ok(Self {
            width,
            height,
            color,
            stream: ImageStream::Dct(bytes.to_vec()),
        })
    }

    fn open_png(bytes: &[u8]) -> Result<Self, ImageDecodeError> {
        let img = image::load_from_memory_with_format(bytes, ImageFormat::Png)?;
        Self::from_dynamic(&img)
    }

    fn from_dynamic(img: &DynamicImage) -> Result<Self, ImageDecodeError> {
        let (width, height) = (img.width(), img.height());
        check_size(width, height)?;
        let color_type = img.color();
        let (color, samples) = if color_type.has_color() {
            (ColorSpace::Rgb, img.to_rgb8().into_raw())
        } else {
            (ColorSpace::Gray, img.to_luma8().into_raw())
        };
        let alpha = if color_type.has_alpha() {
            let channel: Vec<u8> = img.to_rgba8().pixels().map(|p| p.0[3]).collect();
            if channel.iter().all(|&a| a == u8::MAX) {
                None
            } else {
                Some(deflate(&channel)?)
            }
        } else {
            None
        };
        Ok(Self {
            width,
            height,
            color,
            stream: ImageStream::Flate {
                samples: deflate(&samples)?,
                alpha,
            },
        })
    }

    pub fn has_alpha(&self) -> bool {
        matches!(self.stream, ImageStream::Flate { alpha: Some(_), .. })
    }
}

/// Re-encode any decodable image as PNG.
pub fn normalize_to_png(bytes: &[u8]) -> Result<Vec<u8>, ImageDecodeError> {
    let img = image::load_from_memory(bytes)?;
    let mut out = Vec::new();
    img.write_to(&mut Cursor::new(&mut out), ImageFormat::Png)?;
    Ok(out)
}

/// Color space a JPEG stream can be embedded under as-is.
fn jpeg_color_space(encoded: ExtendedColorType) -> Result<ColorSpace, ImageDecodeError> {
    match encoded {
        ExtendedColorType::L8 => Ok(ColorSpace::Gray),
        ExtendedColorType::Rgb8 => Ok(ColorSpace::Rgb),
        other => Err(ImageDecodeError::Unsupported(format!("JPEG {:?}", other))),
    }
}

fn check_size(width: u32, height: u32) -> Result<(), ImageDecodeError> {
    if width == 0 || height == 0 {
        return Err(ImageDecodeError::Empty);
    }
    Ok(())
}

fn deflate(data: &[u8]) -> Result<Vec<u8>, std::io::Error> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}
