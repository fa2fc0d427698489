//! Raster image decoding for page embedding
//!
//! JPEG data is passed through untouched (DCTDecode); only its header is read.
//! PNG data is decoded to 8-bit samples and re-compressed with Flate, with any
//! alpha channel split out into a soft mask.

use crate::error::{PdfToolsError, Result};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use image::codecs::jpeg::JpegDecoder;
use image::{ColorType, ImageDecoder};
use serde::{Deserialize, Serialize};
use std::io::{Cursor, Write};

/// Raster formats that can become PDF pages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageFormat {
    Jpeg,
    Png,
}

impl ImageFormat {
    /// Resolve a declared media type such as "image/png" or "IMAGE/JPEG; q=1"
    pub fn from_media_type(media_type: &str) -> Option<Self> {
        let essence = media_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        match essence.as_str() {
            "image/jpeg" | "image/jpg" | "image/pjpeg" => Some(ImageFormat::Jpeg),
            "image/png" => Some(ImageFormat::Png),
            _ => None,
        }
    }

    pub fn media_type(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
        }
    }

    /// Guess the format from magic bytes
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(ImageFormat::Jpeg)
        } else if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
            Some(ImageFormat::Png)
        } else {
            None
        }
    }
}

/// Image samples ready to be written as an image XObject
#[derive(Debug, Clone)]
pub struct RasterImage {
    pub width: u32,
    pub height: u32,
    pub color_space: &'static str,
    pub filter: &'static str,
    /// Encoded sample data, matching `filter`
    pub data: Vec<u8>,
    /// Flate-compressed 8-bit alpha samples, when the image is not opaque
    pub alpha: Option<Vec<u8>>,
    /// `/Decode` array, when samples must be inverted
    pub decode: Option<Vec<i64>>,
}

impl RasterImage {
    pub const BITS_PER_COMPONENT: i64 = 8;
}

/// Decode image bytes of the declared format.
///
/// Any decoding failure is reported as `UnsupportedFormat` so the caller can
/// skip the item.
pub fn decode(bytes: &[u8], format: ImageFormat) -> Result<RasterImage> {
    match format {
        ImageFormat::Jpeg => decode_jpeg(bytes),
        ImageFormat::Png => decode_png(bytes),
    }
}

fn decode_jpeg(bytes: &[u8]) -> Result<RasterImage> {
    let decoder = JpegDecoder::new(Cursor::new(bytes))
        .map_err(|e| PdfToolsError::UnsupportedFormat(format!("Invalid JPEG: {}", e)))?;
    let (width, height) = decoder.dimensions();

    // The decoder reports CMYK as RGB, so take the component count from the frame header
    let header = scan_jpeg_header(bytes);
    let components = match header {
        Some(header) => header.components,
        None => match decoder.color_type() {
            ColorType::L8 | ColorType::L16 => 1,
            _ => 3,
        },
    };

    let (color_space, decode) = match components {
        1 => ("DeviceGray", None),
        3 => ("DeviceRGB", None),
        // Adobe writes CMYK JPEGs with inverted samples
        4 if header.is_some_and(|h| h.adobe) => ("DeviceCMYK", Some(vec![1, 0, 1, 0, 1, 0, 1, 0])),
        4 => ("DeviceCMYK", None),
        other => {
            return Err(PdfToolsError::UnsupportedFormat(format!(
                "JPEG with {} colour components",
                other
            )))
        }
    };

    Ok(RasterImage {
        width,
        height,
        color_space,
        filter: "DCTDecode",
        data: bytes.to_vec(),
        alpha: None,
        decode,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct JpegHeader {
    components: u8,
    /// An Adobe APP14 segment is present
    adobe: bool,
}

/// Walk the marker segments up to the first scan
fn scan_jpeg_header(bytes: &[u8]) -> Option<JpegHeader> {
    if !bytes.starts_with(&[0xFF, 0xD8]) {
        return None;
    }

    let mut components = None;
    let mut adobe = false;
    let mut pos = 2;
    while pos + 1 < bytes.len() {
        if bytes[pos] != 0xFF {
            return None;
        }
        let marker = bytes[pos + 1];
        match marker {
            // Fill byte
            0xFF => {
                pos += 1;
                continue;
            }
            // Standalone markers
            0x01 | 0xD0..=0xD7 => {
                pos += 2;
                continue;
            }
            // Start of scan or end of image
            0xDA | 0xD9 => break,
            _ => {}
        }

        let length = u16::from_be_bytes([*bytes.get(pos + 2)?, *bytes.get(pos + 3)?]) as usize;
        let segment = bytes.get(pos + 4..pos + 2 + length)?;
        match marker {
            0xC0..=0xCF if !matches!(marker, 0xC4 | 0xC8 | 0xCC) => {
                components = Some(*segment.get(5)?);
            }
            0xEE if segment.starts_with(b"Adobe") => adobe = true,
            _ => {}
        }
        pos += 2 + length;
    }

    components.map(|components| JpegHeader { components, adobe })
}

fn decode_png(bytes: &[u8]) -> Result<RasterImage> {
    let mut decoder = png::Decoder::new(Cursor::new(bytes));
    // Expand palettes and low bit depths, strip 16-bit samples down to 8
    decoder.set_transformations(png::Transformations::normalize_to_color8());

    let mut reader = decoder
        .read_info()
        .map_err(|e| PdfToolsError::UnsupportedFormat(format!("Invalid PNG: {}", e)))?;
    let mut buffer = vec![0; reader.output_buffer_size()];
    let frame = reader
        .next_frame(&mut buffer)
        .map_err(|e| PdfToolsError::UnsupportedFormat(format!("Invalid PNG: {}", e)))?;
    let pixels = &buffer[..frame.buffer_size()];

    let (channels, has_alpha, color_space) = match frame.color_type {
        png::ColorType::Grayscale => (1, false, "DeviceGray"),
        png::ColorType::GrayscaleAlpha => (2, true, "DeviceGray"),
        png::ColorType::Rgb => (3, false, "DeviceRGB"),
        png::ColorType::Rgba => (4, true, "DeviceRGB"),
        png::ColorType::Indexed => {
            return Err(PdfToolsError::UnsupportedFormat(
                "Palette PNG was not expanded".into(),
            ))
        }
    };

    let (color, alpha) = if has_alpha {
        let color_channels = channels - 1;
        let pixel_count = (frame.width * frame.height) as usize;
        let mut color = Vec::with_capacity(pixel_count * color_channels);
        let mut alpha = Vec::with_capacity(pixel_count);
        for pixel in pixels.chunks_exact(channels) {
            color.extend_from_slice(&pixel[..color_channels]);
            alpha.push(pixel[color_channels]);
        }
        let opaque = alpha.iter().all(|&a| a == u8::MAX);
        (color, if opaque { None } else { Some(alpha) })
    } else {
        (pixels.to_vec(), None)
    };

    Ok(RasterImage {
        width: frame.width,
        height: frame.height,
        color_space,
        filter: "FlateDecode",
        data: flate_compress(&color)?,
        alpha: alpha.map(|a| flate_compress(&a)).transpose()?,
        decode: None,
    })
}

fn flate_compress(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .and_then(|_| encoder.finish())
        .map_err(|e| PdfToolsError::Internal(format!("Image compression failed: {}", e)))
}

#[cfg(test)]
pub(crate) mod fixtures {
    use image::codecs::jpeg::JpegEncoder;

    /// Encode a solid-colour PNG with the given png colour type
    pub fn png_bytes(width: u32, height: u32, color: png::ColorType, pixel: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut out, width, height);
            encoder.set_color(color);
            encoder.set_depth(png::BitDepth::Eight);
            let mut writer = encoder.write_header().unwrap();
            let data: Vec<u8> = pixel
                .iter()
                .copied()
                .cycle()
                .take(pixel.len() * (width * height) as usize)
                .collect();
            writer.write_image_data(&data).unwrap();
        }
        out
    }

    /// Encode a solid grey RGB JPEG
    pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
        let mut out = Vec::new();
        let data = vec![128u8; (width * height * 3) as usize];
        JpegEncoder::new(&mut out)
            .encode(&data, width, height, image::ColorType::Rgb8)
            .unwrap();
        out
    }

    /// Encode a CMYK JPEG, which carries an Adobe APP14 segment
    pub fn cmyk_jpeg_bytes(width: u16, height: u16) -> Vec<u8> {
        let mut out = Vec::new();
        let data = [0u8, 64, 128, 32].repeat(width as usize * height as usize);
        jpeg_encoder::Encoder::new(&mut out, 90)
            .encode(&data, width, height, jpeg_encoder::ColorType::Cmyk)
            .unwrap();
        out
    }
}
