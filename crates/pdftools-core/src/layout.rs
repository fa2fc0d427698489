//! Image-to-page fit computation

use crate::error::{PdfToolsError, Result};
use serde::{Deserialize, Serialize};

/// Where an image lands on its page, in PDF points from the lower-left corner
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ImagePlacement {
    pub scale: f64,
    pub offset_x: f64,
    pub offset_y: f64,
    pub rendered_width: f64,
    pub rendered_height: f64,
}

/// Page dimensions in points (1 point = 1/72 inch)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSize {
    pub width: f64,
    pub height: f64,
}

impl PageSize {
    /// US Letter, 8.5 x 11 inches
    pub const LETTER: PageSize = PageSize {
        width: 612.0,
        height: 792.0,
    };

    /// ISO A4, 210 x 297 mm
    pub const A4: PageSize = PageSize {
        width: 595.28,
        height: 841.89,
    };

    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

impl Default for PageSize {
    fn default() -> Self {
        Self::LETTER
    }
}

/// Fit an image inside a page without distortion or clipping, centered.
///
/// The scale is the largest one that keeps both dimensions on the page, so
/// one axis may keep a margin. Small images are scaled up to the page.
pub fn fit(
    image_width: f64,
    image_height: f64,
    page_width: f64,
    page_height: f64,
) -> Result<ImagePlacement> {
    for (name, value) in [
        ("image width", image_width),
        ("image height", image_height),
        ("page width", page_width),
        ("page height", page_height),
    ] {
        if !value.is_finite() || value <= 0.0 {
            return Err(PdfToolsError::Validation(format!(
                "{} must be a positive number, got {}",
                name, value
            )));
        }
    }

    let scale = (page_width / image_width).min(page_height / image_height);
    let rendered_width = image_width * scale;
    let rendered_height = image_height * scale;

    Ok(ImagePlacement {
        scale,
        // Rounding can leave a hair below zero on the tight axis
        offset_x: ((page_width - rendered_width) / 2.0).max(0.0),
        offset_y: ((page_height - rendered_height) / 2.0).max(0.0),
        rendered_width,
        rendered_height,
    })
}
