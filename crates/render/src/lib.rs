//! Painting redaction regions onto the source image.
//!
//! The image is decoded, flattened to opaque RGB, covered with black rectangles and
//! always written back as PNG, whatever the input format was.

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;
use redact_model::RedactionRegion;
use std::io::Cursor;
use thiserror::Error;

/// Content type of every rendered image.
pub const OUTPUT_CONTENT_TYPE: &str = "image/png";

/// Cover colour.
pub const COVER_COLOR: Rgb<u8> = Rgb([0, 0, 0]);

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("unsupported image format: {0}")]
    UnsupportedImageFormat(#[source] image::ImageError),

    #[error("failed to encode redacted image: {0}")]
    Encode(#[source] image::ImageError),
}

/// Encoded output image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedImage {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
}

/// Decode `source`, cover every region and re-encode.
///
/// With no regions the result is the source re-encoded. Running the same input
/// twice yields identical bytes.
pub fn render(source: &[u8], regions: &[RedactionRegion]) -> Result<RenderedImage, RenderError> {
    let format = image::guess_format(source).ok();
    let decoded = image::load_from_memory(source).map_err(RenderError::UnsupportedImageFormat)?;
    log::info!(
        "[Render] source {:?} {}x{} ({:?}), {} regions",
        format,
        decoded.width(),
        decoded.height(),
        decoded.color(),
        regions.len()
    );

    let mut canvas = flatten(decoded);
    cover_regions(&mut canvas, regions);

    let mut bytes = Vec::new();
    canvas
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(RenderError::Encode)?;

    log::info!("[Render] encoded {} bytes", bytes.len());
    Ok(RenderedImage {
        bytes,
        content_type: OUTPUT_CONTENT_TYPE,
    })
}

/// Opaque 8-bit RGB regardless of the source colour type (alpha is dropped, not blended).
pub fn flatten(img: DynamicImage) -> RgbImage {
    match img {
        DynamicImage::ImageRgb8(rgb) => rgb,
        other => other.to_rgb8(),
    }
}

/// Paint each region with [`COVER_COLOR`].
pub fn cover_regions(img: &mut RgbImage, regions: &[RedactionRegion]) {
    let (width, height) = img.dimensions();
    for region in regions {
        match region_rect(region, width, height) {
            Some(rect) => {
                draw_filled_rect_mut(img, rect, COVER_COLOR);
                log::debug!(
                    "[Render] cover ({}, {}, {}, {})",
                    rect.left(),
                    rect.top(),
                    rect.width(),
                    rect.height()
                );
            }
            None => log::debug!("[Render] region outside image, skipped: {:?}", region.bounds),
        }
    }
}

/// Pixel rectangle touched by a region, clipped to the image.
///
/// Both corners are inclusive: `x ..= x + width` and `y ..= y + height`, truncated to
/// whole pixels. A zero-sized region covers one pixel.
fn region_rect(region: &RedactionRegion, img_w: u32, img_h: u32) -> Option<Rect> {
    let (left, right) = pixel_span(region.bounds.x(), region.bounds.right(), img_w)?;
    let (top, bottom) = pixel_span(region.bounds.y(), region.bounds.bottom(), img_h)?;
    Some(Rect::at(left as i32, top as i32).of_size(right - left, bottom - top))
}

fn pixel_span(start: f64, end: f64, limit: u32) -> Option<(u32, u32)> {
    if !start.is_finite() || !end.is_finite() || limit == 0 {
        return None;
    }
    let limit_f = f64::from(limit);
    let first = start.floor();
    // exclusive end
    let last = end.floor().max(first) + 1.0;
    if last <= 0.0 || first >= limit_f {
        return None;
    }
    let first = first.max(0.0) as u32;
    let last = last.min(limit_f) as u32;
    Some((first, last))
}
