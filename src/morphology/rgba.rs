//! Per-channel morphology over 8-bit RGBA images.
//!
//! Color images are processed by splitting into scalar red/green/blue planes,
//! running the operator on each, and recomposing. Alpha is passed through
//! untouched.

use image::{Rgba, RgbaImage};

use super::{run, MorphConfig, MorphOp, StructuringElement};
use crate::error::Error;
use crate::grid::Image;

/// Extracts one channel (0 = red, 1 = green, 2 = blue, 3 = alpha) as a scalar
/// image with values in 0..=255.
pub fn split_channel(rgba: &RgbaImage, channel: usize) -> Image {
    assert!(channel < 4);
    let (w, h) = rgba.dimensions();
    let data = rgba.pixels().map(|p| p.0[channel] as f32).collect();
    Image::from_data(w as usize, h as usize, data)
}

/// Applies a morphology operator to each color channel of an RGBA image.
pub fn apply(
    op: MorphOp,
    rgba: &RgbaImage,
    element: &StructuringElement,
    config: &MorphConfig,
) -> Result<RgbaImage, Error> {
    let (w, h) = rgba.dimensions();

    let mut planes = Vec::with_capacity(3);
    for channel in 0..3 {
        let plane = split_channel(rgba, channel);
        planes.push(run(op, &plane, element, config)?);
    }

    let mut out = RgbaImage::new(w, h);
    for (x, y, pixel) in out.enumerate_pixels_mut() {
        let (ix, iy) = (x as usize, y as usize);
        let quantize = |v: f32| v.round().clamp(0.0, 255.0) as u8;
        *pixel = Rgba([
            quantize(planes[0].get(ix, iy)),
            quantize(planes[1].get(ix, iy)),
            quantize(planes[2].get(ix, iy)),
            rgba.get_pixel(x, y).0[3],
        ]);
    }
    Ok(out)
}
