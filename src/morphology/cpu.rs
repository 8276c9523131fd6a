//! CPU morphology kernels.
//!
//! Each output row is independent, so rows are processed in parallel with
//! rayon. The offset list is walked in the same order as the GPU kernel and
//! the accumulator uses the same identity values, keeping both backends
//! bit-identical.

use rayon::prelude::*;

use super::{EdgeMode, MorphOp, StructuringElement};
use crate::grid::Image;

/// Applies an operator by chaining its erode/dilate passes.
pub(crate) fn apply(
    op: MorphOp,
    image: &Image,
    element: &StructuringElement,
    edge: EdgeMode,
) -> Image {
    let mut current = image.clone();
    for pass in op.passes() {
        current = match pass {
            MorphOp::Erode => min_max(&current, element.offsets(), edge, true),
            MorphOp::Dilate => min_max(&current, &element.reflected_offsets(), edge, false),
            _ => unreachable!("passes() only yields primitives"),
        };
    }
    current
}

fn min_max(image: &Image, offsets: &[(i32, i32)], edge: EdgeMode, is_erode: bool) -> Image {
    let width = image.width();
    let height = image.height();
    if image.is_empty() {
        return image.clone();
    }

    let identity = if is_erode { f32::MAX } else { f32::MIN };
    let src = image.as_slice();
    let mut out = vec![0.0f32; width * height];

    out.par_chunks_mut(width).enumerate().for_each(|(y, row)| {
        for (x, cell) in row.iter_mut().enumerate() {
            let mut acc = identity;
            for &(dx, dy) in offsets {
                let sx = x as i32 + dx;
                let sy = y as i32 + dy;
                let inside =
                    sx >= 0 && sx < width as i32 && sy >= 0 && sy < height as i32;
                let v = if inside {
                    src[sy as usize * width + sx as usize]
                } else {
                    match edge {
                        EdgeMode::Clamp => {
                            let cx = sx.clamp(0, width as i32 - 1) as usize;
                            let cy = sy.clamp(0, height as i32 - 1) as usize;
                            src[cy * width + cx]
                        }
                        EdgeMode::Constant(border) => border,
                        EdgeMode::Identity => continue,
                    }
                };
                acc = if is_erode { acc.min(v) } else { acc.max(v) };
            }
            *cell = acc;
        }
    });

    Image::from_data(width, height, out)
}
