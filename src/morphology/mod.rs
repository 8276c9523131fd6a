//! Mathematical morphology engine: erosion, dilation, opening, closing.
//!
//! Erosion takes the per-cell minimum over the structuring element's
//! footprint; dilation the maximum over the reflected footprint. Opening is
//! dilate(erode(x)) and closing erode(dilate(x)). Every output cell depends
//! only on the input and the element, so one operator application is a single
//! data-parallel pass on either backend.

mod cpu;
mod element;
pub mod rgba;

pub use element::StructuringElement;

use serde::{Deserialize, Serialize};

use crate::backend::Backend;
use crate::error::Error;
use crate::gpu::{DeviceError, GpuContext, MorphologyGpu};
use crate::grid::Image;

/// Primitive and composite morphology operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MorphOp {
    Erode,
    Dilate,
    Open,
    Close,
}

impl MorphOp {
    /// The primitive passes making up this operator, in application order.
    pub(crate) fn passes(self) -> &'static [MorphOp] {
        match self {
            MorphOp::Erode => &[MorphOp::Erode],
            MorphOp::Dilate => &[MorphOp::Dilate],
            MorphOp::Open => &[MorphOp::Erode, MorphOp::Dilate],
            MorphOp::Close => &[MorphOp::Dilate, MorphOp::Erode],
        }
    }
}

/// Policy for reads falling outside the image bounds.
///
/// The choice measurably changes output near borders, so it is explicit in
/// every call rather than baked in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum EdgeMode {
    /// Clamp coordinates to the image rectangle (replicate border pixels).
    Clamp,
    /// Read a fixed value outside the image.
    Constant(f32),
    /// Read the operator's identity outside the image (f32::MAX for erosion,
    /// f32::MIN for dilation), so out-of-bounds cells never win. Under this
    /// mode opening and closing are exactly idempotent.
    Identity,
}

impl Default for EdgeMode {
    fn default() -> Self {
        Self::Clamp
    }
}

/// Configuration shared by all morphology entry points.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MorphConfig {
    /// Border read policy.
    pub edge: EdgeMode,
    /// Which backend executes the kernels.
    pub backend: Backend,
}

/// Erodes `image` by `element`.
pub fn erode(
    image: &Image,
    element: &StructuringElement,
    config: &MorphConfig,
) -> Result<Image, Error> {
    run(MorphOp::Erode, image, element, config)
}

/// Dilates `image` by `element`.
pub fn dilate(
    image: &Image,
    element: &StructuringElement,
    config: &MorphConfig,
) -> Result<Image, Error> {
    run(MorphOp::Dilate, image, element, config)
}

/// Opens `image` by `element`: dilate(erode(x)). Removes bright specks
/// smaller than the element.
pub fn open(
    image: &Image,
    element: &StructuringElement,
    config: &MorphConfig,
) -> Result<Image, Error> {
    run(MorphOp::Open, image, element, config)
}

/// Closes `image` by `element`: erode(dilate(x)). Fills dark gaps smaller
/// than the element.
pub fn close(
    image: &Image,
    element: &StructuringElement,
    config: &MorphConfig,
) -> Result<Image, Error> {
    run(MorphOp::Close, image, element, config)
}

/// Runs an arbitrary operator; the named entry points delegate here.
pub fn run(
    op: MorphOp,
    image: &Image,
    element: &StructuringElement,
    config: &MorphConfig,
) -> Result<Image, Error> {
    if image.is_empty() {
        return Ok(image.clone());
    }

    let run_gpu = || -> Result<Vec<f32>, DeviceError> {
        let ctx = pollster::block_on(GpuContext::new())?;
        let gpu = MorphologyGpu::new(ctx)?;
        gpu.run(image, element, op, config.edge)
    };
    let run_cpu = || cpu::apply(op, image, element, config.edge);

    let out = match config.backend {
        Backend::CpuOnly => run_cpu(),
        Backend::GpuOnly => Image::from_data(image.width(), image.height(), run_gpu()?),
        Backend::Auto => match run_gpu() {
            Ok(data) => Image::from_data(image.width(), image.height(), data),
            Err(_gpu_err) => run_cpu(),
        },
    };

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::RandomField;

    fn cpu(edge: EdgeMode) -> MorphConfig {
        MorphConfig {
            edge,
            backend: Backend::CpuOnly,
        }
    }

    /// A deterministic pseudo-random binary image.
    fn noise_image(width: usize, height: usize, seed: u64) -> Image {
        let field = RandomField::new(seed);
        let data = (0..width * height)
            .map(|i| if field.sample(i as u64) > 0.0 { 1.0 } else { 0.0 })
            .collect();
        Image::from_data(width, height, data)
    }

    #[test]
    fn test_erode_all_ones_clamp() {
        let image = Image::filled(3, 3, 1.0);
        let element = StructuringElement::rect3();
        let out = erode(&image, &element, &cpu(EdgeMode::Clamp)).unwrap();
        assert!(out.as_slice().iter().all(|&v| v == 1.0));
    }

    #[test]
    fn test_erode_all_ones_zero_border() {
        let image = Image::filled(3, 3, 1.0);
        let element = StructuringElement::rect3();
        let out = erode(&image, &element, &cpu(EdgeMode::Constant(0.0))).unwrap();
        // Every border cell reaches outside the image and picks up the 0.
        for y in 0..3 {
            for x in 0..3 {
                let expected = if x == 1 && y == 1 { 1.0 } else { 0.0 };
                assert_eq!(out.get(x, y), expected, "at ({}, {})", x, y);
            }
        }
    }

    #[test]
    fn test_erode_removes_isolated_peak() {
        let mut image = Image::new(5, 5);
        image.set(2, 2, 1.0);
        let element = StructuringElement::rect3();
        let out = erode(&image, &element, &cpu(EdgeMode::Clamp)).unwrap();
        assert!(out.as_slice().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_dilate_grows_isolated_peak() {
        let mut image = Image::new(5, 5);
        image.set(2, 2, 1.0);
        let element = StructuringElement::rect3();
        let out = dilate(&image, &element, &cpu(EdgeMode::Clamp)).unwrap();
        for y in 0..5 {
            for x in 0..5 {
                let expected = if (1..=3).contains(&x) && (1..=3).contains(&y) {
                    1.0
                } else {
                    0.0
                };
                assert_eq!(out.get(x, y), expected, "at ({}, {})", x, y);
            }
        }
    }

    #[test]
    fn test_open_close_idempotent() {
        let image = noise_image(24, 17, 404);
        let element = StructuringElement::rect3();
        let config = cpu(EdgeMode::Identity);

        let once = open(&image, &element, &config).unwrap();
        let twice = open(&once, &element, &config).unwrap();
        assert_eq!(once, twice, "open(open(x)) must equal open(x)");

        let once = close(&image, &element, &config).unwrap();
        let twice = close(&once, &element, &config).unwrap();
        assert_eq!(once, twice, "close(close(x)) must equal close(x)");
    }

    #[test]
    fn test_open_matches_erode_then_dilate() {
        let image = noise_image(16, 16, 7);
        let element = StructuringElement::cross(3, 3).unwrap();
        let config = cpu(EdgeMode::Clamp);

        let composed = dilate(&erode(&image, &element, &config).unwrap(), &element, &config)
            .unwrap();
        assert_eq!(open(&image, &element, &config).unwrap(), composed);

        let composed = erode(&dilate(&image, &element, &config).unwrap(), &element, &config)
            .unwrap();
        assert_eq!(close(&image, &element, &config).unwrap(), composed);
    }

    #[test]
    fn test_erode_dilate_duality_under_complement() {
        // For binary images and a symmetric element, erosion is the
        // complement of dilating the complement.
        let image = noise_image(20, 13, 99);
        let element = StructuringElement::rect(3, 3).unwrap();
        assert!(element.is_symmetric());
        let config = cpu(EdgeMode::Clamp);

        let complement = |img: &Image| {
            let data = img.as_slice().iter().map(|&v| 1.0 - v).collect();
            Image::from_data(img.width(), img.height(), data)
        };

        let eroded = erode(&image, &element, &config).unwrap();
        let dual = complement(&dilate(&complement(&image), &element, &config).unwrap());
        assert_eq!(eroded, dual);
    }

    #[test]
    fn test_erode_below_dilate_above() {
        // With the anchor in the mask, erosion can only lower values and
        // dilation only raise them.
        let image = noise_image(11, 9, 3);
        let element = StructuringElement::rect(5, 3).unwrap();
        let config = cpu(EdgeMode::Clamp);

        let eroded = erode(&image, &element, &config).unwrap();
        let dilated = dilate(&image, &element, &config).unwrap();
        for ((&lo, &mid), &hi) in eroded
            .as_slice()
            .iter()
            .zip(image.as_slice())
            .zip(dilated.as_slice())
        {
            assert!(lo <= mid && mid <= hi);
        }
    }

    #[test]
    fn test_empty_image_passes_through() {
        let image = Image::new(0, 0);
        let element = StructuringElement::rect3();
        let out = erode(&image, &element, &cpu(EdgeMode::Clamp)).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_anchor_offsets_respected() {
        // Anchor at the top-left corner shifts the window: each output cell
        // takes the min over the 2x2 block to its lower right.
        let mut image = Image::filled(3, 3, 5.0);
        image.set(2, 2, 1.0);
        let element =
            StructuringElement::from_mask(2, 2, (0, 0), vec![true; 4]).unwrap();
        let out = erode(&image, &element, &cpu(EdgeMode::Identity)).unwrap();
        assert_eq!(out.get(1, 1), 1.0);
        assert_eq!(out.get(2, 2), 1.0);
        assert_eq!(out.get(0, 0), 5.0);
    }
}
