//! Heightmap and Image buffer data structures.

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// A square fractal heightmap with side length 2^n + 1.
///
/// Heights are stored in row-major order. The side-length constraint comes from
/// the midpoint-displacement subdivision: every level must split cleanly in half.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Heightmap {
    size: usize,
    data: Vec<f32>,
}

impl Heightmap {
    /// Returns true if `size` is of the form 2^n + 1 with n >= 1.
    pub fn is_valid_size(size: usize) -> bool {
        size >= 3 && (size - 1).is_power_of_two()
    }

    /// Creates a zero-initialized heightmap.
    pub fn new(size: usize) -> Result<Self, Error> {
        if !Self::is_valid_size(size) {
            return Err(Error::InvalidSize(size));
        }
        Ok(Self {
            size,
            data: vec![0.0; size * size],
        })
    }

    /// Wraps an existing row-major buffer.
    ///
    /// # Panics
    /// Panics if `data.len() != size * size`.
    pub fn from_data(size: usize, data: Vec<f32>) -> Result<Self, Error> {
        if !Self::is_valid_size(size) {
            return Err(Error::InvalidSize(size));
        }
        assert_eq!(data.len(), size * size);
        Ok(Self { size, data })
    }

    /// Side length of the square grid.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Height at a cell.
    ///
    /// # Panics
    /// Panics if x or y is out of bounds.
    pub fn get(&self, x: usize, y: usize) -> f32 {
        debug_assert!(x < self.size && y < self.size);
        self.data[y * self.size + x]
    }

    /// Sets the height at a cell.
    ///
    /// # Panics
    /// Panics if x or y is out of bounds.
    pub fn set(&mut self, x: usize, y: usize, height: f32) {
        debug_assert!(x < self.size && y < self.size);
        self.data[y * self.size + x] = height;
    }

    /// Row-major height values.
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Consumes the heightmap, returning the raw buffer.
    pub fn into_data(self) -> Vec<f32> {
        self.data
    }

    /// Computes the (min, max) height values.
    pub fn height_range(&self) -> (f32, f32) {
        let mut min = f32::MAX;
        let mut max = f32::MIN;
        for &h in &self.data {
            min = min.min(h);
            max = max.max(h);
        }
        (min, max)
    }
}

/// A 2D scalar image buffer in row-major order.
///
/// Morphology input/output. Arbitrary dimensions, including zero (an empty
/// image passes through the operators unchanged).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    width: usize,
    height: usize,
    data: Vec<f32>,
}

impl Image {
    /// Creates a zero-filled image.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0.0; width * height],
        }
    }

    /// Creates an image filled with `value`.
    pub fn filled(width: usize, height: usize, value: f32) -> Self {
        Self {
            width,
            height,
            data: vec![value; width * height],
        }
    }

    /// Wraps an existing row-major buffer.
    ///
    /// # Panics
    /// Panics if `data.len() != width * height`.
    pub fn from_data(width: usize, height: usize, data: Vec<f32>) -> Self {
        assert_eq!(data.len(), width * height);
        Self {
            width,
            height,
            data,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// True when the image holds no pixels.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Pixel value at (x, y).
    ///
    /// # Panics
    /// Panics if x or y is out of bounds.
    pub fn get(&self, x: usize, y: usize) -> f32 {
        debug_assert!(x < self.width && y < self.height);
        self.data[y * self.width + x]
    }

    /// Sets the pixel value at (x, y).
    ///
    /// # Panics
    /// Panics if x or y is out of bounds.
    pub fn set(&mut self, x: usize, y: usize, value: f32) {
        debug_assert!(x < self.width && y < self.height);
        self.data[y * self.width + x] = value;
    }

    /// Row-major pixel values.
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Consumes the image, returning the raw buffer.
    pub fn into_data(self) -> Vec<f32> {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_sizes() {
        assert!(Heightmap::is_valid_size(3));
        assert!(Heightmap::is_valid_size(5));
        assert!(Heightmap::is_valid_size(129));
        assert!(Heightmap::is_valid_size(1025));
        assert!(!Heightmap::is_valid_size(0));
        assert!(!Heightmap::is_valid_size(1));
        assert!(!Heightmap::is_valid_size(2));
        assert!(!Heightmap::is_valid_size(4));
        assert!(!Heightmap::is_valid_size(6));
        assert!(!Heightmap::is_valid_size(256));
    }

    #[test]
    fn test_heightmap_rejects_bad_size() {
        assert!(matches!(Heightmap::new(6), Err(Error::InvalidSize(6))));
        assert!(matches!(Heightmap::new(0), Err(Error::InvalidSize(0))));
    }

    #[test]
    fn test_heightmap_get_set() {
        let mut hm = Heightmap::new(5).unwrap();
        hm.set(2, 3, 0.5);
        assert_eq!(hm.get(2, 3), 0.5);
        assert_eq!(hm.get(0, 0), 0.0);
    }

    #[test]
    fn test_heightmap_range() {
        let mut hm = Heightmap::new(9).unwrap();
        hm.set(0, 0, -0.5);
        hm.set(8, 8, 1.5);
        let (min, max) = hm.height_range();
        assert_eq!(min, -0.5);
        assert_eq!(max, 1.5);
    }

    #[test]
    fn test_image_creation() {
        let img = Image::new(7, 3);
        assert_eq!(img.width(), 7);
        assert_eq!(img.height(), 3);
        assert_eq!(img.as_slice().len(), 21);

        let empty = Image::new(0, 4);
        assert!(empty.is_empty());
    }

    #[test]
    fn test_image_get_set() {
        let mut img = Image::new(4, 4);
        img.set(3, 1, 2.0);
        assert_eq!(img.get(3, 1), 2.0);
        assert_eq!(img.into_data()[7], 2.0);
    }
}
