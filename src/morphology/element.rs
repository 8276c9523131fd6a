//! Structuring elements for morphology operators.

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// A small 2D boolean mask with an anchor cell, defining the neighborhood a
/// morphology operator reaches.
///
/// Constructors validate the element up front, so an operator can assume any
/// element it receives is well-formed. The set cells are also kept as a
/// precomputed anchor-relative offset list, which both the CPU loops and the
/// GPU kernel iterate in the same order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuringElement {
    width: usize,
    height: usize,
    anchor: (usize, usize),
    mask: Vec<bool>,
    offsets: Vec<(i32, i32)>,
}

impl StructuringElement {
    /// A full `width x height` rectangle anchored at its center cell.
    pub fn rect(width: usize, height: usize) -> Result<Self, Error> {
        let mask = vec![true; width.saturating_mul(height)];
        Self::from_mask(width, height, ((width.max(1) - 1) / 2, (height.max(1) - 1) / 2), mask)
    }

    /// A 3x3 rectangle, the most common element.
    pub fn rect3() -> Self {
        Self::rect(3, 3).expect("3x3 rectangle is always valid")
    }

    /// A plus-shaped element: the anchor row and column of a `width x height`
    /// box, anchored at the center.
    pub fn cross(width: usize, height: usize) -> Result<Self, Error> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidElement(format!(
                "element dimensions must be positive, got {}x{}",
                width, height
            )));
        }
        let anchor = ((width - 1) / 2, (height - 1) / 2);
        let mask = (0..width * height)
            .map(|i| {
                let (x, y) = (i % width, i / width);
                x == anchor.0 || y == anchor.1
            })
            .collect();
        Self::from_mask(width, height, anchor, mask)
    }

    /// Builds an element from an explicit row-major mask.
    pub fn from_mask(
        width: usize,
        height: usize,
        anchor: (usize, usize),
        mask: Vec<bool>,
    ) -> Result<Self, Error> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidElement(format!(
                "element dimensions must be positive, got {}x{}",
                width, height
            )));
        }
        if mask.len() != width * height {
            return Err(Error::InvalidElement(format!(
                "mask length {} does not match {}x{}",
                mask.len(),
                width,
                height
            )));
        }
        if anchor.0 >= width || anchor.1 >= height {
            return Err(Error::InvalidElement(format!(
                "anchor ({}, {}) outside {}x{} element",
                anchor.0, anchor.1, width, height
            )));
        }
        if !mask.iter().any(|&m| m) {
            return Err(Error::InvalidElement("mask has no set cells".to_string()));
        }

        let offsets = mask
            .iter()
            .enumerate()
            .filter(|&(_, &m)| m)
            .map(|(i, _)| {
                let x = (i % width) as i32 - anchor.0 as i32;
                let y = (i / width) as i32 - anchor.1 as i32;
                (x, y)
            })
            .collect();

        Ok(Self {
            width,
            height,
            anchor,
            mask,
            offsets,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn anchor(&self) -> (usize, usize) {
        self.anchor
    }

    /// Anchor-relative offsets of the set cells, row-major order.
    pub fn offsets(&self) -> &[(i32, i32)] {
        &self.offsets
    }

    /// Offsets negated, i.e. the reflection through the anchor. Dilation
    /// samples through these, the classical adjoint of erosion.
    pub fn reflected_offsets(&self) -> Vec<(i32, i32)> {
        self.offsets.iter().map(|&(x, y)| (-x, -y)).collect()
    }

    /// True when the mask equals its reflection through the anchor.
    pub fn is_symmetric(&self) -> bool {
        let mut reflected = self.reflected_offsets();
        reflected.sort_unstable();
        let mut own = self.offsets.clone();
        own.sort_unstable();
        own == reflected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_element() {
        let e = StructuringElement::rect(3, 3).unwrap();
        assert_eq!(e.anchor(), (1, 1));
        assert_eq!(e.offsets().len(), 9);
        assert_eq!(e.offsets()[0], (-1, -1));
        assert_eq!(e.offsets()[8], (1, 1));
        assert!(e.is_symmetric());
    }

    #[test]
    fn test_cross_element() {
        let e = StructuringElement::cross(3, 3).unwrap();
        assert_eq!(e.offsets().len(), 5);
        assert!(e.offsets().contains(&(0, 0)));
        assert!(e.offsets().contains(&(-1, 0)));
        assert!(!e.offsets().contains(&(-1, -1)));
        assert!(e.is_symmetric());
    }

    #[test]
    fn test_zero_sized_rejected() {
        assert!(matches!(
            StructuringElement::rect(0, 0),
            Err(Error::InvalidElement(_))
        ));
        assert!(matches!(
            StructuringElement::rect(3, 0),
            Err(Error::InvalidElement(_))
        ));
        assert!(matches!(
            StructuringElement::cross(0, 5),
            Err(Error::InvalidElement(_))
        ));
    }

    #[test]
    fn test_empty_mask_rejected() {
        let err = StructuringElement::from_mask(2, 2, (0, 0), vec![false; 4]);
        assert!(matches!(err, Err(Error::InvalidElement(_))));
    }

    #[test]
    fn test_bad_anchor_rejected() {
        let err = StructuringElement::from_mask(2, 2, (2, 0), vec![true; 4]);
        assert!(matches!(err, Err(Error::InvalidElement(_))));
    }

    #[test]
    fn test_mask_length_mismatch_rejected() {
        let err = StructuringElement::from_mask(2, 2, (0, 0), vec![true; 3]);
        assert!(matches!(err, Err(Error::InvalidElement(_))));
    }

    #[test]
    fn test_asymmetric_element_detected() {
        let e = StructuringElement::from_mask(2, 1, (0, 0), vec![true, true]).unwrap();
        assert!(!e.is_symmetric());
    }
}
