//! CPU diamond-square kernels.
//!
//! Iterative per-level form of midpoint displacement: each level runs one
//! diamond pass (centers of every step-sized square) and one square pass (the
//! edge midpoints those diamonds expose), then halves the step. Both passes
//! are embarrassingly parallel within a level; levels are strictly ordered.
//! The GPU path (`gpu/shaders/diamond_square.wgsl`) evaluates the same
//! expressions in the same order, so both backends produce identical bits.

use rayon::prelude::*;

use crate::rng::RandomField;

/// Generates a `size * size` row-major height field.
///
/// `size` must already be validated as 2^n + 1. Corners are
/// [top-left, top-right, bottom-left, bottom-right] and are never displaced.
pub fn generate_cpu(size: usize, roughness: f32, corners: [f32; 4], field: &RandomField) -> Vec<f32> {
    debug_assert!(crate::grid::Heightmap::is_valid_size(size));
    let last = size - 1;
    let mut heights = vec![0.0f32; size * size];
    heights[0] = corners[0];
    heights[last] = corners[1];
    heights[last * size] = corners[2];
    heights[last * size + last] = corners[3];

    let mut step = last;
    let mut level = 0u32;
    let mut amplitude = roughness;
    while step > 1 {
        let half = step / 2;

        // Diamond pass: center of each step-sized square gets the average of
        // its four diagonal corners plus a perturbation.
        let cells = last / step;
        let diamond: Vec<(usize, f32)> = (0..cells * cells)
            .into_par_iter()
            .map(|ci| {
                let x = (ci % cells) * step + half;
                let y = (ci / cells) * step + half;
                let value = diamond_value(&heights, size, x, y, half)
                    + field.grid(level, x as u32, y as u32) * amplitude;
                (y * size + x, value)
            })
            .collect();
        for (idx, v) in diamond {
            heights[idx] = v;
        }

        // Square pass: each edge midpoint averages its in-bounds axial
        // neighbors at distance `half`. Midpoints shared by adjacent squares
        // are lattice points, so each is computed exactly once per level.
        let square: Vec<(usize, f32)> = square_coords(size, step)
            .into_par_iter()
            .map(|(x, y)| {
                let value = square_value(&heights, size, x, y, half)
                    + field.grid(level, x as u32, y as u32) * amplitude * 0.5;
                (y * size + x, value)
            })
            .collect();
        for (idx, v) in square {
            heights[idx] = v;
        }

        step = half;
        amplitude *= 0.5;
        level += 1;
    }

    heights
}

#[inline]
fn diamond_value(heights: &[f32], size: usize, x: usize, y: usize, half: usize) -> f32 {
    let sum = heights[(y - half) * size + (x - half)]
        + heights[(y - half) * size + (x + half)]
        + heights[(y + half) * size + (x - half)]
        + heights[(y + half) * size + (x + half)];
    sum * 0.25
}

#[inline]
fn square_value(heights: &[f32], size: usize, x: usize, y: usize, half: usize) -> f32 {
    let last = size - 1;
    let mut sum = 0.0f32;
    let mut n = 0u32;
    if x >= half {
        sum += heights[y * size + (x - half)];
        n += 1;
    }
    if x + half <= last {
        sum += heights[y * size + (x + half)];
        n += 1;
    }
    if y >= half {
        sum += heights[(y - half) * size + x];
        n += 1;
    }
    if y + half <= last {
        sum += heights[(y + half) * size + x];
        n += 1;
    }
    sum / n as f32
}

/// Lattice coordinates of every square-pass midpoint for the given step.
///
/// Rows alternate: rows on the old lattice start at `half`, rows between them
/// start at 0 and include the borders.
fn square_coords(size: usize, step: usize) -> Vec<(usize, usize)> {
    let last = size - 1;
    let half = step / 2;
    let mut coords = Vec::new();
    let mut row = 0usize;
    let mut y = 0usize;
    while y <= last {
        let mut x = if row % 2 == 0 { half } else { 0 };
        while x <= last {
            coords.push((x, y));
            x += step;
        }
        row += 1;
        y += half;
    }
    coords
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_input_stays_flat_at_zero_roughness() {
        // With zero roughness every midpoint is a pure average, so a constant
        // corner height must propagate to every cell. This also proves every
        // cell gets written: an untouched cell would keep its 0.0 fill.
        let field = RandomField::new(9);
        let heights = generate_cpu(17, 0.0, [2.5; 4], &field);
        assert!(heights.iter().all(|&h| h == 2.5));
    }

    #[test]
    fn test_all_cells_finite() {
        let field = RandomField::new(3);
        let heights = generate_cpu(65, 1.0, [0.0; 4], &field);
        assert_eq!(heights.len(), 65 * 65);
        assert!(heights.iter().all(|h| h.is_finite()));
    }

    #[test]
    fn test_three_by_three_expansion() {
        // Small enough to check the whole subdivision by hand.
        let field = RandomField::new(77);
        let c = [1.0f32, 2.0, 3.0, 4.0];
        let r = 0.25f32;
        let heights = generate_cpu(3, r, c, &field);

        let center = (c[0] + c[1] + c[2] + c[3]) * 0.25 + field.grid(0, 1, 1) * r;
        assert_eq!(heights[1 * 3 + 1], center);

        // Top edge midpoint: left, right, down neighbors (up is out of bounds).
        let top = (c[0] + c[1] + center) / 3.0 + field.grid(0, 1, 0) * r * 0.5;
        assert_eq!(heights[1], top);

        // Left edge midpoint: right, up, down neighbors.
        let left = (center + c[0] + c[2]) / 3.0 + field.grid(0, 0, 1) * r * 0.5;
        assert_eq!(heights[3], left);

        // Bottom edge midpoint.
        let bottom = (c[2] + c[3] + center) / 3.0 + field.grid(0, 1, 2) * r * 0.5;
        assert_eq!(heights[2 * 3 + 1], bottom);

        // Right edge midpoint.
        let right = (center + c[1] + c[3]) / 3.0 + field.grid(0, 2, 1) * r * 0.5;
        assert_eq!(heights[1 * 3 + 2], right);
    }

    #[test]
    fn test_square_coords_cover_lattice_once() {
        // For a 5x5 grid at step 4 the square pass must hit each edge midpoint
        // of the single top-level square exactly once.
        let coords = square_coords(5, 4);
        assert_eq!(coords, vec![(2, 0), (0, 2), (4, 2), (2, 4)]);

        // At step 2 it fills the remaining lattice points.
        let coords = square_coords(5, 2);
        assert_eq!(coords.len(), 12);
        let mut seen = std::collections::HashSet::new();
        for &(x, y) in &coords {
            assert!((x + y) % 2 == 1, "({}, {}) is not a square point", x, y);
            assert!(seen.insert((x, y)), "({}, {}) visited twice", x, y);
        }
    }

    #[test]
    fn test_displacement_bounded_by_roughness() {
        // Total displacement is bounded by sum of amplitudes = 2 * roughness,
        // so heights stay within corner range +/- 2 * roughness.
        let field = RandomField::new(12345);
        let r = 0.5f32;
        let heights = generate_cpu(129, r, [0.0; 4], &field);
        let bound = 2.0 * r;
        for &h in &heights {
            assert!(h.abs() <= bound, "height {} exceeds bound {}", h, bound);
        }
    }
}
