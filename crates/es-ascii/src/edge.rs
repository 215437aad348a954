use std::ops::Range;

use es_core::charset::Orientation;
use es_core::frame::{RGB_BYTES, SourceFrame};
use es_core::lut::LutSet;

/// tan(67.5°) : au-delà de ce rapport, une composante du gradient domine l'autre.
pub const DIAGONAL_RATIO: f32 = 2.414_213_6;

/// Noyau de Sobel vertical, indexé `[ky + 1][kx + 1]`.
const SOBEL_Y: [[f32; 3]; 3] = [[1.0, 2.0, 1.0], [0.0, 0.0, 0.0], [-1.0, -2.0, -1.0]];
/// Noyau de Sobel horizontal, indexé `[ky + 1][kx + 1]`.
const SOBEL_X: [[f32; 3]; 3] = [[1.0, 0.0, -1.0], [2.0, 0.0, -2.0], [1.0, 0.0, -1.0]];

/// Luma BT.601 d'un pixel RGB.
///
/// # Example
/// ```
/// use es_ascii::edge::luma;
/// assert!((luma([255, 255, 255]) - 255.0).abs() < 0.01);
/// assert!(luma([0, 0, 0]).abs() < f32::EPSILON);
/// ```
#[inline(always)]
#[must_use]
pub fn luma([r, g, b]: [u8; 3]) -> f32 {
    0.299 * f32::from(r) + 0.587 * f32::from(g) + 0.114 * f32::from(b)
}

/// Gradient de Sobel autour d'un pixel source.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Gradient {
    /// Horizontal response (left minus right).
    pub gx: f32,
    /// Vertical response (top minus bottom).
    pub gy: f32,
    /// Luma of the centre sample.
    pub center_luma: f32,
}

impl Gradient {
    /// `(gx² + gy²) / 255²`.
    #[inline(always)]
    #[must_use]
    pub fn magnitude_sq(&self) -> f32 {
        (self.gx * self.gx + self.gy * self.gy) / (255.0 * 255.0)
    }

    /// Centre luma as a byte, truncated toward zero.
    #[inline(always)]
    #[must_use]
    pub fn center_byte(&self) -> u8 {
        self.center_luma.clamp(0.0, 255.0) as u8
    }
}

/// Compute the 3×3 Sobel gradient at source pixel (sx, sy).
///
/// Neighbours outside the frame replicate the nearest edge pixel.
///
/// # Example
/// ```
/// use es_core::frame::SourceFrame;
/// use es_ascii::edge::sobel;
/// let data = vec![90u8; 5 * 5 * 3];
/// let frame = SourceFrame::new(&data, 5, 5, 15).unwrap();
/// let g = sobel(&frame, 0, 0);
/// assert_eq!((g.gx, g.gy), (0.0, 0.0));
/// ```
#[inline(always)]
#[must_use]
pub fn sobel(frame: &SourceFrame<'_>, sx: u32, sy: u32) -> Gradient {
    // Taps positifs et négatifs accumulés séparément : un voisinage uniforme
    // donne deux sommes identiques, donc un gradient exactement nul.
    let (mut gx_pos, mut gx_neg) = (0.0f32, 0.0f32);
    let (mut gy_pos, mut gy_neg) = (0.0f32, 0.0f32);
    let mut center_luma = 0.0f32;

    for ky in -1i64..=1 {
        for kx in -1i64..=1 {
            let l = luma(frame.pixel_clamped(i64::from(sx) + kx, i64::from(sy) + ky));
            let (row, col) = ((ky + 1) as usize, (kx + 1) as usize);
            let (wx, wy) = (SOBEL_X[row][col], SOBEL_Y[row][col]);
            if wx > 0.0 {
                gx_pos += l * wx;
            } else {
                gx_neg -= l * wx;
            }
            if wy > 0.0 {
                gy_pos += l * wy;
            } else {
                gy_neg -= l * wy;
            }
            if kx == 0 && ky == 0 {
                center_luma = l;
            }
        }
    }

    Gradient {
        gx: gx_pos - gx_neg,
        gy: gy_pos - gy_neg,
        center_luma,
    }
}

/// Classify a gradient into an orientation class.
///
/// Comparisons are strict: a magnitude exactly at the threshold is an edge.
/// A gradient that is exactly zero has no direction and is always flat.
///
/// # Example
/// ```
/// use es_core::charset::Orientation;
/// use es_ascii::edge::{classify_gradient, Gradient};
/// let g = Gradient { gx: 0.0, gy: 900.0, center_luma: 0.0 };
/// assert_eq!(classify_gradient(&g, 0.16), Orientation::Vertical);
/// ```
#[allow(clippy::float_cmp)]
#[inline(always)]
#[must_use]
pub fn classify_gradient(g: &Gradient, edge_strength_sq: f32) -> Orientation {
    if g.magnitude_sq() < edge_strength_sq || (g.gx == 0.0 && g.gy == 0.0) {
        return Orientation::Flat;
    }
    let (ax, ay) = (g.gx.abs(), g.gy.abs());
    if ay > ax * DIAGONAL_RATIO {
        Orientation::Vertical
    } else if ax > ay * DIAGONAL_RATIO {
        Orientation::Horizontal
    } else if g.gx * g.gy > 0.0 {
        Orientation::Diag1
    } else {
        Orientation::Diag2
    }
}

/// Proportional nearest-sample mapping: `floor(i / cells · pixels)`.
#[inline(always)]
#[must_use]
pub fn source_coord(i: u16, cells: u16, pixels: u32) -> u32 {
    let cells = u64::from(cells.max(1));
    let mapped = u64::from(i) * u64::from(pixels) / cells;
    (mapped as u32).min(pixels.saturating_sub(1))
}

/// Paramètres de classification d'une frame, figés avant le dispatch.
#[derive(Clone, Copy, Debug)]
pub struct ClassifyParams {
    /// Grid width in cells.
    pub grid_width: u16,
    /// Grid height in cells.
    pub grid_height: u16,
    /// Squared edge threshold.
    pub edge_strength_sq: f32,
}

impl ClassifyParams {
    /// Parameters for a `width × height` grid with a linear edge threshold.
    #[must_use]
    pub fn new(grid_width: u16, grid_height: u16, edge_strength: f32) -> Self {
        Self {
            grid_width,
            grid_height,
            edge_strength_sq: edge_strength * edge_strength,
        }
    }
}

/// Result of classifying one destination cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CellSample {
    /// Orientation class chosen for the cell.
    pub orientation: Orientation,
    /// Gamma-corrected brightness index.
    pub brightness: u8,
    /// Glyph code into the LUT palette.
    pub glyph: u8,
    /// Raw RGB of the centre source sample.
    pub color: [u8; 3],
}

/// Classify destination cell (x, y).
///
/// # Example
/// ```
/// use es_core::charset::Orientation;
/// use es_core::frame::SourceFrame;
/// use es_core::lut::LutSet;
/// use es_ascii::edge::{classify_cell, ClassifyParams};
///
/// let data = vec![128u8; 2 * 2 * 3];
/// let frame = SourceFrame::new(&data, 2, 2, 6).unwrap();
/// let luts = LutSet::new();
/// let cell = classify_cell(&frame, &luts, ClassifyParams::new(1, 1, 0.4), 0, 0);
/// assert_eq!(cell.orientation, Orientation::Flat);
/// assert_eq!(cell.color, [128, 128, 128]);
/// ```
#[inline(always)]
#[must_use]
pub fn classify_cell(
    frame: &SourceFrame<'_>,
    luts: &LutSet,
    params: ClassifyParams,
    x: u16,
    y: u16,
) -> CellSample {
    let sx = source_coord(x, params.grid_width, frame.width());
    let sy = source_coord(y, params.grid_height, frame.height());

    let gradient = sobel(frame, sx, sy);
    let brightness = luts.gamma().apply(gradient.center_byte());
    let orientation = classify_gradient(&gradient, params.edge_strength_sq);

    CellSample {
        orientation,
        brightness,
        glyph: luts.glyph_code(orientation, brightness),
        color: frame.pixel(sx, sy),
    }
}

/// Classify every cell of the rows in `rows`, writing into row-local buffers.
///
/// `glyphs` holds `rows.len() · W` codes and `colors` `rows.len() · W · 3` bytes,
/// both starting at row `rows.start`.
pub fn classify_rows(
    frame: &SourceFrame<'_>,
    luts: &LutSet,
    params: ClassifyParams,
    rows: Range<usize>,
    glyphs: &mut [u8],
    colors: &mut [u8],
) {
    let w = usize::from(params.grid_width);
    debug_assert_eq!(glyphs.len(), rows.len() * w);
    debug_assert_eq!(colors.len(), rows.len() * w * RGB_BYTES);

    for (local_y, y) in rows.enumerate() {
        let glyph_row = &mut glyphs[local_y * w..(local_y + 1) * w];
        let color_row = &mut colors[local_y * w * RGB_BYTES..(local_y + 1) * w * RGB_BYTES];
        for (x, (glyph, color)) in glyph_row
            .iter_mut()
            .zip(color_row.chunks_exact_mut(RGB_BYTES))
            .enumerate()
        {
            let cell = classify_cell(frame, luts, params, x as u16, y as u16);
            *glyph = cell.glyph;
            color.copy_from_slice(&cell.color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use es_core::charset::RAMP_FLAT;

    fn frame_from_rows(rows: &[&[u8]]) -> (Vec<u8>, u32, u32) {
        let h = rows.len() as u32;
        let w = rows[0].len() as u32;
        let data = rows
            .iter()
            .flat_map(|r| r.iter().flat_map(|&v| [v, v, v]))
            .collect();
        (data, w, h)
    }

    fn center_orientation(rows: &[&[u8]], edge_strength: f32) -> Orientation {
        let (data, w, h) = frame_from_rows(rows);
        let frame = SourceFrame::new(&data, w, h, w as usize * 3).unwrap();
        let luts = LutSet::new();
        let params = ClassifyParams::new(w as u16, h as u16, edge_strength);
        classify_cell(&frame, &luts, params, 1, 1).orientation
    }

    #[test]
    fn uniform_source_is_flat_for_any_threshold() {
        let rows: &[&[u8]] = &[&[77, 77, 77], &[77, 77, 77], &[77, 77, 77]];
        for t in [0.0, 0.1, 0.4, 2.0] {
            assert_eq!(center_orientation(rows, t), Orientation::Flat);
        }
    }

    #[test]
    fn top_bottom_boundary_is_vertical() {
        let rows: &[&[u8]] = &[&[0, 0, 0], &[0, 0, 0], &[255, 255, 255]];
        assert_eq!(center_orientation(rows, 0.4), Orientation::Vertical);
    }

    #[test]
    fn left_right_boundary_is_horizontal() {
        let rows: &[&[u8]] = &[&[0, 0, 255], &[0, 0, 255], &[0, 0, 255]];
        assert_eq!(center_orientation(rows, 0.4), Orientation::Horizontal);
    }

    #[test]
    fn diagonal_with_same_sign_components_is_diag1() {
        // Blanc sous l'anti-diagonale : gx < 0 et gy < 0.
        let rows: &[&[u8]] = &[&[0, 0, 0], &[0, 0, 255], &[0, 255, 255]];
        assert_eq!(center_orientation(rows, 0.4), Orientation::Diag1);
    }

    #[test]
    fn diagonal_with_opposite_sign_components_is_diag2() {
        // Blanc au-dessus de la diagonale : gx < 0, gy > 0.
        let rows: &[&[u8]] = &[&[0, 255, 255], &[0, 0, 255], &[0, 0, 0]];
        assert_eq!(center_orientation(rows, 0.4), Orientation::Diag2);
    }

    #[test]
    fn weak_edge_below_threshold_is_flat() {
        let rows: &[&[u8]] = &[&[100, 100, 102], &[100, 100, 102], &[100, 100, 102]];
        assert_eq!(center_orientation(rows, 0.4), Orientation::Flat);
    }

    #[test]
    fn magnitude_equal_to_threshold_is_an_edge() {
        let g = Gradient {
            gx: 255.0,
            gy: 0.0,
            center_luma: 0.0,
        };
        assert!((g.magnitude_sq() - 1.0).abs() < f32::EPSILON);
        assert_eq!(classify_gradient(&g, 1.0), Orientation::Horizontal);
    }

    #[test]
    fn sobel_replicates_edges_at_corners() {
        let rows: &[&[u8]] = &[&[0, 255], &[0, 255]];
        let (data, w, h) = frame_from_rows(rows);
        let frame = SourceFrame::new(&data, w, h, 6).unwrap();
        let g = sobel(&frame, 0, 0);
        // Colonne gauche répliquée : gauche = 0, droite = 255 sur les trois lignes.
        assert!((g.gx + 4.0 * luma([255, 255, 255])).abs() < 0.01);
        assert!(g.gy.abs() < f32::EPSILON);
    }

    #[test]
    fn source_coord_is_proportional_floor() {
        assert_eq!(source_coord(0, 4, 10), 0);
        assert_eq!(source_coord(1, 4, 10), 2);
        assert_eq!(source_coord(3, 4, 10), 7);
        assert_eq!(source_coord(5, 6, 2), 1);
    }

    #[test]
    fn fractional_center_luma_is_truncated() {
        // luma(0, 1, 0) = 0.587 : indice 0, pas 1.
        let data = [0u8, 1, 0].repeat(4);
        let frame = SourceFrame::new(&data, 2, 2, 6).unwrap();
        let luts = LutSet::new();
        let cell = classify_cell(&frame, &luts, ClassifyParams::new(1, 1, 0.4), 0, 0);
        assert_eq!(cell.orientation, Orientation::Flat);
        assert_eq!(cell.brightness, 0);
        assert_eq!(luts.palette().glyph(cell.glyph), RAMP_FLAT[0]);
    }

    #[test]
    fn color_is_raw_center_sample() {
        let data = [10, 20, 30, 200, 100, 50, 1, 2, 3, 4, 5, 6];
        let frame = SourceFrame::new(&data, 2, 2, 6).unwrap();
        let luts = LutSet::new();
        let cell = classify_cell(&frame, &luts, ClassifyParams::new(2, 2, 0.4), 1, 0);
        assert_eq!(cell.color, [200, 100, 50]);
    }

    #[test]
    fn classify_rows_fills_only_its_slice() {
        let data = vec![50u8; 4 * 4 * 3];
        let frame = SourceFrame::new(&data, 4, 4, 12).unwrap();
        let luts = LutSet::new();
        let params = ClassifyParams::new(4, 4, 0.4);
        let mut glyphs = vec![0xFFu8; 8];
        let mut colors = vec![0u8; 24];
        classify_rows(&frame, &luts, params, 2..4, &mut glyphs, &mut colors);
        let expected = luts.glyph_code(Orientation::Flat, luts.gamma().apply(50));
        assert!(glyphs.iter().all(|&g| g == expected));
        assert!(colors.iter().all(|&c| c == 50));
    }
}
