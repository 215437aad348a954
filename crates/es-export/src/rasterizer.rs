use es_core::charset::GlyphPalette;
use es_core::config::{CELL_PX, EngineConfig};
use es_core::frame::{AsciiGrid, RGB_BYTES};

use crate::font::glyph_bitmap;

/// Étalonnage couleur appliqué au moment de la rasterisation.
///
/// Saturation d'abord, luminosité ensuite : l'ordre est fixe.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ColorGrading {
    /// `c' = luma + s · (c - luma)`. 1.0 = neutre.
    pub saturation: f32,
    /// `c'' = c' · b`.
    pub brightness: f32,
}

impl Default for ColorGrading {
    fn default() -> Self {
        Self {
            saturation: 1.0,
            brightness: 1.0,
        }
    }
}

impl ColorGrading {
    /// Grading factors from the engine configuration.
    #[must_use]
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            saturation: config.saturation,
            brightness: config.brightness,
        }
    }

    /// Grade one raw cell colour.
    ///
    /// Each stage clamps to [0, 255] and truncates toward zero.
    ///
    /// # Example
    /// ```
    /// use es_export::rasterizer::ColorGrading;
    /// let g = ColorGrading { saturation: 1.0, brightness: 0.5 };
    /// assert_eq!(g.apply([200, 100, 51]), [100, 50, 25]);
    /// ```
    #[inline]
    #[must_use]
    pub fn apply(&self, rgb: [u8; 3]) -> [u8; 3] {
        let mut rgb = rgb;
        if (self.saturation - 1.0).abs() > f32::EPSILON {
            let [r, g, b] = rgb.map(f32::from);
            let luma = 0.299 * r + 0.587 * g + 0.114 * b;
            rgb = [r, g, b].map(|c| to_channel(luma + self.saturation * (c - luma)));
        }
        rgb.map(|c| to_channel(f32::from(c) * self.brightness))
    }
}

#[inline(always)]
fn to_channel(v: f32) -> u8 {
    v.clamp(0.0, 255.0) as u8
}

/// Reconstruit un tampon RGB24 à partir d'une grille de glyphes.
///
/// Chaque cellule devient un bloc 8×8 : les bits allumés du glyphe prennent
/// la couleur étalonnée de la cellule, le reste est noir.
/// Les bitmaps sont précalculées par code de glyphe à la construction.
pub struct Rasterizer {
    bitmaps: Vec<[u8; 8]>,
    grading: ColorGrading,
}

impl Rasterizer {
    /// Cache the bitmap of every glyph in `palette`.
    #[must_use]
    pub fn new(palette: &GlyphPalette, grading: ColorGrading) -> Self {
        let bitmaps = (0..palette.len())
            .map(|code| *glyph_bitmap(palette.glyph(code as u8)))
            .collect();
        Self { bitmaps, grading }
    }

    /// Grading in effect.
    #[must_use]
    pub fn grading(&self) -> ColorGrading {
        self.grading
    }

    /// Pixel dimensions of the raster for a `grid_w × grid_h` grid.
    ///
    /// # Example
    /// ```
    /// use es_export::rasterizer::Rasterizer;
    /// assert_eq!(Rasterizer::target_dimensions(120, 33), (960, 264));
    /// ```
    #[must_use]
    pub fn target_dimensions(grid_w: u16, grid_h: u16) -> (u32, u32) {
        (
            u32::from(grid_w) * CELL_PX as u32,
            u32::from(grid_h) * CELL_PX as u32,
        )
    }

    /// Rasterise `grid` into `out` (row-major RGB24, `8W × 8H`).
    ///
    /// The whole buffer is cleared to black first. A buffer of the wrong
    /// size is left untouched.
    pub fn render(&self, grid: &AsciiGrid<'_>, out: &mut [u8]) {
        let (w, h) = Self::target_dimensions(grid.width(), grid.height());
        let expected = w as usize * h as usize * RGB_BYTES;
        if out.len() != expected {
            log::error!(
                "Rasterizer dimension mismatch: buffer={} octets, attendu {}x{}x3={}",
                out.len(),
                w,
                h,
                expected
            );
            return;
        }
        out.fill(0);
        if expected == 0 {
            return;
        }

        let stride = w as usize * RGB_BYTES;
        let band_size = stride * CELL_PX;
        let codes = grid.glyph_codes();
        let cols = usize::from(grid.width());
        let blank = [0u8; 8];

        for (gy, band) in out.chunks_exact_mut(band_size).enumerate() {
            for gx in 0..cols {
                let code = codes[gy * cols + gx];
                let bitmap = self.bitmaps.get(usize::from(code)).unwrap_or(&blank);
                if bitmap.iter().all(|&row| row == 0) {
                    continue;
                }
                let (r, g, b) = grid.color(gx as u16, gy as u16);
                let rgb = self.grading.apply([r, g, b]);

                let x0 = gx * CELL_PX * RGB_BYTES;
                for (cy, &row) in bitmap.iter().enumerate() {
                    let line = &mut band[cy * stride + x0..cy * stride + x0 + CELL_PX * RGB_BYTES];
                    for (cx, px) in line.chunks_exact_mut(RGB_BYTES).enumerate() {
                        if row & (0x80 >> cx) != 0 {
                            px.copy_from_slice(&rgb);
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_of<'a>(
        palette: &'a GlyphPalette,
        glyphs: &'a [u8],
        colors: &'a [u8],
        w: u16,
        h: u16,
    ) -> AsciiGrid<'a> {
        AsciiGrid::new(w, h, glyphs, colors, palette).unwrap()
    }

    #[test]
    fn neutral_saturation_only_applies_brightness() {
        let grading = ColorGrading {
            saturation: 1.0,
            brightness: 1.5,
        };
        assert_eq!(grading.apply([200, 100, 50]), [255, 150, 75]);
    }

    #[test]
    fn saturation_runs_before_brightness() {
        let grading = ColorGrading {
            saturation: 0.0,
            brightness: 2.0,
        };
        // luma(200,100,50) = 124.2 → 124, puis ×2.
        assert_eq!(grading.apply([200, 100, 50]), [248, 248, 248]);
    }

    #[test]
    fn oversaturation_clamps_each_channel() {
        let grading = ColorGrading {
            saturation: 2.0,
            brightness: 1.0,
        };
        assert_eq!(grading.apply([200, 100, 50]), [255, 75, 0]);
    }

    #[test]
    fn only_set_bits_are_coloured() {
        let palette = GlyphPalette::new();
        let underscore = palette.code_of('_').unwrap();
        let glyphs = [underscore];
        let colors = [10, 20, 30];
        let grid = grid_of(&palette, &glyphs, &colors, 1, 1);
        let rasterizer = Rasterizer::new(&palette, ColorGrading::default());

        let mut out = vec![0xAAu8; 8 * 8 * 3];
        rasterizer.render(&grid, &mut out);
        for y in 0..8 {
            for x in 0..8 {
                let i = (y * 8 + x) * 3;
                let expected: &[u8] = if y == 7 { &[10, 20, 30] } else { &[0, 0, 0] };
                assert_eq!(&out[i..i + 3], expected, "pixel ({x}, {y})");
            }
        }
    }

    #[test]
    fn cells_land_in_their_own_block() {
        let palette = GlyphPalette::new();
        let bar = palette.code_of('|').unwrap();
        let dot = palette.code_of('.').unwrap();
        let glyphs = [dot, bar];
        let colors = [255, 0, 0, 0, 255, 0];
        let grid = grid_of(&palette, &glyphs, &colors, 2, 1);
        let rasterizer = Rasterizer::new(&palette, ColorGrading::default());

        let mut out = vec![0u8; 16 * 8 * 3];
        rasterizer.render(&grid, &mut out);
        // '|' occupe les colonnes 3-4 de la seconde cellule, sur toute la hauteur.
        for y in 0..8 {
            let i = (y * 16 + 8 + 3) * 3;
            assert_eq!(&out[i..i + 3], &[0, 255, 0]);
        }
        assert!(out[..3].iter().all(|&c| c == 0));
    }

    #[test]
    fn mismatched_buffer_is_left_untouched() {
        let palette = GlyphPalette::new();
        let glyphs = [0u8];
        let colors = [1, 2, 3];
        let grid = grid_of(&palette, &glyphs, &colors, 1, 1);
        let rasterizer = Rasterizer::new(&palette, ColorGrading::default());
        let mut out = vec![7u8; 10];
        rasterizer.render(&grid, &mut out);
        assert!(out.iter().all(|&c| c == 7));
    }
}
