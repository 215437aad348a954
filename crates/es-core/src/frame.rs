use crate::charset::GlyphPalette;
use crate::error::CoreError;

/// Octets par pixel RGB24.
pub const RGB_BYTES: usize = 3;

/// Frame source empruntée : RGB24 packé, lecture seule pendant tout le traitement.
///
/// # Example
/// ```
/// use es_core::frame::SourceFrame;
/// let data = vec![10u8; 4 * 2 * 3];
/// let frame = SourceFrame::new(&data, 4, 2, 12).unwrap();
/// assert_eq!(frame.pixel(3, 1), [10, 10, 10]);
/// ```
#[derive(Clone, Copy, Debug)]
pub struct SourceFrame<'a> {
    data: &'a [u8],
    width: u32,
    height: u32,
    stride: usize,
    pts: Option<f64>,
}

impl<'a> SourceFrame<'a> {
    /// Wrap a packed RGB24 buffer with an explicit row stride in bytes.
    ///
    /// # Errors
    /// Returns [`CoreError::InvalidDimensions`] if a dimension is zero, the
    /// stride is shorter than a row, or `data` is too small for the described frame.
    pub fn new(data: &'a [u8], width: u32, height: u32, stride: usize) -> Result<Self, CoreError> {
        let row = width as usize * RGB_BYTES;
        let needed = (height as usize).saturating_sub(1) * stride + row;
        if width == 0 || height == 0 || stride < row || data.len() < needed {
            return Err(CoreError::InvalidDimensions { width, height });
        }
        Ok(Self {
            data,
            width,
            height,
            stride,
            pts: None,
        })
    }

    /// Attach a presentation timestamp, in seconds.
    #[must_use]
    pub fn with_pts(mut self, pts: f64) -> Self {
        self.pts = Some(pts);
        self
    }

    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Row stride in bytes.
    #[must_use]
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Presentation timestamp, if the decoder provided one.
    #[must_use]
    pub fn pts(&self) -> Option<f64> {
        self.pts
    }

    /// Pixel (x, y) → [r, g, b]. Caller guarantees `x < width`, `y < height`.
    #[inline(always)]
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        debug_assert!(x < self.width && y < self.height, "pixel out of bounds");
        let idx = y as usize * self.stride + x as usize * RGB_BYTES;
        [self.data[idx], self.data[idx + 1], self.data[idx + 2]]
    }

    /// Pixel with coordinates clamped to the nearest edge (edge replication).
    #[inline(always)]
    #[must_use]
    pub fn pixel_clamped(&self, x: i64, y: i64) -> [u8; 3] {
        let x = x.clamp(0, i64::from(self.width) - 1) as u32;
        let y = y.clamp(0, i64::from(self.height) - 1) as u32;
        self.pixel(x, y)
    }
}

/// Frame RGB24 possédée, telle que livrée par un décodeur.
///
/// # Example
/// ```
/// use es_core::frame::OwnedFrame;
/// let frame = OwnedFrame::new(10, 10);
/// assert_eq!(frame.data.len(), 300);
/// assert!(frame.as_source().is_ok());
/// ```
#[derive(Clone, Debug)]
pub struct OwnedFrame {
    /// Pixels RGB, row-major, sans padding.
    pub data: Vec<u8>,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Presentation timestamp in seconds.
    pub pts: Option<f64>,
}

impl OwnedFrame {
    /// Crée une frame noire aux dimensions données.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            data: vec![0u8; width as usize * height as usize * RGB_BYTES],
            width,
            height,
            pts: None,
        }
    }

    /// Borrow as a [`SourceFrame`] (stride = width · 3).
    ///
    /// # Errors
    /// Returns [`CoreError::InvalidDimensions`] if the frame is empty or truncated.
    pub fn as_source(&self) -> Result<SourceFrame<'_>, CoreError> {
        let frame = SourceFrame::new(
            &self.data,
            self.width,
            self.height,
            self.width as usize * RGB_BYTES,
        )?;
        Ok(match self.pts {
            Some(pts) => frame.with_pts(pts),
            None => frame,
        })
    }
}

/// Single cell read back from the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AsciiCell {
    /// Glyphe à afficher.
    pub ch: char,
    /// Couleur brute du pixel source central (RGB).
    pub fg: (u8, u8, u8),
}

/// Vue sur la grille ASCII d'une frame : codes de glyphe + triplets RGB.
///
/// Les tampons appartiennent à l'arena du moteur ; la vue emprunte le moteur,
/// elle ne peut donc pas survivre au `reset` de la frame suivante.
///
/// # Example
/// ```
/// use es_core::charset::GlyphPalette;
/// use es_core::frame::AsciiGrid;
/// let palette = GlyphPalette::new();
/// let glyphs = [0u8; 6];
/// let colors = [255u8; 18];
/// let grid = AsciiGrid::new(3, 2, &glyphs, &colors, &palette).unwrap();
/// assert_eq!(grid.get(2, 1).fg, (255, 255, 255));
/// ```
#[derive(Clone, Copy)]
pub struct AsciiGrid<'a> {
    width: u16,
    height: u16,
    glyphs: &'a [u8],
    colors: &'a [u8],
    palette: &'a GlyphPalette,
}

impl<'a> AsciiGrid<'a> {
    /// Build a view over W·H glyph codes and W·H·3 colour bytes.
    ///
    /// # Errors
    /// Returns [`CoreError::InvalidDimensions`] if the buffers do not match the dimensions.
    pub fn new(
        width: u16,
        height: u16,
        glyphs: &'a [u8],
        colors: &'a [u8],
        palette: &'a GlyphPalette,
    ) -> Result<Self, CoreError> {
        let cells = usize::from(width) * usize::from(height);
        if glyphs.len() != cells || colors.len() != cells * RGB_BYTES {
            return Err(CoreError::InvalidDimensions {
                width: u32::from(width),
                height: u32::from(height),
            });
        }
        Ok(Self {
            width,
            height,
            glyphs,
            colors,
            palette,
        })
    }

    /// Width in cells.
    #[must_use]
    pub fn width(&self) -> u16 {
        self.width
    }

    /// Height in cells.
    #[must_use]
    pub fn height(&self) -> u16 {
        self.height
    }

    /// Glyph code per cell, row-major.
    #[must_use]
    pub fn glyph_codes(&self) -> &'a [u8] {
        self.glyphs
    }

    /// RGB triplet per cell, row-major.
    #[must_use]
    pub fn colors(&self) -> &'a [u8] {
        self.colors
    }

    /// Glyph at (x, y).
    #[inline(always)]
    #[must_use]
    pub fn glyph(&self, x: u16, y: u16) -> char {
        self.palette.glyph(self.glyphs[self.index(x, y)])
    }

    /// Colour at (x, y).
    #[inline(always)]
    #[must_use]
    pub fn color(&self, x: u16, y: u16) -> (u8, u8, u8) {
        let i = self.index(x, y) * RGB_BYTES;
        (self.colors[i], self.colors[i + 1], self.colors[i + 2])
    }

    /// Cell at (x, y).
    #[inline(always)]
    #[must_use]
    pub fn get(&self, x: u16, y: u16) -> AsciiCell {
        AsciiCell {
            ch: self.glyph(x, y),
            fg: self.color(x, y),
        }
    }

    /// Row `y` as a string of glyphs, without colour.
    #[must_use]
    pub fn row_text(&self, y: u16) -> String {
        (0..self.width).map(|x| self.glyph(x, y)).collect()
    }

    #[inline(always)]
    fn index(&self, x: u16, y: u16) -> usize {
        debug_assert!(x < self.width && y < self.height, "cell out of bounds");
        usize::from(y) * usize::from(self.width) + usize::from(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_frame_rejects_truncated_buffer() {
        let data = vec![0u8; 10];
        assert!(SourceFrame::new(&data, 2, 2, 6).is_err());
        assert!(SourceFrame::new(&data, 0, 1, 0).is_err());
    }

    #[test]
    fn source_frame_honours_stride_padding() {
        // 2×2, stride 8 : 2 octets de padding par ligne.
        let data = [1, 2, 3, 4, 5, 6, 0, 0, 7, 8, 9, 10, 11, 12];
        let frame = SourceFrame::new(&data, 2, 2, 8).unwrap();
        assert_eq!(frame.pixel(1, 0), [4, 5, 6]);
        assert_eq!(frame.pixel(0, 1), [7, 8, 9]);
    }

    #[test]
    fn clamped_sampling_replicates_edges() {
        let data = [1, 1, 1, 2, 2, 2, 3, 3, 3, 4, 4, 4];
        let frame = SourceFrame::new(&data, 2, 2, 6).unwrap();
        assert_eq!(frame.pixel_clamped(-1, -1), [1, 1, 1]);
        assert_eq!(frame.pixel_clamped(5, -3), [2, 2, 2]);
        assert_eq!(frame.pixel_clamped(-2, 9), [3, 3, 3]);
        assert_eq!(frame.pixel_clamped(2, 2), [4, 4, 4]);
    }

    #[test]
    fn owned_frame_carries_pts() {
        let mut frame = OwnedFrame::new(1, 1);
        frame.pts = Some(0.5);
        assert_eq!(frame.as_source().unwrap().pts(), Some(0.5));
    }

    #[test]
    fn grid_rejects_mismatched_buffers() {
        let palette = GlyphPalette::new();
        assert!(AsciiGrid::new(2, 2, &[0; 4], &[0; 11], &palette).is_err());
    }

    #[test]
    fn grid_reads_cells_row_major() {
        let palette = GlyphPalette::new();
        let a = palette.code_of('a').unwrap();
        let b = palette.code_of('b').unwrap();
        let glyphs = [a, b];
        let colors = [1, 2, 3, 4, 5, 6];
        let grid = AsciiGrid::new(2, 1, &glyphs, &colors, &palette).unwrap();
        assert_eq!(grid.row_text(0), "ab");
        assert_eq!(grid.get(1, 0), AsciiCell { ch: 'b', fg: (4, 5, 6) });
    }
}
