/// 90 glyphes, du plus clair au plus dense. Zones sans contour.
pub const RAMP_FLAT: &[char] = &[
    '`', '.', '-', '\'', ':', '_', ',', '^', '=', ';', '>', '<', '+', '!', 'r', 'c', '*', '/', 'z',
    '?', 's', 'L', 'T', 'v', ')', 'J', '7', '(', '|', 'F', 'i', '{', 'C', '}', 'f', 'I', '3', '1',
    't', 'l', 'u', '[', 'n', 'e', 'o', 'Z', '5', 'Y', 'x', 'j', 'y', 'a', ']', '2', 'E', 'S', 'w',
    'q', 'k', 'P', '6', 'h', '9', 'd', '4', 'V', 'p', 'O', 'G', 'b', 'U', 'A', 'K', 'X', 'H', 'm',
    '8', 'R', 'D', '#', '$', 'B', 'g', '0', 'M', 'N', 'W', 'Q', '%', '&',
];

/// Contour à gradient vertical.
pub const RAMP_VERTICAL: &[char] = &['|', '¦'];

/// Contour à gradient horizontal.
pub const RAMP_HORIZONTAL: &[char] = &['-', '='];

/// Diagonale, `gx·gy > 0`.
pub const RAMP_DIAG1: &[char] = &['\\', '_'];

/// Diagonale, `gx·gy ≤ 0`.
pub const RAMP_DIAG2: &[char] = &['/', '_'];

/// Classe d'orientation d'une cellule, issue du gradient de Sobel.
///
/// # Example
/// ```
/// use es_core::charset::Orientation;
/// assert_eq!(Orientation::Flat.ramp().len(), 90);
/// assert_eq!(Orientation::Vertical.ramp().len(), 2);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Orientation {
    /// No significant edge.
    Flat,
    /// Gradient dominated by `gy`.
    Vertical,
    /// Gradient dominated by `gx`.
    Horizontal,
    /// Diagonal edge with `gx·gy > 0`.
    Diag1,
    /// Any other diagonal edge.
    Diag2,
}

impl Orientation {
    /// Every class, in ramp-table order.
    pub const ALL: [Orientation; 5] = [
        Orientation::Flat,
        Orientation::Vertical,
        Orientation::Horizontal,
        Orientation::Diag1,
        Orientation::Diag2,
    ];

    /// The glyph ramp for this class, darkest first.
    #[must_use]
    pub fn ramp(self) -> &'static [char] {
        match self {
            Orientation::Flat => RAMP_FLAT,
            Orientation::Vertical => RAMP_VERTICAL,
            Orientation::Horizontal => RAMP_HORIZONTAL,
            Orientation::Diag1 => RAMP_DIAG1,
            Orientation::Diag2 => RAMP_DIAG2,
        }
    }

    /// Position in [`Orientation::ALL`].
    #[inline(always)]
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Table des glyphes distincts de toutes les rampes.
///
/// La grille stocke un code `u8` par cellule ; ce code indexe cette table.
/// Les glyphes restent des unités opaques (`char`), jamais découpés en octets.
///
/// # Example
/// ```
/// use es_core::charset::GlyphPalette;
/// let palette = GlyphPalette::new();
/// let code = palette.code_of('¦').unwrap();
/// assert_eq!(palette.glyph(code), '¦');
/// ```
#[derive(Clone, Debug)]
pub struct GlyphPalette {
    glyphs: Vec<char>,
}

impl GlyphPalette {
    /// Collect the distinct glyphs of every ramp, in first-seen order.
    #[must_use]
    pub fn new() -> Self {
        let mut glyphs: Vec<char> = Vec::with_capacity(RAMP_FLAT.len() + 8);
        for orientation in Orientation::ALL {
            for &ch in orientation.ramp() {
                if !glyphs.contains(&ch) {
                    glyphs.push(ch);
                }
            }
        }
        debug_assert!(glyphs.len() <= usize::from(u8::MAX) + 1);
        Self { glyphs }
    }

    /// Code for `ch`, if it belongs to a ramp.
    #[must_use]
    pub fn code_of(&self, ch: char) -> Option<u8> {
        self.glyphs.iter().position(|&g| g == ch).map(|i| i as u8)
    }

    /// Glyph for `code`. Unknown codes render as a space.
    #[inline(always)]
    #[must_use]
    pub fn glyph(&self, code: u8) -> char {
        self.glyphs.get(usize::from(code)).copied().unwrap_or(' ')
    }

    /// Number of distinct glyphs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    /// Always false once built.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }
}

impl Default for GlyphPalette {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ramps_have_expected_lengths() {
        assert_eq!(RAMP_FLAT.len(), 90);
        for o in &Orientation::ALL[1..] {
            assert_eq!(o.ramp().len(), 2);
        }
    }

    #[test]
    fn palette_deduplicates_shared_glyphs() {
        let palette = GlyphPalette::new();
        // Les rampes directionnelles partagent '|', '-', '=', '_' et '/' avec la rampe plate.
        let mut all: Vec<char> = Orientation::ALL
            .iter()
            .flat_map(|o| o.ramp().iter().copied())
            .collect();
        all.sort_unstable();
        all.dedup();
        assert_eq!(palette.len(), all.len());
        for ch in all {
            let code = palette.code_of(ch).unwrap();
            assert_eq!(palette.glyph(code), ch);
        }
    }

    #[test]
    fn unknown_code_is_space() {
        let palette = GlyphPalette::new();
        assert_eq!(palette.glyph(u8::MAX), ' ');
    }
}
