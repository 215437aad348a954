use crate::charset::{GlyphPalette, Orientation};

/// Exposant appliqué à la luminance linéaire (gamma 2.2 inversé).
pub const GAMMA_EXPONENT: f64 = 1.0 / 2.2;

/// Lookup table luma linéaire → indice de luminosité perceptuelle.
///
/// `lut[i] = round(255 · (i/255)^(1/2.2))`. Calculée une fois, partagée en lecture seule.
///
/// # Example
/// ```
/// use es_core::lut::GammaLut;
/// let lut = GammaLut::new();
/// assert_eq!(lut.apply(0), 0);
/// assert_eq!(lut.apply(255), 255);
/// assert_eq!(lut.apply(128), 186);
/// ```
#[derive(Clone, Debug)]
pub struct GammaLut {
    table: [u8; 256],
}

impl GammaLut {
    /// Build the 256-entry gamma curve.
    #[must_use]
    pub fn new() -> Self {
        let mut table = [0u8; 256];
        for (i, slot) in table.iter_mut().enumerate() {
            let linear = i as f64 / 255.0;
            *slot = (255.0 * linear.powf(GAMMA_EXPONENT)).round().clamp(0.0, 255.0) as u8;
        }
        Self { table }
    }

    /// Map a linear luma byte to its brightness index.
    #[inline(always)]
    #[must_use]
    pub fn apply(&self, luma: u8) -> u8 {
        self.table[usize::from(luma)]
    }

    /// Raw table, for inspection.
    #[must_use]
    pub fn table(&self) -> &[u8; 256] {
        &self.table
    }
}

impl Default for GammaLut {
    fn default() -> Self {
        Self::new()
    }
}

/// Toutes les tables précalculées du classifieur : courbe gamma + cinq rampes.
///
/// Chaque rampe est dépliée en 256 codes de glyphe :
/// `ramp[floor(b/255 · (len-1))]`, en arithmétique entière.
///
/// # Example
/// ```
/// use es_core::charset::{Orientation, RAMP_FLAT};
/// use es_core::lut::LutSet;
/// let luts = LutSet::new();
/// let code = luts.glyph_code(Orientation::Flat, 255);
/// assert_eq!(luts.palette().glyph(code), RAMP_FLAT[89]);
/// ```
#[derive(Clone, Debug)]
pub struct LutSet {
    gamma: GammaLut,
    palette: GlyphPalette,
    ramps: [[u8; 256]; 5],
}

impl LutSet {
    /// Build the gamma curve and the five orientation ramps.
    #[must_use]
    pub fn new() -> Self {
        let palette = GlyphPalette::new();
        let mut ramps = [[0u8; 256]; 5];
        for orientation in Orientation::ALL {
            let ramp = orientation.ramp();
            let last = ramp.len() - 1;
            for (b, slot) in ramps[orientation.index()].iter_mut().enumerate() {
                let ch = ramp[b * last / 255];
                *slot = palette.code_of(ch).unwrap_or(0);
            }
        }
        Self {
            gamma: GammaLut::new(),
            palette,
            ramps,
        }
    }

    /// The gamma curve.
    #[must_use]
    pub fn gamma(&self) -> &GammaLut {
        &self.gamma
    }

    /// Glyph codes → display glyphs.
    #[must_use]
    pub fn palette(&self) -> &GlyphPalette {
        &self.palette
    }

    /// Glyph code for a brightness index in a given orientation class.
    #[inline(always)]
    #[must_use]
    pub fn glyph_code(&self, orientation: Orientation, brightness: u8) -> u8 {
        self.ramps[orientation.index()][usize::from(brightness)]
    }

    /// Display glyph for a brightness index in a given orientation class.
    #[must_use]
    pub fn glyph(&self, orientation: Orientation, brightness: u8) -> char {
        self.palette.glyph(self.glyph_code(orientation, brightness))
    }
}

impl Default for LutSet {
    fn default() -> Self {
        Self::new()
    }
}
