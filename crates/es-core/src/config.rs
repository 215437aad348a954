use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::arena::align_up;
use crate::frame::RGB_BYTES;

/// Côté d'une cellule rasterisée, en pixels.
pub const CELL_PX: usize = 8;

/// Configuration complète du moteur.
///
/// Sérialisable en TOML. Chaque champ a une valeur par défaut saine.
///
/// # Example
/// ```
/// use es_core::config::EngineConfig;
/// let config = EngineConfig::default();
/// assert_eq!(config.grid_width, 120);
/// assert!((config.edge_strength - 0.4).abs() < f32::EPSILON);
/// ```
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct EngineConfig {
    // === Grille ===
    /// Largeur de la grille en cellules.
    pub grid_width: u16,
    /// Hauteur de la grille en cellules. 0 = déduite du ratio de la source.
    pub grid_height: u16,
    /// Correction du ratio des cellules (0.5 pour un terminal, 1.0 pour un fichier).
    pub aspect_correction: f32,

    // === Classification ===
    /// Seuil de contour : une cellule est plate si `mag² < edge_strength²`.
    pub edge_strength: f32,

    // === Couleur ===
    /// Facteur de luminosité appliqué à la rasterisation.
    pub brightness: f32,
    /// Facteur de saturation appliqué à la rasterisation, avant la luminosité. 1.0 = neutre.
    pub saturation: f32,
    /// Activer la couleur truecolor dans le terminal.
    pub color_enabled: bool,

    // === Performance ===
    /// Nombre de workers. 0 = nombre de cœurs logiques.
    pub num_threads: usize,

    // === Encodage ===
    /// Constant Rate Factor H.264 (0-51, plus bas = meilleur).
    pub crf: u8,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            grid_width: 120,
            grid_height: 0,
            aspect_correction: 0.5,
            edge_strength: 0.4,
            brightness: 1.0,
            saturation: 1.0,
            color_enabled: true,
            num_threads: 0,
            crf: 23,
        }
    }
}

impl EngineConfig {
    /// Clamp all numeric fields to their valid ranges.
    /// Called after TOML deserialization to prevent out-of-range values.
    pub fn clamp_all(&mut self) {
        self.grid_width = self.grid_width.max(1);
        self.aspect_correction = self.aspect_correction.clamp(0.05, 4.0);
        self.edge_strength = self.edge_strength.clamp(0.0, 8.0);
        self.brightness = self.brightness.clamp(0.0, 8.0);
        self.saturation = self.saturation.clamp(0.0, 8.0);
        self.num_threads = self.num_threads.min(1024);
        self.crf = self.crf.min(51);
    }

    /// Resolve the worker count: explicit value, or detected logical cores, never below 1.
    ///
    /// # Example
    /// ```
    /// use es_core::config::EngineConfig;
    /// let config = EngineConfig { num_threads: 3, ..EngineConfig::default() };
    /// assert_eq!(config.worker_count(), 3);
    /// assert!(EngineConfig::default().worker_count() >= 1);
    /// ```
    #[must_use]
    pub fn worker_count(&self) -> usize {
        if self.num_threads > 0 {
            self.num_threads
        } else {
            std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
        }
    }

    /// Grid dimensions for a source of `width × height` pixels.
    ///
    /// Height, when not fixed, is `floor(grid_width / (width/height) · aspect_correction)`.
    ///
    /// # Example
    /// ```
    /// use es_core::config::EngineConfig;
    /// let config = EngineConfig { grid_width: 120, aspect_correction: 0.5, ..EngineConfig::default() };
    /// assert_eq!(config.grid_for_source(1920, 1080), (120, 33));
    /// ```
    #[must_use]
    pub fn grid_for_source(&self, width: u32, height: u32) -> (u16, u16) {
        let w = self.grid_width.max(1);
        if self.grid_height > 0 {
            return (w, self.grid_height);
        }
        let aspect = if height == 0 {
            16.0 / 9.0
        } else {
            width as f32 / height as f32
        };
        let h = (f32::from(w) / aspect * self.aspect_correction)
            .floor()
            .clamp(1.0, f32::from(u16::MAX));
        (w, h as u16)
    }
}

/// Taille de l'arena nécessaire pour une grille `width × height`.
///
/// Glyphes (W·H) + couleurs (3·W·H), plus le tampon RGB rasterisé
/// (8·W × 8·H × 3) si une sortie fichier est demandée.
///
/// # Example
/// ```
/// use es_core::config::arena_bytes_for;
/// assert_eq!(arena_bytes_for(2, 2, false), 16 + 16);
/// assert_eq!(arena_bytes_for(2, 2, true), 16 + 16 + 768);
/// ```
#[must_use]
pub fn arena_bytes_for(width: u16, height: u16, raster: bool) -> usize {
    let cells = usize::from(width) * usize::from(height);
    let mut total = align_up(cells) + align_up(cells * RGB_BYTES);
    if raster {
        total += align_up(cells * CELL_PX * CELL_PX * RGB_BYTES);
    }
    total
}

/// Structure TOML intermédiaire pour désérialisation avec valeurs optionnelles.
#[derive(Deserialize)]
struct ConfigFile {
    engine: EngineSection,
}

/// Engine section of the TOML config, all fields optional for partial override.
#[derive(Deserialize)]
struct EngineSection {
    grid_width: Option<u16>,
    grid_height: Option<u16>,
    aspect_correction: Option<f32>,
    edge_strength: Option<f32>,
    brightness: Option<f32>,
    saturation: Option<f32>,
    color_enabled: Option<bool>,
    num_threads: Option<usize>,
    crf: Option<u8>,
}

/// Parse a TOML document and merge it over the defaults.
///
/// # Errors
/// Returns an error if the document is not valid TOML or lacks an `[engine]` table.
///
/// # Example
/// ```
/// use es_core::config::parse_config;
/// let config = parse_config("[engine]\nedge_strength = 0.25\n").unwrap();
/// assert!((config.edge_strength - 0.25).abs() < f32::EPSILON);
/// assert_eq!(config.grid_width, 120);
/// ```
pub fn parse_config(content: &str) -> Result<EngineConfig> {
    let file: ConfigFile = toml::from_str(content).context("Erreur de parsing TOML")?;

    let mut config = EngineConfig::default();
    let e = file.engine;
    if let Some(v) = e.grid_width {
        config.grid_width = v;
    }
    if let Some(v) = e.grid_height {
        config.grid_height = v;
    }
    if let Some(v) = e.aspect_correction {
        config.aspect_correction = v;
    }
    if let Some(v) = e.edge_strength {
        config.edge_strength = v;
    }
    if let Some(v) = e.brightness {
        config.brightness = v;
    }
    if let Some(v) = e.saturation {
        config.saturation = v;
    }
    if let Some(v) = e.color_enabled {
        config.color_enabled = v;
    }
    if let Some(v) = e.num_threads {
        config.num_threads = v;
    }
    if let Some(v) = e.crf {
        config.crf = v;
    }

    config.clamp_all();
    Ok(config)
}

/// Charge un fichier TOML et fusionne avec les valeurs par défaut.
///
/// # Errors
/// Returns an error if the file cannot be read or parsed.
///
/// # Example
/// ```no_run
/// use es_core::config::load_config;
/// use std::path::Path;
/// let config = load_config(Path::new("config/default.toml")).unwrap();
/// ```
pub fn load_config(path: &Path) -> Result<EngineConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Impossible de lire {}", path.display()))?;
    parse_config(&content).with_context(|| format!("Configuration invalide : {}", path.display()))
}
