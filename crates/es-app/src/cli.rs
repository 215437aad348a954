use std::path::PathBuf;

use clap::Parser;
use es_core::config::EngineConfig;

/// edgescii: Sobel-driven ASCII art for images and video.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Fichier source : image (PNG, JPEG, BMP) ou vidéo (MP4, MKV, AVI, MOV, GIF animé).
    pub input: PathBuf,

    /// Largeur de la grille en caractères.
    #[arg(long)]
    pub width: Option<u16>,

    /// Hauteur de la grille en caractères. Défaut : déduite du ratio de la source.
    #[arg(long)]
    pub height: Option<u16>,

    /// Seuil de détection de contour (ex: 0.4).
    #[arg(long)]
    pub edge: Option<f32>,

    /// Écrire dans un fichier (PNG pour une image, MP4 pour une vidéo) au lieu du terminal.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Ajuster la grille à la taille du terminal.
    #[arg(long, default_value_t = false)]
    pub fit_terminal: bool,

    /// Facteur de luminosité (ex: 1.5).
    #[arg(long)]
    pub brightness: Option<f32>,

    /// Facteur de saturation (1.0 = neutre).
    #[arg(long)]
    pub saturate: Option<f32>,

    /// Nombre de workers (0 = auto).
    #[arg(long)]
    pub threads: Option<usize>,

    /// Qualité vidéo (Constant Rate Factor, 0-51, plus bas = meilleur).
    #[arg(long)]
    pub crf: Option<u8>,

    /// Désactiver la couleur.
    #[arg(long, default_value_t = false)]
    pub no_color: bool,

    /// Fichier de configuration TOML. Défaut : config/default.toml.
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: PathBuf,

    /// Niveau de log : error, warn, info, debug, trace.
    #[arg(long, default_value = "warn")]
    pub log_level: String,
}

impl Cli {
    /// Apply command-line overrides on top of a loaded configuration.
    ///
    /// File outputs use square 8×8 cells, so aspect correction is forced to 1.0.
    pub fn apply_overrides(&self, config: &mut EngineConfig) {
        if let Some(w) = self.width {
            config.grid_width = w;
        }
        if let Some(h) = self.height {
            config.grid_height = h;
        }
        if let Some(edge) = self.edge {
            config.edge_strength = edge;
        }
        if let Some(b) = self.brightness {
            config.brightness = b;
        }
        if let Some(s) = self.saturate {
            config.saturation = s;
        }
        if let Some(t) = self.threads {
            config.num_threads = t;
        }
        if let Some(crf) = self.crf {
            config.crf = crf;
        }
        if self.no_color {
            config.color_enabled = false;
        }
        if self.output.is_some() {
            config.aspect_correction = 1.0;
        }
        config.clamp_all();
    }
}
