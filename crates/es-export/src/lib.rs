//! Sorties fichier : police 8×8, rasterisation de la grille, PNG et MP4.
pub mod font;
pub mod muxer;
pub mod png;
pub mod rasterizer;

pub use muxer::{EncoderSettings, Mp4Muxer};
pub use rasterizer::{ColorGrading, Rasterizer};
