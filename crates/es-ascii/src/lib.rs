//! Moteur de transcription pour edgescii.
//!
//! Classe chaque cellule de la grille par gradient de Sobel, en parallèle
//! sur des tranches de lignes disjointes.
pub mod edge;
pub mod engine;
pub mod scheduler;

pub use engine::{Engine, RasterTarget};
