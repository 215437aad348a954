/// Configuration, types, and shared structures for edgescii.
///
/// This crate contains the frame arena, glyph ramps, lookup tables and
/// every type shared across the edgescii workspace.

pub mod arena;
pub mod charset;
pub mod config;
pub mod error;
pub mod frame;
pub mod lut;
pub mod traits;

pub use arena::{ArenaSlice, FrameArena};
pub use charset::{GlyphPalette, Orientation};
pub use config::EngineConfig;
pub use error::CoreError;
pub use frame::{AsciiCell, AsciiGrid, OwnedFrame, SourceFrame};
pub use lut::{GammaLut, LutSet};
