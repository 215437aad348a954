/// Terminal output for edgescii.
///
/// Writes glyph grids as truecolor text and sizes the grid to the terminal.
pub mod fit;
pub mod printer;

pub use fit::fit_to_terminal;
pub use printer::{CursorGuard, TerminalPrinter};
