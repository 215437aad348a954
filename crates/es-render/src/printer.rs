use std::io::{self, Write};

use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
use crossterm::terminal::{Clear, ClearType};
use crossterm::{execute, queue};
use es_core::frame::AsciiGrid;

/// Écrit une grille dans le terminal en un seul `write_all`.
///
/// La frame est composée dans un tampon réutilisé : retour du curseur en
/// haut à gauche, puis un SGR truecolor et le glyphe par cellule (ou le
/// glyphe seul sans couleur), un saut de ligne par rangée, reset SGR final.
///
/// # Example
/// ```
/// use es_core::charset::GlyphPalette;
/// use es_core::frame::AsciiGrid;
/// use es_render::printer::TerminalPrinter;
///
/// let palette = GlyphPalette::new();
/// let code = palette.code_of('#').unwrap();
/// let glyphs = [code, code];
/// let colors = [0u8; 6];
/// let grid = AsciiGrid::new(2, 1, &glyphs, &colors, &palette).unwrap();
///
/// let mut printer = TerminalPrinter::new();
/// let bytes = printer.compose(&grid, false).unwrap();
/// assert!(bytes.ends_with(b"##\n"));
/// ```
#[derive(Default)]
pub struct TerminalPrinter {
    buf: Vec<u8>,
}

impl TerminalPrinter {
    /// Create a printer with an empty frame buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the escape-sequence frame for `grid` and return it.
    ///
    /// # Errors
    /// Only fails if formatting into the buffer fails.
    pub fn compose(&mut self, grid: &AsciiGrid<'_>, color: bool) -> io::Result<&[u8]> {
        self.buf.clear();
        // ~20 octets par cellule colorée (SGR + glyphe UTF-8).
        let per_cell = if color { 20 } else { 2 };
        self.buf
            .reserve(usize::from(grid.width()) * usize::from(grid.height()) * per_cell + 16);

        queue!(self.buf, MoveTo(0, 0))?;
        for y in 0..grid.height() {
            for x in 0..grid.width() {
                let cell = grid.get(x, y);
                if color {
                    let (r, g, b) = cell.fg;
                    queue!(
                        self.buf,
                        SetForegroundColor(Color::Rgb { r, g, b }),
                        Print(cell.ch)
                    )?;
                } else {
                    queue!(self.buf, Print(cell.ch))?;
                }
            }
            self.buf.push(b'\n');
        }
        if color {
            queue!(self.buf, ResetColor)?;
        }
        Ok(&self.buf)
    }

    /// Compose `grid` and write it to `out` in one call, then flush.
    ///
    /// # Errors
    /// Returns any I/O error from `out`.
    pub fn present<W: Write>(&mut self, out: &mut W, grid: &AsciiGrid<'_>, color: bool) -> io::Result<()> {
        self.compose(grid, color)?;
        out.write_all(&self.buf)?;
        out.flush()
    }
}

/// Efface l'écran (après un redimensionnement de la grille).
///
/// # Errors
/// Returns any I/O error from `out`.
pub fn clear_screen<W: Write>(out: &mut W) -> io::Result<()> {
    execute!(out, Clear(ClearType::All), MoveTo(0, 0))
}

/// Cache le curseur pour la durée de vie du guard, le restaure au drop.
pub struct CursorGuard {
    _private: (),
}

impl CursorGuard {
    /// Hide the cursor on stdout.
    ///
    /// # Errors
    /// Returns an error if the escape sequence cannot be written.
    pub fn hide() -> io::Result<Self> {
        execute!(io::stdout(), Hide)?;
        Ok(Self { _private: () })
    }
}

impl Drop for CursorGuard {
    fn drop(&mut self) {
        if let Err(e) = execute!(io::stdout(), Show) {
            log::warn!("Impossible de restaurer le curseur : {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use es_core::charset::GlyphPalette;

    fn two_cells<'a>(palette: &'a GlyphPalette, glyphs: &'a [u8; 2], colors: &'a [u8; 6]) -> AsciiGrid<'a> {
        AsciiGrid::new(2, 1, glyphs, colors, palette).unwrap()
    }

    #[test]
    fn plain_frame_is_home_then_glyphs() {
        let palette = GlyphPalette::new();
        let glyphs = [palette.code_of('/').unwrap(), palette.code_of('¦').unwrap()];
        let colors = [0u8; 6];
        let grid = two_cells(&palette, &glyphs, &colors);
        let mut printer = TerminalPrinter::new();
        let bytes = printer.compose(&grid, false).unwrap();
        assert_eq!(bytes, "\x1b[1;1H/¦\n".as_bytes());
    }

    #[test]
    fn color_frame_emits_truecolor_per_cell_and_resets() {
        let palette = GlyphPalette::new();
        let a = palette.code_of('a').unwrap();
        let glyphs = [a, a];
        let colors = [1, 2, 3, 250, 251, 252];
        let grid = two_cells(&palette, &glyphs, &colors);
        let mut printer = TerminalPrinter::new();
        let text = String::from_utf8(printer.compose(&grid, true).unwrap().to_vec()).unwrap();
        assert!(text.starts_with("\x1b[1;1H"));
        assert!(text.contains("\x1b[38;2;1;2;3ma"));
        assert!(text.contains("\x1b[38;2;250;251;252ma"));
        assert!(text.ends_with("\n\x1b[0m"));
    }

    #[test]
    fn buffer_is_reused_between_frames() {
        let palette = GlyphPalette::new();
        let glyphs = [0u8, 0];
        let colors = [9u8; 6];
        let grid = two_cells(&palette, &glyphs, &colors);
        let mut printer = TerminalPrinter::new();
        let first = printer.compose(&grid, true).unwrap().to_vec();
        let second = printer.compose(&grid, true).unwrap().to_vec();
        assert_eq!(first, second);
    }

    #[test]
    fn present_writes_whole_frame() {
        let palette = GlyphPalette::new();
        let glyphs = [0u8, 0];
        let colors = [0u8; 6];
        let grid = two_cells(&palette, &glyphs, &colors);
        let mut printer = TerminalPrinter::new();
        let mut out = Vec::new();
        printer.present(&mut out, &grid, false).unwrap();
        assert_eq!(out, printer.compose(&grid, false).unwrap());
    }
}
