/// Taille de grille qui remplit le terminal en conservant le ratio de la source.
///
/// `source_aspect` = largeur / hauteur en pixels ; `aspect_correction`
/// compense les cellules plus hautes que larges (0.5 typiquement).
/// Une ligne est laissée libre quand la hauteur est la contrainte, pour éviter le défilement.
///
/// # Example
/// ```
/// use es_render::fit::fit_to_terminal;
/// assert_eq!(fit_to_terminal(200, 50, 16.0 / 9.0, 0.5), (174, 49));
/// assert_eq!(fit_to_terminal(80, 50, 16.0 / 9.0, 0.5), (80, 22));
/// ```
#[must_use]
pub fn fit_to_terminal(cols: u16, rows: u16, source_aspect: f32, aspect_correction: f32) -> (u16, u16) {
    let cols = cols.max(1);
    let rows = rows.max(1);
    let correction = if aspect_correction > 0.0 { aspect_correction } else { 1.0 };
    let corrected = if source_aspect.is_finite() && source_aspect > 0.0 {
        source_aspect / correction
    } else {
        1.0 / correction
    };
    let terminal_aspect = f32::from(cols) / f32::from(rows);

    let (w, h) = if terminal_aspect > corrected {
        let h = f32::from(rows.saturating_sub(1).max(1));
        ((h * corrected).floor(), h)
    } else {
        let w = f32::from(cols);
        (w, (w / corrected).floor())
    };
    (to_cells(w), to_cells(h))
}

fn to_cells(v: f32) -> u16 {
    v.clamp(1.0, f32::from(u16::MAX)) as u16
}

/// Current terminal size in cells, if stdout is a terminal.
#[must_use]
pub fn terminal_size() -> Option<(u16, u16)> {
    match crossterm::terminal::size() {
        Ok((cols, rows)) if cols > 0 && rows > 0 => Some((cols, rows)),
        Ok(_) => None,
        Err(e) => {
            log::debug!("Taille du terminal indisponible : {e}");
            None
        }
    }
}
