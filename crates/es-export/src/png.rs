use std::path::Path;

use anyhow::{Context, Result};
use image::ExtendedColorType;

/// Écrit un tampon RGB24 en PNG.
///
/// # Errors
/// Returns an error if the buffer does not match the dimensions or the file
/// cannot be written.
///
/// # Example
/// ```no_run
/// use es_export::png::write_png;
/// use std::path::Path;
/// write_png(Path::new("out.png"), &[0u8; 8 * 8 * 3], 8, 8).unwrap();
/// ```
pub fn write_png(path: &Path, rgb: &[u8], width: u32, height: u32) -> Result<()> {
    let expected = width as usize * height as usize * 3;
    if rgb.len() != expected {
        anyhow::bail!(
            "Tampon de {} octets pour une image {width}x{height} (attendu {expected})",
            rgb.len()
        );
    }
    image::save_buffer_with_format(
        path,
        rgb,
        width,
        height,
        ExtendedColorType::Rgb8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("Impossible d'écrire {}", path.display()))?;
    log::info!("PNG écrit : {} ({width}x{height})", path.display());
    Ok(())
}
