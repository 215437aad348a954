use std::path::Path;

use anyhow::{Context, Result};
use es_core::frame::OwnedFrame;
use es_core::traits::FrameSource;

/// Source d'image statique. Livre une seule frame RGB24.
///
/// # Example
/// ```no_run
/// use es_source::image::ImageSource;
/// use std::path::Path;
/// let source = ImageSource::new(Path::new("test.png")).unwrap();
/// ```
pub struct ImageSource {
    frame: Option<OwnedFrame>,
    size: (u32, u32),
}

impl ImageSource {
    /// Load an image from disk and create a source.
    ///
    /// # Errors
    /// Returns an error if the image cannot be loaded.
    pub fn new(path: &Path) -> Result<Self> {
        let frame = load_image(path)?;
        let size = (frame.width, frame.height);
        log::info!("Image chargée : {}x{} depuis {}", size.0, size.1, path.display());
        Ok(Self {
            frame: Some(frame),
            size,
        })
    }
}

impl FrameSource for ImageSource {
    fn next_frame(&mut self) -> Option<OwnedFrame> {
        self.frame.take()
    }

    fn native_size(&self) -> (u32, u32) {
        self.size
    }

    fn frame_rate(&self) -> Option<f64> {
        None
    }
}

/// Décode une image (PNG, JPEG, BMP, GIF) en RGB24 packé, stride = largeur · 3.
///
/// # Errors
/// Returns an error if the image cannot be loaded or is empty.
pub fn load_image(path: &Path) -> Result<OwnedFrame> {
    if !path.exists() {
        return Err(es_core::CoreError::FileNotFound {
            path: path.display().to_string(),
        }
        .into());
    }
    let img = image::open(path)
        .with_context(|| format!("Impossible de charger {}", path.display()))?;
    let rgb = img.to_rgb8();
    let (width, height) = rgb.dimensions();
    if width == 0 || height == 0 {
        return Err(es_core::CoreError::InvalidDimensions { width, height }.into());
    }
    Ok(OwnedFrame {
        data: rgb.into_raw(),
        width,
        height,
        pts: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn png_decodes_to_packed_rgb() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("px.png");
        let mut img = image::RgbaImage::new(3, 2);
        img.put_pixel(2, 1, image::Rgba([9, 8, 7, 0]));
        img.save(&path).unwrap();

        let mut source = ImageSource::new(&path).unwrap();
        assert_eq!(source.native_size(), (3, 2));
        assert_eq!(source.frame_rate(), None);
        let frame = source.next_frame().unwrap();
        assert_eq!(frame.data.len(), 3 * 2 * 3);
        assert_eq!(&frame.data[15..18], &[9, 8, 7]);
        assert!(source.next_frame().is_none());
    }

    #[test]
    fn missing_file_is_reported() {
        let err = load_image(Path::new("/nonexistent/edgescii.png")).unwrap_err();
        assert!(err.downcast_ref::<es_core::CoreError>().is_some());
    }

    #[test]
    fn still_image_uses_default_delay() {
        let source = ImageSource {
            frame: None,
            size: (1, 1),
        };
        assert_eq!(source.frame_delay(), std::time::Duration::from_secs_f64(1.0 / 24.0));
    }
}
