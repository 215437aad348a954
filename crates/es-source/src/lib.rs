//! Sources de frames pour edgescii : image fixe, vidéo et GIF animé via ffmpeg.

use std::path::Path;

pub mod image;
pub mod video;

/// Extensions décodées par le pipe ffmpeg plutôt que par le crate `image`.
pub const ANIMATED_EXTENSIONS: [&str; 5] = ["mp4", "mkv", "avi", "mov", "gif"];

/// True if `path` should be read as a frame stream (video or animated GIF).
///
/// # Example
/// ```
/// use es_source::is_animated_file;
/// use std::path::Path;
/// assert!(is_animated_file(Path::new("clip.MKV")));
/// assert!(!is_animated_file(Path::new("photo.png")));
/// ```
#[must_use]
pub fn is_animated_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            ANIMATED_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}
