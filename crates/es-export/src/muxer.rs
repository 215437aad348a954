use anyhow::{Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

/// Au-delà de ces dimensions, H.264 sort des niveaux courants.
pub const MAX_H264_DIMENSIONS: (u32, u32) = (7680, 4320);

/// Paramètres d'encodage d'une sortie MP4.
#[derive(Clone, Debug)]
pub struct EncoderSettings {
    /// Raster width in pixels.
    pub width: u32,
    /// Raster height in pixels.
    pub height: u32,
    /// Frames per second of the input stream.
    pub fps: f64,
    /// Constant Rate Factor (0-51).
    pub crf: u8,
    /// Source whose first audio stream is copied into the output, if any.
    pub audio_source: Option<PathBuf>,
}

/// Arguments ffmpeg : RGB24 brut sur stdin → H.264 yuv420p, audio copié sans réencodage.
///
/// # Example
/// ```
/// use es_export::muxer::{encoder_args, EncoderSettings};
/// use std::path::Path;
/// let settings = EncoderSettings { width: 960, height: 544, fps: 25.0, crf: 23, audio_source: None };
/// let args = encoder_args(&settings, Path::new("out.mp4"));
/// assert!(args.windows(2).any(|w| w[0] == "-crf" && w[1] == "23"));
/// assert!(!args.iter().any(|a| a == "-c:a"));
/// ```
#[must_use]
pub fn encoder_args(settings: &EncoderSettings, output: &Path) -> Vec<String> {
    let mut args: Vec<String> = [
        "-y",
        "-f",
        "rawvideo",
        "-vcodec",
        "rawvideo",
        "-pix_fmt",
        "rgb24",
    ]
    .iter()
    .map(ToString::to_string)
    .collect();
    args.extend([
        "-s".to_string(),
        format!("{}x{}", settings.width, settings.height),
        "-r".to_string(),
        format!("{}", settings.fps),
        "-i".to_string(),
        "-".to_string(),
    ]);

    if let Some(audio) = &settings.audio_source {
        args.extend([
            "-i".to_string(),
            audio.display().to_string(),
            "-map".to_string(),
            "0:v:0".to_string(),
            "-map".to_string(),
            "1:a:0".to_string(),
            "-c:a".to_string(),
            "copy".to_string(),
            "-shortest".to_string(),
        ]);
    }

    args.extend(
        [
            "-c:v",
            "libx264",
            "-preset",
            "medium",
            "-crf",
        ]
        .iter()
        .map(ToString::to_string),
    );
    args.push(settings.crf.to_string());
    args.extend(
        [
            "-level",
            "6.2",
            "-pix_fmt",
            "yuv420p",
            "-hide_banner",
            "-loglevel",
            "error",
        ]
        .iter()
        .map(ToString::to_string),
    );
    args.push(output.display().to_string());
    args
}

/// Encode des frames RGB24 dans un fichier MP4 via un sous-processus ffmpeg.
pub struct Mp4Muxer {
    ffmpeg_child: Child,
    frame_bytes: usize,
    frames: u64,
}

impl Mp4Muxer {
    /// Démarre l'encodeur.
    ///
    /// # Errors
    /// Retourne une erreur si ffmpeg n'est pas installé ou impossible à démarrer.
    pub fn new(output_path: &Path, settings: &EncoderSettings) -> Result<Self> {
        let (max_w, max_h) = MAX_H264_DIMENSIONS;
        if settings.width > max_w || settings.height > max_h {
            log::warn!(
                "Sortie {}x{} au-delà de {max_w}x{max_h} : l'encodage H.264 peut échouer",
                settings.width,
                settings.height
            );
        }

        let child = Command::new("ffmpeg")
            .args(encoder_args(settings, output_path))
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .context(
                "Échec de l'initialisation de l'encodeur Video ffmpeg. (Est-il dans PATH ?)",
            )?;

        log::info!(
            "Encodeur MP4 : {}x{} @ {} fps, crf {}, audio {}",
            settings.width,
            settings.height,
            settings.fps,
            settings.crf,
            if settings.audio_source.is_some() { "copié" } else { "absent" }
        );

        Ok(Self {
            ffmpeg_child: child,
            frame_bytes: settings.width as usize * settings.height as usize * 3,
            frames: 0,
        })
    }

    /// Pousse une frame RGB24 dans le flux.
    ///
    /// # Errors
    /// Retourne une erreur si la taille est incorrecte ou si l'écriture dans le pipe échoue.
    pub fn write_frame(&mut self, rgb: &[u8]) -> Result<()> {
        if rgb.len() != self.frame_bytes {
            anyhow::bail!(
                "Frame de {} octets, l'encodeur attend {}",
                rgb.len(),
                self.frame_bytes
            );
        }
        let stdin = self
            .ffmpeg_child
            .stdin
            .as_mut()
            .context("stdin ffmpeg déjà fermé")?;
        stdin
            .write_all(rgb)
            .context("Écriture dans le pipe ffmpeg impossible")?;
        self.frames += 1;
        Ok(())
    }

    /// Frames written so far.
    #[must_use]
    pub fn frames_written(&self) -> u64 {
        self.frames
    }

    /// Ferme le flux et finalise l'exportation.
    ///
    /// # Errors
    /// Retourne une erreur si ffmpeg signale une erreur de terminaison.
    pub fn finish(mut self) -> Result<()> {
        drop(self.ffmpeg_child.stdin.take());

        let output = self.ffmpeg_child.wait_with_output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("ffmpeg encoder error: {stderr}");
        }
        log::info!("Encodage terminé : {} frames", self.frames);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(audio: Option<&str>) -> EncoderSettings {
        EncoderSettings {
            width: 64,
            height: 48,
            fps: 30.0,
            crf: 18,
            audio_source: audio.map(PathBuf::from),
        }
    }

    fn value_after<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
        args.windows(2)
            .find(|w| w[0] == flag)
            .map(|w| w[1].as_str())
    }

    #[test]
    fn video_args_follow_h264_profile() {
        let args = encoder_args(&settings(None), Path::new("out.mp4"));
        assert_eq!(value_after(&args, "-s"), Some("64x48"));
        assert_eq!(value_after(&args, "-c:v"), Some("libx264"));
        assert_eq!(value_after(&args, "-preset"), Some("medium"));
        assert_eq!(value_after(&args, "-crf"), Some("18"));
        assert_eq!(value_after(&args, "-level"), Some("6.2"));
        assert_eq!(args.last().map(String::as_str), Some("out.mp4"));
        // Le premier -pix_fmt décrit l'entrée, le second la sortie.
        let formats: Vec<_> = args
            .windows(2)
            .filter(|w| w[0] == "-pix_fmt")
            .map(|w| w[1].as_str())
            .collect();
        assert_eq!(formats, vec!["rgb24", "yuv420p"]);
    }

    #[test]
    fn audio_is_copied_from_source() {
        let args = encoder_args(&settings(Some("clip.mkv")), Path::new("out.mp4"));
        let inputs: Vec<_> = args
            .windows(2)
            .filter(|w| w[0] == "-i")
            .map(|w| w[1].as_str())
            .collect();
        assert_eq!(inputs, vec!["-", "clip.mkv"]);
        assert_eq!(value_after(&args, "-c:a"), Some("copy"));
    }

    #[test]
    fn muxer_new_does_not_panic() {
        // Mp4Muxer::new peut réussir ou échouer selon la présence de ffmpeg.
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test_output.mp4");
        if let Ok(mut muxer) = Mp4Muxer::new(&path, &settings(None)) {
            assert!(muxer.write_frame(&[0u8; 3]).is_err());
            let _ = muxer.finish();
        }
    }
}
