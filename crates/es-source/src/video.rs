// Décodage via sous-processus : `ffprobe` pour les métadonnées, `ffmpeg`
// pour un flux rgb24 brut sur stdout. Prérequis : les deux dans PATH.
//
//   - `probe_video`       : width/height/fps + présence d'une piste audio
//   - `spawn_ffmpeg_pipe` : ffmpeg → frames rgb24 à la taille native
//   - `VideoSource`       : thread dédié, frames livrées par canal borné

use anyhow::{Context, Result};
use flume::{Receiver, Sender};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;

use es_core::frame::{OwnedFrame, RGB_BYTES};
use es_core::traits::FrameSource;

/// Capacité du canal décodeur → pipeline. Le décodeur bloque quand il est plein.
const CHANNEL_CAPACITY: usize = 3;

/// Métadonnées extraites via ffprobe.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VideoInfo {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Images par seconde (ex: 23.976, 24.0, 30.0, 60.0). `None` si inconnu.
    pub fps: Option<f64>,
    /// The container has at least one audio stream.
    pub has_audio: bool,
}

/// Parse `key=value` lines from ffprobe's `default=noprint_wrappers=1` output.
///
/// # Errors
/// Returns an error if no usable width/height is present.
///
/// # Example
/// ```
/// use es_source::video::parse_probe_output;
/// let info = parse_probe_output("width=640\nheight=360\nr_frame_rate=30000/1001\n").unwrap();
/// assert_eq!((info.width, info.height), (640, 360));
/// assert!((info.fps.unwrap() - 29.97).abs() < 0.01);
/// ```
pub fn parse_probe_output(text: &str) -> Result<VideoInfo> {
    let mut width: u32 = 0;
    let mut height: u32 = 0;
    let mut fps: Option<f64> = None;

    for line in text.lines() {
        if let Some(val) = line.strip_prefix("width=") {
            width = val.trim().parse().unwrap_or(0);
        } else if let Some(val) = line.strip_prefix("height=") {
            height = val.trim().parse().unwrap_or(0);
        } else if let Some(val) = line.strip_prefix("r_frame_rate=") {
            // Format: "24/1" ou "30000/1001"
            let mut parts = val.trim().splitn(2, '/');
            let num: Option<f64> = parts.next().and_then(|s| s.parse().ok());
            let den: f64 = parts.next().and_then(|s| s.parse().ok()).unwrap_or(1.0);
            fps = num
                .filter(|_| den > 0.0)
                .map(|n| n / den)
                .filter(|f| f.is_finite() && *f > 0.0);
        }
    }

    if width == 0 || height == 0 {
        anyhow::bail!("aucun flux vidéo exploitable (width={width}, height={height})");
    }
    Ok(VideoInfo {
        width,
        height,
        fps,
        has_audio: false,
    })
}

/// Interroge `ffprobe` pour obtenir les métadonnées du flux vidéo principal.
///
/// # Errors
/// Retourne une erreur si `ffprobe` est introuvable ou si le fichier
/// ne contient aucun flux vidéo décodable.
pub fn probe_video(path: &Path) -> Result<VideoInfo> {
    let path_str = path.to_str().context("Chemin vidéo invalide (non-UTF8)")?;

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "quiet",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height,r_frame_rate",
            "-of",
            "default=noprint_wrappers=1",
            "-i",
            path_str,
        ])
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .output()
        .context(
            "Impossible de lancer ffprobe. Vérifiez que ffprobe est installé et dans le PATH.",
        )?;

    let mut info = parse_probe_output(&String::from_utf8_lossy(&output.stdout))
        .with_context(|| format!("ffprobe : {}", path.display()))?;

    let audio = Command::new("ffprobe")
        .args([
            "-v",
            "quiet",
            "-select_streams",
            "a",
            "-show_entries",
            "stream=index",
            "-of",
            "csv=p=0",
            "-i",
            path_str,
        ])
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .output()
        .context("Impossible de lancer ffprobe (audio)")?;
    info.has_audio = !String::from_utf8_lossy(&audio.stdout).trim().is_empty();

    log::info!(
        "probe_video: {}x{} @ {:?}fps, audio={} ({})",
        info.width,
        info.height,
        info.fps,
        info.has_audio,
        path.display()
    );
    Ok(info)
}

/// Lance un processus `ffmpeg` qui écrit des frames rgb24 brutes sur stdout.
///
/// Chaque frame = `width × height × 3` octets, sans padding, à la taille native.
///
/// # Errors
/// Retourne une erreur si ffmpeg ne peut pas être lancé.
pub fn spawn_ffmpeg_pipe(path: &Path) -> Result<Child> {
    let path_str = path.to_str().context("Chemin vidéo invalide (non-UTF8)")?;
    let child = Command::new("ffmpeg")
        .args([
            "-i",
            path_str,
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgb24",
            "-an",
            "-hide_banner",
            "-loglevel",
            "error",
            "pipe:1",
        ])
        .stdout(Stdio::piped())
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .context("Impossible de lancer ffmpeg. (Est-il dans PATH ?)")?;
    log::debug!("ffmpeg spawné pour {}", path.display());
    Ok(child)
}

/// Lit exactement `buf.len()` bytes depuis `reader`.
///
/// # Errors
/// Retourne `Ok(true)` si lu avec succès, `Ok(false)` sur EOF avant complétion,
/// `Err` sur erreur I/O fatale.
pub fn read_exact_or_eof<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<bool> {
    let mut total = 0usize;
    while total < buf.len() {
        match reader.read(&mut buf[total..]) {
            Ok(0) => return Ok(false), // EOF
            Ok(n) => total += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(true)
}

/// Lit des frames rgb24 depuis `reader` et les envoie jusqu'à EOF ou fermeture du canal.
///
/// Chaque frame porte `pts = index / fps`. Retourne le nombre de frames envoyées.
///
/// # Errors
/// Retourne une erreur I/O fatale du pipe.
pub fn pump_frames<R: Read>(
    reader: &mut R,
    info: &VideoInfo,
    frame_tx: &Sender<OwnedFrame>,
) -> Result<u64> {
    let frame_bytes = info.width as usize * info.height as usize * RGB_BYTES;
    let fps = info.fps.unwrap_or(24.0);
    let mut index = 0u64;
    loop {
        let mut frame = OwnedFrame::new(info.width, info.height);
        debug_assert_eq!(frame.data.len(), frame_bytes);
        if !read_exact_or_eof(reader, &mut frame.data)? {
            return Ok(index);
        }
        frame.pts = Some(index as f64 / fps);
        if frame_tx.send(frame).is_err() {
            log::debug!("Thread vidéo: canal fermé après {index} frames");
            return Ok(index);
        }
        index += 1;
    }
}

/// Source vidéo : un thread lit le pipe ffmpeg et livre les frames par canal borné.
///
/// # Example
/// ```no_run
/// use es_core::traits::FrameSource;
/// use es_source::video::VideoSource;
/// use std::path::Path;
/// let mut source = VideoSource::open(Path::new("clip.mp4")).unwrap();
/// while let Some(frame) = source.next_frame() {
///     println!("{:?}", frame.pts);
/// }
/// ```
pub struct VideoSource {
    info: VideoInfo,
    path: PathBuf,
    frame_rx: Option<Receiver<OwnedFrame>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl VideoSource {
    /// Probe `path` and start decoding on a dedicated thread.
    ///
    /// # Errors
    /// Returns an error if probing fails, ffmpeg cannot be started, or the
    /// thread cannot be spawned.
    pub fn open(path: &Path) -> Result<Self> {
        let info = probe_video(path)?;
        let mut child = spawn_ffmpeg_pipe(path)?;
        let (frame_tx, frame_rx) = flume::bounded(CHANNEL_CAPACITY);

        let handle = thread::Builder::new()
            .name("es-video".to_string())
            .spawn(move || {
                let result = match child.stdout.as_mut() {
                    Some(stdout) => pump_frames(stdout, &info, &frame_tx),
                    None => Err(anyhow::anyhow!("stdout ffmpeg indisponible")),
                };
                match result {
                    Ok(n) => log::info!("Thread vidéo: {n} frames décodées"),
                    Err(e) => log::warn!("Thread vidéo: erreur lecture pipe: {e}"),
                }
                let _ = child.kill();
                let _ = child.wait();
            })
            .context("Impossible de spawner le thread vidéo")?;

        Ok(Self {
            info,
            path: path.to_path_buf(),
            frame_rx: Some(frame_rx),
            handle: Some(handle),
        })
    }

    /// Probed stream metadata.
    #[must_use]
    pub fn info(&self) -> &VideoInfo {
        &self.info
    }

    /// Path of the decoded file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FrameSource for VideoSource {
    fn next_frame(&mut self) -> Option<OwnedFrame> {
        self.frame_rx.as_ref()?.recv().ok()
    }

    fn native_size(&self) -> (u32, u32) {
        (self.info.width, self.info.height)
    }

    fn frame_rate(&self) -> Option<f64> {
        self.info.fps
    }
}

impl Drop for VideoSource {
    fn drop(&mut self) {
        // Fermer le canal débloque le thread sur son prochain envoi.
        drop(self.frame_rx.take());
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            log::error!("Thread vidéo: panic");
        }
    }
}
