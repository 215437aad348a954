use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use anyhow::{Context, Result};
use es_ascii::engine::Engine;
use es_core::config::EngineConfig;
use es_core::error::CoreError;
use es_core::traits::FrameSource;
use es_export::muxer::{EncoderSettings, Mp4Muxer};
use es_export::png::write_png;
use es_export::rasterizer::{ColorGrading, Rasterizer};
use es_render::fit::{fit_to_terminal, terminal_size};
use es_render::printer::{CursorGuard, TerminalPrinter, clear_screen};
use es_source::image::ImageSource;
use es_source::is_animated_file;
use es_source::video::VideoSource;

/// Ce que le pipeline doit produire pour une entrée donnée.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Mode {
    /// Still image printed once to the terminal.
    ImageToTerminal,
    /// Still image rasterised to a PNG file.
    ImageToPng(PathBuf),
    /// Video played back in the terminal.
    VideoPlayback,
    /// Video rasterised and encoded to MP4.
    VideoToMp4(PathBuf),
}

/// Pick the pipeline from the input kind and the optional output path.
#[must_use]
pub fn select_mode(input: &Path, output: Option<&Path>) -> Mode {
    match (is_animated_file(input), output) {
        (true, Some(out)) => Mode::VideoToMp4(out.to_path_buf()),
        (true, None) => Mode::VideoPlayback,
        (false, Some(out)) => Mode::ImageToPng(out.to_path_buf()),
        (false, None) => Mode::ImageToTerminal,
    }
}

/// Options du pipeline qui ne relèvent pas du moteur.
#[derive(Clone, Debug)]
pub struct RunOptions {
    /// Size the grid to the terminal instead of `grid_width`.
    pub fit_terminal: bool,
    /// Set by the Ctrl-C handler; loops exit cleanly when it flips.
    pub stop: Arc<AtomicBool>,
}

/// Dispatch `input` to the right pipeline.
///
/// # Errors
/// Returns decode, encode or I/O errors from the collaborators.
pub fn run(input: &Path, mode: &Mode, config: EngineConfig, options: &RunOptions) -> Result<()> {
    match mode {
        Mode::ImageToTerminal => image_to_terminal(input, config, options),
        Mode::ImageToPng(out) => image_to_png(input, out, config),
        Mode::VideoPlayback => play_video(input, config, options),
        Mode::VideoToMp4(out) => video_to_mp4(input, out, config, options),
    }
}

/// Grid size for a source: terminal fit if requested and available, else config.
#[must_use]
pub fn grid_size(config: &EngineConfig, source: (u32, u32), fit_terminal: bool) -> (u16, u16) {
    if fit_terminal && let Some((cols, rows)) = terminal_size() {
        let aspect = source_aspect(source);
        return fit_to_terminal(cols, rows, aspect, config.aspect_correction);
    }
    config.grid_for_source(source.0, source.1)
}

fn source_aspect((w, h): (u32, u32)) -> f32 {
    if h == 0 { 16.0 / 9.0 } else { w as f32 / h as f32 }
}

fn image_to_terminal(input: &Path, config: EngineConfig, options: &RunOptions) -> Result<()> {
    let mut source = ImageSource::new(input)?;
    let (w, h) = grid_size(&config, source.native_size(), options.fit_terminal);
    let color = config.color_enabled;
    let mut engine = Engine::new(config, w, h, false)?;
    let frame = source.next_frame().context("Image vide")?;

    let _cursor = CursorGuard::hide()?;
    let mut printer = TerminalPrinter::new();
    let mut stdout = io::stdout().lock();
    let grid = engine.process_frame(&frame.as_source()?)?;
    printer.present(&mut stdout, &grid, color)?;
    writeln!(stdout)?;
    engine.release();
    Ok(())
}

fn image_to_png(input: &Path, output: &Path, config: EngineConfig) -> Result<()> {
    let mut source = ImageSource::new(input)?;
    let (src_w, src_h) = source.native_size();
    let (w, h) = config.grid_for_source(src_w, src_h);
    let grading = ColorGrading::from_config(&config);
    let mut engine = Engine::new(config, w, h, true)?;
    let rasterizer = Rasterizer::new(engine.luts().palette(), grading);
    let frame = source.next_frame().context("Image vide")?;

    engine.process_frame(&frame.as_source()?)?;
    let target = engine.raster_target()?;
    rasterizer.render(&target.grid, target.pixels);
    write_png(output, target.pixels, target.width, target.height)?;
    println!("Rendered ASCII art to {}", output.display());
    engine.release();
    Ok(())
}

fn play_video(input: &Path, config: EngineConfig, options: &RunOptions) -> Result<()> {
    let mut source = VideoSource::open(input)?;
    let native = source.native_size();
    let delay = source.frame_delay();
    let (w, h) = grid_size(&config, native, options.fit_terminal);
    let color = config.color_enabled;
    let mut engine = Engine::new(config, w, h, false)?;

    let _cursor = CursorGuard::hide()?;
    let mut printer = TerminalPrinter::new();
    let mut stdout = io::stdout().lock();
    let mut last_terminal = terminal_size();
    let mut shown = 0u64;

    while !options.stop.load(Ordering::Relaxed) {
        let Some(frame) = source.next_frame() else {
            break;
        };
        let started = Instant::now();

        if options.fit_terminal {
            let current = terminal_size();
            if current != last_terminal {
                last_terminal = current;
                clear_screen(&mut stdout)?;
                let (nw, nh) = grid_size(engine.config(), native, true);
                engine.resize(nw, nh)?;
                log::debug!("Terminal redimensionné, grille {nw}x{nh}");
            }
        }

        match engine.process_frame(&frame.as_source()?) {
            Ok(grid) => {
                printer.present(&mut stdout, &grid, color)?;
                shown += 1;
            }
            Err(CoreError::ArenaExhausted { .. }) => continue,
            Err(e) => return Err(e.into()),
        }

        if let Some(remaining) = delay.checked_sub(started.elapsed()) {
            std::thread::sleep(remaining);
        }
    }

    log::info!("Lecture terminée : {shown} frames affichées");
    engine.release();
    Ok(())
}

fn video_to_mp4(input: &Path, output: &Path, config: EngineConfig, options: &RunOptions) -> Result<()> {
    let mut source = VideoSource::open(input)?;
    let (src_w, src_h) = source.native_size();
    let (w, h) = config.grid_for_source(src_w, src_h);
    let grading = ColorGrading::from_config(&config);
    let settings = EncoderSettings {
        width: u32::from(w) * 8,
        height: u32::from(h) * 8,
        fps: source.frame_rate().unwrap_or(24.0),
        crf: config.crf,
        audio_source: source.info().has_audio.then(|| input.to_path_buf()),
    };
    let mut engine = Engine::new(config, w, h, true)?;
    let rasterizer = Rasterizer::new(engine.luts().palette(), grading);
    let mut muxer = Mp4Muxer::new(output, &settings)?;

    println!("Transcoding... (Audio will be passed through)");
    let mut skipped = 0u64;
    while !options.stop.load(Ordering::Relaxed) {
        let Some(frame) = source.next_frame() else {
            break;
        };
        match engine.process_frame(&frame.as_source()?) {
            Ok(_) => {}
            Err(CoreError::ArenaExhausted { .. }) => {
                skipped += 1;
                continue;
            }
            Err(e) => return Err(e.into()),
        }
        let target = match engine.raster_target() {
            Ok(target) => target,
            Err(CoreError::ArenaExhausted { .. }) => {
                skipped += 1;
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        rasterizer.render(&target.grid, target.pixels);
        muxer.write_frame(target.pixels)?;
        print!("Encoded video frame {}\r", muxer.frames_written());
        io::stdout().flush()?;
    }

    if skipped > 0 {
        log::warn!("{skipped} frames ignorées (arena épuisée)");
    }
    muxer.finish()?;
    println!("\nFinished encoding video to {}", output.display());
    engine.release();
    Ok(())
}
