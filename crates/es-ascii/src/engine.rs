use anyhow::Result;
use es_core::arena::{ArenaSlice, FrameArena};
use es_core::config::{CELL_PX, EngineConfig, arena_bytes_for};
use es_core::error::CoreError;
use es_core::frame::{AsciiGrid, RGB_BYTES, SourceFrame};
use es_core::lut::LutSet;

use crate::edge::{ClassifyParams, classify_rows};
use crate::scheduler::SliceScheduler;

/// Régions d'arena de la frame courante.
#[derive(Clone, Copy, Debug)]
struct FrameSlices {
    glyphs: ArenaSlice,
    colors: ArenaSlice,
    raster: Option<ArenaSlice>,
}

/// Grille de la frame courante + tampon RGB inscriptible pour la rasterisation.
pub struct RasterTarget<'a> {
    /// Read-only view of the classified grid.
    pub grid: AsciiGrid<'a>,
    /// `width × height × 3` bytes, row-major RGB24.
    pub pixels: &'a mut [u8],
    /// Raster width in pixels (`8 · W`).
    pub width: u32,
    /// Raster height in pixels (`8 · H`).
    pub height: u32,
}

/// Moteur de transcription frame → glyphes.
///
/// Construit une fois : LUTs, pool de workers et arena. Chaque appel à
/// [`Engine::process_frame`] rembobine l'arena, y alloue la grille, puis
/// classe toutes les cellules en fork-join.
///
/// # Example
/// ```
/// use es_ascii::engine::Engine;
/// use es_core::config::EngineConfig;
/// use es_core::frame::SourceFrame;
///
/// let config = EngineConfig { num_threads: 2, ..EngineConfig::default() };
/// let mut engine = Engine::new(config, 4, 2, false).unwrap();
/// let data = vec![200u8; 16 * 8 * 3];
/// let frame = SourceFrame::new(&data, 16, 8, 48).unwrap();
/// let grid = engine.process_frame(&frame).unwrap();
/// assert_eq!(grid.glyph_codes().len(), 8);
/// assert_eq!(grid.color(3, 1), (200, 200, 200));
/// ```
pub struct Engine {
    config: EngineConfig,
    luts: LutSet,
    scheduler: SliceScheduler,
    arena: FrameArena,
    width: u16,
    height: u16,
    raster: bool,
    current: Option<FrameSlices>,
}

impl Engine {
    /// Build an engine for a `width × height` grid.
    ///
    /// The arena is sized for the grid buffers, plus the raster buffer when
    /// `raster` is set.
    ///
    /// # Errors
    /// Returns an error if the grid is empty or the worker pool cannot be built.
    pub fn new(config: EngineConfig, width: u16, height: u16, raster: bool) -> Result<Self> {
        let capacity = arena_bytes_for(width, height, raster);
        let mut engine = Self::with_arena_capacity(config, width, height, capacity)?;
        engine.raster = raster;
        Ok(engine)
    }

    /// Build an engine with an explicit arena capacity in bytes.
    ///
    /// # Errors
    /// Returns an error if the grid is empty, the arena cannot be reserved or
    /// the worker pool cannot be built.
    pub fn with_arena_capacity(
        config: EngineConfig,
        width: u16,
        height: u16,
        capacity: usize,
    ) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(CoreError::InvalidDimensions {
                width: u32::from(width),
                height: u32::from(height),
            }
            .into());
        }
        let scheduler = SliceScheduler::new(config.worker_count())?;
        let arena = FrameArena::new(capacity)?;
        log::info!(
            "Engine: grille {width}x{height}, {} workers, arena {} octets",
            scheduler.workers(),
            arena.capacity()
        );
        Ok(Self {
            config,
            luts: LutSet::new(),
            scheduler,
            arena,
            width,
            height,
            raster: false,
            current: None,
        })
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Precomputed tables.
    #[must_use]
    pub fn luts(&self) -> &LutSet {
        &self.luts
    }

    /// Grid size in cells.
    #[must_use]
    pub fn grid_size(&self) -> (u16, u16) {
        (self.width, self.height)
    }

    /// Number of row slices per frame.
    #[must_use]
    pub fn workers(&self) -> usize {
        self.scheduler.workers()
    }

    /// The frame arena, for inspection.
    #[must_use]
    pub fn arena(&self) -> &FrameArena {
        &self.arena
    }

    /// Change the grid size. The arena is reallocated only if the new
    /// working set no longer fits.
    ///
    /// # Errors
    /// Returns [`CoreError::InvalidDimensions`] for an empty grid, or
    /// [`CoreError::ArenaAllocation`] if the larger block cannot be reserved;
    /// the engine then keeps its previous size.
    pub fn resize(&mut self, width: u16, height: u16) -> Result<(), CoreError> {
        if width == 0 || height == 0 {
            return Err(CoreError::InvalidDimensions {
                width: u32::from(width),
                height: u32::from(height),
            });
        }
        let needed = arena_bytes_for(width, height, self.raster);
        if needed > self.arena.capacity() {
            log::debug!(
                "Engine: arena {} → {} octets",
                self.arena.capacity(),
                needed
            );
            let old = std::mem::replace(&mut self.arena, FrameArena::new(needed)?);
            old.release();
        }
        self.width = width;
        self.height = height;
        self.current = None;
        self.arena.reset();
        Ok(())
    }

    /// Drop the current frame's buffers. Any later [`Engine::grid`] call fails
    /// with [`CoreError::StaleAllocation`] until the next frame.
    pub fn reset(&mut self) {
        self.arena.reset();
    }

    /// Classify one source frame into the grid.
    ///
    /// # Errors
    /// Returns [`CoreError::ArenaExhausted`] if the grid does not fit in the
    /// arena. No output is produced for this frame; the engine stays usable.
    pub fn process_frame(&mut self, frame: &SourceFrame<'_>) -> Result<AsciiGrid<'_>, CoreError> {
        self.arena.reset();
        self.current = None;

        let (w, h) = (usize::from(self.width), usize::from(self.height));
        let cells = w * h;
        let slices = self.allocate_grid(cells)?;
        let [glyphs, colors] = self.arena.slices_mut([&slices.glyphs, &slices.colors])?;

        let params = ClassifyParams::new(self.width, self.height, self.config.edge_strength);
        let luts = &self.luts;
        self.scheduler.run(w, h, glyphs, colors, |rows, g, c| {
            classify_rows(frame, luts, params, rows, g, c);
        });
        log::trace!(
            "Engine: frame {}x{} → {w}x{h} (pts {:?})",
            frame.width(),
            frame.height(),
            frame.pts()
        );

        self.current = Some(slices);
        self.grid()
    }

    /// View of the last classified grid.
    ///
    /// # Errors
    /// [`CoreError::NoFrame`] before the first frame or after a resize,
    /// [`CoreError::StaleAllocation`] if the arena was reset since.
    pub fn grid(&self) -> Result<AsciiGrid<'_>, CoreError> {
        let slices = self.current.ok_or(CoreError::NoFrame)?;
        AsciiGrid::new(
            self.width,
            self.height,
            self.arena.slice(&slices.glyphs)?,
            self.arena.slice(&slices.colors)?,
            self.luts.palette(),
        )
    }

    /// Grid of the last frame plus a raster buffer of `8W × 8H` RGB pixels,
    /// allocated from the arena on first use in the frame.
    ///
    /// # Errors
    /// [`CoreError::NoFrame`], [`CoreError::StaleAllocation`], or
    /// [`CoreError::ArenaExhausted`] if the raster buffer does not fit.
    pub fn raster_target(&mut self) -> Result<RasterTarget<'_>, CoreError> {
        let mut slices = self.current.ok_or(CoreError::NoFrame)?;
        let width = u32::from(self.width) * CELL_PX as u32;
        let height = u32::from(self.height) * CELL_PX as u32;

        let raster = match slices.raster {
            Some(raster) => raster,
            None => {
                let bytes = width as usize * height as usize * RGB_BYTES;
                let raster = self.allocate_logged(bytes)?;
                slices.raster = Some(raster);
                self.current = Some(slices);
                raster
            }
        };

        let [glyphs, colors, pixels] =
            self.arena
                .slices_mut([&slices.glyphs, &slices.colors, &raster])?;
        let grid = AsciiGrid::new(self.width, self.height, glyphs, colors, self.luts.palette())?;
        Ok(RasterTarget {
            grid,
            pixels,
            width,
            height,
        })
    }

    /// Tear down: frees the arena and joins the worker pool.
    pub fn release(self) {
        log::debug!("Engine: arrêt ({}x{})", self.width, self.height);
        self.arena.release();
    }

    fn allocate_grid(&mut self, cells: usize) -> Result<FrameSlices, CoreError> {
        let glyphs = self.allocate_logged(cells)?;
        let colors = self.allocate_logged(cells * RGB_BYTES)?;
        Ok(FrameSlices {
            glyphs,
            colors,
            raster: None,
        })
    }

    fn allocate_logged(&mut self, size: usize) -> Result<ArenaSlice, CoreError> {
        self.arena.allocate(size).inspect_err(|e| {
            log::warn!("Engine: frame ignorée, {e}");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use es_core::charset::{Orientation, RAMP_FLAT};

    fn config(threads: usize) -> EngineConfig {
        EngineConfig {
            num_threads: threads,
            ..EngineConfig::default()
        }
    }

    fn gray(w: u32, h: u32, v: u8) -> Vec<u8> {
        vec![v; w as usize * h as usize * 3]
    }

    #[test]
    fn grid_before_first_frame_is_an_error() {
        let engine = Engine::new(config(1), 2, 2, false).unwrap();
        assert!(matches!(engine.grid(), Err(CoreError::NoFrame)));
    }

    #[test]
    fn empty_grid_is_rejected() {
        assert!(Engine::new(config(1), 0, 3, false).is_err());
    }

    #[test]
    fn unreservable_arena_fails_construction() {
        let err = Engine::with_arena_capacity(config(1), 4, 4, usize::MAX - 15)
            .err()
            .unwrap();
        assert!(matches!(
            err.downcast_ref::<CoreError>(),
            Some(CoreError::ArenaAllocation { .. })
        ));
    }

    #[test]
    fn uniform_gray_maps_to_flat_ramp() {
        let mut engine = Engine::new(config(2), 1, 1, false).unwrap();
        let data = gray(2, 2, 128);
        let frame = SourceFrame::new(&data, 2, 2, 6).unwrap();
        let grid = engine.process_frame(&frame).unwrap();
        // gamma[128] = 186 → 186·89/255 = 64
        assert_eq!(grid.glyph(0, 0), RAMP_FLAT[64]);
        assert_eq!(grid.color(0, 0), (128, 128, 128));
    }

    #[test]
    fn more_workers_than_rows() {
        let mut engine = Engine::new(config(8), 3, 2, false).unwrap();
        let data = gray(6, 4, 30);
        let frame = SourceFrame::new(&data, 6, 4, 18).unwrap();
        let grid = engine.process_frame(&frame).unwrap();
        let luts = LutSet::new();
        let expected = luts.glyph(Orientation::Flat, luts.gamma().apply(30));
        for y in 0..2 {
            assert_eq!(grid.row_text(y), expected.to_string().repeat(3));
        }
    }

    #[test]
    fn exhausted_arena_skips_frame_and_recovers() {
        let mut engine = Engine::with_arena_capacity(config(1), 4, 4, 16).unwrap();
        let data = gray(4, 4, 10);
        let frame = SourceFrame::new(&data, 4, 4, 12).unwrap();
        assert!(matches!(
            engine.process_frame(&frame),
            Err(CoreError::ArenaExhausted { .. })
        ));
        assert!(matches!(engine.grid(), Err(CoreError::NoFrame)));

        engine.resize(2, 2).unwrap();
        assert!(engine.arena().capacity() >= arena_bytes_for(2, 2, false));
        assert!(engine.process_frame(&frame).is_ok());
    }

    #[test]
    fn reset_makes_grid_stale() {
        let mut engine = Engine::new(config(1), 2, 2, false).unwrap();
        let data = gray(2, 2, 0);
        let frame = SourceFrame::new(&data, 2, 2, 6).unwrap();
        engine.process_frame(&frame).unwrap();
        assert!(engine.grid().is_ok());
        engine.reset();
        assert!(matches!(
            engine.grid(),
            Err(CoreError::StaleAllocation { .. })
        ));
    }

    #[test]
    fn raster_target_has_eight_by_eight_cells() {
        let mut engine = Engine::new(config(1), 3, 2, true).unwrap();
        let data = gray(3, 2, 255);
        let frame = SourceFrame::new(&data, 3, 2, 9).unwrap();
        engine.process_frame(&frame).unwrap();
        let target = engine.raster_target().unwrap();
        assert_eq!((target.width, target.height), (24, 16));
        assert_eq!(target.pixels.len(), 24 * 16 * 3);
        assert_eq!(target.grid.color(2, 1), (255, 255, 255));
    }

    #[test]
    fn raster_target_is_reused_within_a_frame() {
        let mut engine = Engine::new(config(1), 2, 2, true).unwrap();
        let data = gray(2, 2, 40);
        let frame = SourceFrame::new(&data, 2, 2, 6).unwrap();
        engine.process_frame(&frame).unwrap();
        engine.raster_target().unwrap().pixels.fill(9);
        let used = engine.arena().used();
        {
            let again = engine.raster_target().unwrap();
            assert!(again.pixels.iter().all(|&p| p == 9));
        }
        assert_eq!(engine.arena().used(), used);
    }

    #[test]
    fn raster_without_budget_is_exhausted() {
        let mut engine = Engine::new(config(1), 2, 2, false).unwrap();
        let data = gray(2, 2, 40);
        let frame = SourceFrame::new(&data, 2, 2, 6).unwrap();
        engine.process_frame(&frame).unwrap();
        assert!(matches!(
            engine.raster_target(),
            Err(CoreError::ArenaExhausted { .. })
        ));
        assert!(engine.grid().is_ok());
    }
}
