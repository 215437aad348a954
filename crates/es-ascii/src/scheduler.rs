use std::ops::Range;

use anyhow::{Context, Result};
use es_core::frame::RGB_BYTES;

/// Rows assigned to `worker` out of `workers` for a grid of `height` rows.
///
/// `rows_per_worker = height / workers`; the last worker absorbs the remainder.
///
/// # Example
/// ```
/// use es_ascii::scheduler::row_range;
/// assert_eq!(row_range(0, 3, 10), 0..3);
/// assert_eq!(row_range(2, 3, 10), 6..10);
/// assert_eq!(row_range(1, 4, 2), 0..0);
/// ```
#[inline]
#[must_use]
pub fn row_range(worker: usize, workers: usize, height: usize) -> Range<usize> {
    let workers = workers.max(1);
    let per_worker = height / workers;
    let start = worker * per_worker;
    let end = if worker + 1 == workers {
        height
    } else {
        (worker + 1) * per_worker
    };
    start..end
}

/// Every worker's row range, in worker order.
pub fn partition_rows(height: usize, workers: usize) -> impl Iterator<Item = Range<usize>> {
    let workers = workers.max(1);
    (0..workers).map(move |i| row_range(i, workers, height))
}

/// Découpe la grille en tranches de lignes et les classe en parallèle.
///
/// Le pool rayon est construit une fois et réutilisé à chaque frame ;
/// `run` est un fork-join : toutes les tranches sont dispatchées, puis
/// l'appel bloque jusqu'à ce que chacune soit terminée.
/// Chaque worker reçoit des sous-slices disjointes des tampons de sortie,
/// aucune synchronisation n'est nécessaire.
pub struct SliceScheduler {
    pool: rayon::ThreadPool,
    workers: usize,
}

impl SliceScheduler {
    /// Build a pool of `workers` threads (at least one).
    ///
    /// # Errors
    /// Returns an error if the OS refuses to spawn the worker threads.
    pub fn new(workers: usize) -> Result<Self> {
        let workers = workers.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("es-slice-{i}"))
            .build()
            .context("Impossible de créer le pool de workers")?;
        Ok(Self { pool, workers })
    }

    /// Number of row slices dispatched per frame.
    #[must_use]
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run `job` once per worker over its row slice, then join.
    ///
    /// `glyphs` holds `width · height` bytes and `colors` three times that.
    /// `job` receives the absolute row range and the matching sub-slices.
    pub fn run<F>(&self, width: usize, height: usize, glyphs: &mut [u8], colors: &mut [u8], job: F)
    where
        F: Fn(Range<usize>, &mut [u8], &mut [u8]) + Sync,
    {
        if glyphs.len() != width * height || colors.len() != width * height * RGB_BYTES {
            log::error!(
                "SliceScheduler: tampons incohérents pour {width}x{height} (glyphs={}, colors={})",
                glyphs.len(),
                colors.len()
            );
            return;
        }

        let job = &job;
        self.pool.scope(|scope| {
            let mut glyphs_rest = glyphs;
            let mut colors_rest = colors;
            for rows in partition_rows(height, self.workers) {
                let cells = rows.len() * width;
                let (g, g_tail) = std::mem::take(&mut glyphs_rest).split_at_mut(cells);
                let (c, c_tail) =
                    std::mem::take(&mut colors_rest).split_at_mut(cells * RGB_BYTES);
                glyphs_rest = g_tail;
                colors_rest = c_tail;
                scope.spawn(move |_| job(rows, g, c));
            }
        });
    }
}
