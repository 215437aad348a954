//! Benchmarks du chemin chaud de classification.
//!
//! Run with: cargo bench -p es-ascii

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use es_ascii::edge::{ClassifyParams, classify_rows};
use es_ascii::engine::Engine;
use es_core::config::EngineConfig;
use es_core::frame::SourceFrame;
use es_core::lut::LutSet;

const SRC_W: u32 = 1920;
const SRC_H: u32 = 1080;

/// Dégradé diagonal avec un damier grossier : mélange de cellules plates et de contours.
fn synthetic_frame() -> Vec<u8> {
    let mut data = Vec::with_capacity(SRC_W as usize * SRC_H as usize * 3);
    for y in 0..SRC_H {
        for x in 0..SRC_W {
            let checker = if (x / 64 + y / 64) % 2 == 0 { 0 } else { 96 };
            let ramp = ((x + y) * 255 / (SRC_W + SRC_H)) as u8;
            data.extend_from_slice(&[ramp.saturating_add(checker), ramp, 255 - ramp]);
        }
    }
    data
}

fn bench_classify_rows(c: &mut Criterion) {
    let data = synthetic_frame();
    let frame = SourceFrame::new(&data, SRC_W, SRC_H, SRC_W as usize * 3).expect("frame");
    let luts = LutSet::new();
    let (w, h) = (160u16, 45u16);
    let params = ClassifyParams::new(w, h, 0.4);
    let mut glyphs = vec![0u8; usize::from(w) * usize::from(h)];
    let mut colors = vec![0u8; glyphs.len() * 3];

    c.bench_function("classify_rows_160x45_single", |b| {
        b.iter(|| {
            classify_rows(
                black_box(&frame),
                &luts,
                params,
                0..usize::from(h),
                &mut glyphs,
                &mut colors,
            );
        });
    });
}

fn bench_engine_threads(c: &mut Criterion) {
    let data = synthetic_frame();
    let frame = SourceFrame::new(&data, SRC_W, SRC_H, SRC_W as usize * 3).expect("frame");
    let mut group = c.benchmark_group("engine_process_frame_320x90");

    for threads in [1usize, 2, 4, 8] {
        let config = EngineConfig {
            num_threads: threads,
            ..EngineConfig::default()
        };
        let mut engine = Engine::new(config, 320, 90, false).expect("engine");
        group.bench_with_input(BenchmarkId::from_parameter(threads), &threads, |b, _| {
            b.iter(|| {
                let grid = engine.process_frame(black_box(&frame)).expect("arena");
                black_box(grid.glyph_codes()[0]);
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_classify_rows, bench_engine_threads);
criterion_main!(benches);
