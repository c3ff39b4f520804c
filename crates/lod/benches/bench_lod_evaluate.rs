use std::hint::black_box;
use std::sync::Arc;
use std::time::Instant;

use globe_lod::LodSelector;
use globe_surface::{Material, Resolution, SurfaceVariant};

fn make_selector(tiers: usize) -> LodSelector {
    let material = Arc::new(Material::default());
    let mut lod = LodSelector::new();
    for i in 0..tiers {
        let variant =
            SurfaceVariant::new(Resolution::new(8, 16), 5.0, Arc::clone(&material)).unwrap();
        lod.register(variant, i as f32 * 10.0).unwrap();
    }
    lod
}

fn bench_evaluate_static(tiers: usize, iterations: usize) {
    let mut lod = make_selector(tiers);

    let start = Instant::now();
    for _ in 0..iterations {
        let _ = black_box(lod.evaluate(black_box(25.0)));
    }
    let elapsed = start.elapsed();
    let per_iter = elapsed / iterations as u32;
    println!(
        "  static camera ({tiers} tiers, {iterations} iters): {per_iter:?}/iter, total {elapsed:?}"
    );
}

fn bench_evaluate_sweep(tiers: usize, iterations: usize) {
    let mut lod = make_selector(tiers);
    let max = tiers as f32 * 10.0 + 5.0;

    let start = Instant::now();
    for i in 0..iterations {
        // Simulate a zooming camera crossing every band
        let d = (i as f32 * 0.37) % max;
        let _ = black_box(lod.evaluate(black_box(d)));
    }
    let elapsed = start.elapsed();
    let per_iter = elapsed / iterations as u32;
    println!(
        "  zoom sweep ({tiers} tiers, {iterations} iters): {per_iter:?}/iter, total {elapsed:?}"
    );
}

fn main() {
    println!("=== LOD Evaluate Benchmarks ===\n");

    println!("Static camera:");
    bench_evaluate_static(3, 100_000);
    bench_evaluate_static(8, 100_000);

    println!("\nZoom sweep (tier changes):");
    bench_evaluate_sweep(3, 100_000);
    bench_evaluate_sweep(8, 100_000);

    println!("\n=== Done ===");
}
