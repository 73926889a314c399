use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ward_water::core::{Footprint, IntensityImage, Region, Scene};
use ward_water::thresholds::RegionCatalog;
use ward_water::{PermanentWaterPipeline, PipelineParams};

/// 512x512 scenes split into a 4x4 grid of wards, river along the diagonal.
fn inputs(scenes: usize) -> (Vec<Scene>, RegionCatalog) {
    let size = 512;
    let scenes = (0..scenes)
        .map(|t| {
            let reach = 6 + 2 * (t % 4);
            let img = IntensityImage::from_fn(size, size, |x, y| {
                let d = x.abs_diff(y);
                let noise = ((x * 31 + y * 17 + t * 7) % 13) as f32 * 0.25;
                if d < reach {
                    -21.0 + noise
                } else {
                    -10.0 + noise
                }
            });
            Scene::new(Some(t as i64), img)
        })
        .collect();

    let cell = size / 4;
    let regions = (0..16)
        .map(|i| {
            let (cx, cy) = (i % 4, i / 4);
            Region::new(
                i as i64,
                Footprint::rect(cx * cell, cy * cell, (cx + 1) * cell, (cy + 1) * cell),
            )
        })
        .collect();
    (scenes, RegionCatalog::new(regions).expect("bench wards"))
}

fn bench_pipeline(c: &mut Criterion) {
    let (scenes, wards) = inputs(12);
    let pipeline = PermanentWaterPipeline::with_pixel_reducer(PipelineParams::default());
    c.bench_function("pipeline_512px_16_wards_12_scenes", |b| {
        b.iter(|| pipeline.run(black_box(&scenes), &wards))
    });
}

criterion_group!(benches, bench_pipeline);
criterion_main!(benches);
