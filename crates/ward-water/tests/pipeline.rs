use approx::assert_relative_eq;
use ward_water::core::{Footprint, IntensityImage, Region, RegionId, Scene};
use ward_water::thresholds::{RegionCatalog, ThresholdOutcome};
use ward_water::{CompositeWindow, PermanentWaterPipeline, PipelineParams};

const WATER_DB: f32 = -22.0;
const LAND_DB: f32 = -8.0;

fn wards() -> RegionCatalog {
    RegionCatalog::new(vec![
        Region::new(1, Footprint::rect(0, 0, 4, 4)),
        Region::new(2, Footprint::rect(4, 0, 8, 4)),
    ])
    .expect("catalog")
}

/// 8x4 scene with water in columns `< water_cols`.
fn scene(t: i64, water_cols: usize) -> Scene {
    Scene::new(
        Some(t),
        IntensityImage::from_fn(8, 4, |x, _| if x < water_cols { WATER_DB } else { LAND_DB }),
    )
}

/// Permanent water in columns 0..2, one flood reaching column 6.
fn series() -> Vec<Scene> {
    vec![scene(0, 2), scene(10, 2), scene(20, 6), scene(30, 2)]
}

#[test]
fn flood_series_yields_frequency_and_permanent_mask() {
    let params = PipelineParams {
        cutoff: Some(0.5),
        ..PipelineParams::default()
    };
    let pipeline = PermanentWaterPipeline::with_pixel_reducer(params);
    let res = pipeline.run(&series(), &wards()).expect("pipeline");

    assert!(res.thresholds.fallback_regions().next().is_none());
    let t1 = res.thresholds.thresholds.get(&RegionId::from(1)).expect("ward 1");
    let t2 = res.thresholds.thresholds.get(&RegionId::from(2)).expect("ward 2");
    // composite: -22 in cols 0..2, -11.5 in cols 2..6, -8 beyond
    assert!(t1 > -22.0 && t1 <= -11.5, "ward 1 threshold {t1}");
    assert!(t2 > -11.5 && t2 <= -8.0, "ward 2 threshold {t2}");

    assert_eq!(res.scene_masks.len(), 4);
    assert_eq!(res.scene_masks[2].acquired_ms, Some(20));
    assert_eq!(res.scene_masks[2].mask.water_count(), 24);

    let expected = [1.0, 1.0, 0.25, 0.25, 0.25, 0.25, 0.0, 0.0];
    for y in 0..4 {
        for (x, &e) in expected.iter().enumerate() {
            assert_relative_eq!(res.frequency.get(x, y).expect("in bounds"), e);
        }
    }

    let permanent = res.permanent.expect("cutoff set");
    assert_eq!(permanent.water_count(), 8);
    assert_eq!(permanent.get(1, 3), Some(1));
    assert_eq!(permanent.get(2, 0), Some(0));
}

#[test]
fn uniform_ward_in_window_falls_back() {
    let params = PipelineParams {
        composite: Some(CompositeWindow {
            start_ms: Some(20),
            end_ms: Some(30),
        }),
        ..PipelineParams::default()
    };
    let pipeline = PermanentWaterPipeline::with_pixel_reducer(params);
    let res = pipeline.run(&series(), &wards()).expect("pipeline");

    // only the flood scene: ward 1 is all water, a single bucket
    let id = RegionId::from(1);
    assert!(res.thresholds.is_fallback(&id));
    assert_eq!(res.thresholds.thresholds.get(&id), Some(-15.0));
    match &res.thresholds.outcomes[&id] {
        ThresholdOutcome::Fallback { kind, .. } => assert_eq!(kind, "degenerate_class"),
        other => panic!("unexpected outcome {other:?}"),
    }
    assert!(!res.thresholds.is_fallback(&RegionId::from(2)));

    // fallback -15 dB still separates -22 from -8
    assert_eq!(res.scene_masks[0].mask.water_count(), 8);
    assert!(res.permanent.is_none());
}

#[test]
fn nodata_ward_does_not_abort_the_run() {
    let mut scenes = series();
    for s in &mut scenes {
        for y in 0..4 {
            for x in 4..8 {
                s.image.data[y * 8 + x] = f32::NAN;
            }
        }
    }
    let pipeline = PermanentWaterPipeline::with_pixel_reducer(PipelineParams::default());
    let res = pipeline.run(&scenes, &wards()).expect("pipeline");

    let fallback: Vec<&RegionId> = res.thresholds.fallback_regions().collect();
    assert_eq!(fallback, vec![&RegionId::from(2)]);
    let summary = res.thresholds.summary().expect("two thresholds");
    assert_eq!(summary.regions, 2);
    assert_eq!(summary.fallback, 1);
    assert_relative_eq!(res.frequency.get(7, 0).expect("in bounds"), 0.0);
}
