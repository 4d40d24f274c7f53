//! End-to-end pipeline runs through the public API.

use std::path::Path;

use glam::DVec3;
use voxprep_core::config::PipelineConfig;
use voxprep_core::diagnostics::StageStatistics;
use voxprep_core::error::BoxError;
use voxprep_core::{
    DenoisingMethod, DenoisingParams, FilterError, FilterPipeline, Geometry, ImageDenoising,
    ImageNormalization, ImageRegistration, ImageResampling, Interpolation, RegistrationParams,
    ResamplingParams, SkullStripping, SkullStrippingParams, SpatialTransform, Volume,
};

fn constant(size: [usize; 3], value: f32) -> Volume {
    Volume::filled(Geometry::new(size), value).unwrap()
}

#[test]
fn normalize_then_resample_constant_volume() {
    let input = constant([4, 4, 4], 5.0);
    let pipeline = FilterPipeline::new()
        .with_stage(ImageNormalization, None)
        .with_stage(
            ImageResampling::new(),
            Some(ResamplingParams::new([2, 2, 2], Interpolation::Nearest).unwrap().into()),
        );

    let out = pipeline.execute(&input).unwrap();
    assert_eq!(out.size(), [2, 2, 2]);
    assert_eq!(out.spacing(), DVec3::splat(2.0));
    assert!(out.samples().iter().all(|&v| v == 5.0));
}

#[test]
fn full_chain_lands_on_atlas_grid() {
    let geometry = Geometry::new([8, 8, 8]);
    let input = Volume::from_fn(geometry, |[x, y, z]| (x * y + z) as f32).unwrap();
    let mask = Volume::from_fn(geometry, |[x, _, _]| if x < 6 { 1.0 } else { 0.0 }).unwrap();
    let atlas = Volume::filled(Geometry::new([6, 6, 6]).with_spacing(DVec3::splat(1.2)), 0.0).unwrap();

    let pipeline = FilterPipeline::new()
        .with_stage(ImageNormalization, None)
        .with_stage(
            ImageDenoising::new(),
            Some(DenoisingParams::new(DenoisingMethod::Gaussian { sigma: 0.6 }).unwrap().into()),
        )
        .with_stage(SkullStripping::new(), Some(SkullStrippingParams::new(mask).into()))
        .with_stage(
            ImageRegistration::new(),
            Some(RegistrationParams::new(atlas.clone(), SpatialTransform::IDENTITY, false).into()),
        );

    let mut stats = StageStatistics::default();
    let out = pipeline.execute_with_observer(&input, &mut stats).unwrap();
    assert_eq!(out.geometry(), atlas.geometry());
    assert_eq!(stats.stages.len(), 4);
    let (min, max) = out.min_max().unwrap();
    assert!(min >= 0.0 && max <= 1.0 + 1e-5);
}

#[test]
fn mask_mismatch_aborts_before_registration() {
    let input = constant([4, 4, 4], 1.0);
    let mask = constant([3, 3, 3], 1.0);
    let atlas = constant([4, 4, 4], 0.0);
    let pipeline = FilterPipeline::new()
        .with_stage(SkullStripping::new(), Some(SkullStrippingParams::new(mask).into()))
        .with_stage(
            ImageRegistration::new(),
            Some(RegistrationParams::new(atlas, SpatialTransform::IDENTITY, true).into()),
        );

    let err = pipeline.execute(&input).unwrap_err();
    assert_eq!(err.stage_index(), 0);
    assert!(matches!(err.filter_error(), FilterError::GeometryMismatch { .. }));
}

#[test]
fn config_driven_pipeline_matches_manual_one() {
    let config = PipelineConfig::from_json_str(
        r#"{ "stages": [
            { "filter": "normalization" },
            { "filter": "denoising", "method": "median", "radius": 1 },
            { "filter": "skull_stripping", "mask": "brain.json" },
            { "filter": "resampling", "size": [3, 3, 3], "interpolation": "linear" }
        ] }"#,
    )
    .unwrap();

    let geometry = Geometry::new([6, 6, 6]);
    let mask = Volume::from_fn(geometry, |[_, _, z]| if z > 0 { 1.0 } else { 0.0 }).unwrap();
    let loader_mask = mask.clone();
    let loader = move |path: &Path| -> Result<Volume, BoxError> {
        assert_eq!(path, Path::new("brain.json"));
        Ok(loader_mask.clone())
    };
    let configured = config.build(&loader).unwrap();

    let manual = FilterPipeline::new()
        .with_stage(ImageNormalization, None)
        .with_stage(
            ImageDenoising::new(),
            Some(DenoisingParams::new(DenoisingMethod::Median { radius: 1 }).unwrap().into()),
        )
        .with_stage(SkullStripping::new(), Some(SkullStrippingParams::new(mask).into()))
        .with_stage(
            ImageResampling::new(),
            Some(ResamplingParams::new([3, 3, 3], Interpolation::Linear).unwrap().into()),
        );

    assert_eq!(configured.descriptors(), manual.descriptors());

    let input = Volume::from_fn(geometry, |[x, y, z]| ((x * 7 + y * 3 + z) % 5) as f32).unwrap();
    assert_eq!(configured.execute(&input).unwrap(), manual.execute(&input).unwrap());
}
