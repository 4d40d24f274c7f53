//! Ordered, fail-fast composition of filters.

use std::borrow::Cow;
use std::time::Instant;

use crate::diagnostics::{NoopObserver, StageObserver};
use crate::error::PipelineError;
use crate::filter::Filter;
use crate::image::Volume;
use crate::params::FilterParams;

/// One `(filter, parameters)` entry of a pipeline.
pub struct Stage {
    filter: Box<dyn Filter>,
    params: Option<FilterParams>,
}

impl Stage {
    pub fn new(filter: Box<dyn Filter>, params: Option<FilterParams>) -> Self {
        Self { filter, params }
    }

    pub fn filter(&self) -> &dyn Filter {
        self.filter.as_ref()
    }

    pub fn params(&self) -> Option<&FilterParams> {
        self.params.as_ref()
    }

    /// The filter's descriptor for these parameters.
    pub fn describe(&self) -> String {
        self.filter.describe(self.params.as_ref())
    }
}

impl std::fmt::Debug for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.describe())
    }
}

/// Filters applied in insertion order, each stage consuming the previous output.
#[derive(Debug, Default)]
pub struct FilterPipeline {
    stages: Vec<Stage>,
}

impl FilterPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a stage.
    pub fn add(&mut self, filter: impl Filter + 'static, params: Option<FilterParams>) -> &mut Self {
        self.add_boxed(Box::new(filter), params)
    }

    pub fn add_boxed(&mut self, filter: Box<dyn Filter>, params: Option<FilterParams>) -> &mut Self {
        self.stages.push(Stage::new(filter, params));
        self
    }

    /// Builder form of [`add`](Self::add).
    pub fn with_stage(mut self, filter: impl Filter + 'static, params: Option<FilterParams>) -> Self {
        self.add(filter, params);
        self
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn stages(&self) -> impl Iterator<Item = &Stage> {
        self.stages.iter()
    }

    /// Stage descriptors in execution order, without running anything.
    pub fn descriptors(&self) -> Vec<String> {
        self.stages.iter().map(Stage::describe).collect()
    }

    /// Run every stage in order and return the final volume.
    ///
    /// The first failing stage aborts the run; later stages are not executed.
    /// An empty pipeline returns a copy of the input.
    pub fn execute(&self, image: &Volume) -> Result<Volume, PipelineError> {
        self.execute_with_observer(image, &mut NoopObserver)
    }

    /// Like [`execute`](Self::execute), reporting each stage output to `observer`.
    pub fn execute_with_observer(
        &self,
        image: &Volume,
        observer: &mut dyn StageObserver,
    ) -> Result<Volume, PipelineError> {
        let mut current = Cow::Borrowed(image);

        for (index, stage) in self.stages.iter().enumerate() {
            let descriptor = stage.describe();
            tracing::info!("stage {index}: {descriptor}");
            let started = Instant::now();

            let output = stage
                .filter
                .execute(&current, stage.params.as_ref())
                .map_err(|source| {
                    tracing::error!("stage {index} ({descriptor}) failed: {source}");
                    PipelineError::Stage {
                        index,
                        descriptor: descriptor.clone(),
                        source,
                    }
                })?;

            tracing::debug!(
                "stage {index} finished in {:.1} ms",
                started.elapsed().as_secs_f64() * 1000.0
            );
            observer.on_stage(index, &descriptor, &output);
            current = Cow::Owned(output);
        }

        Ok(current.into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FilterError;
    use crate::filter::{ImageNormalization, ImageResampling};
    use crate::image::Geometry;
    use crate::kernels::Interpolation;
    use crate::params::ResamplingParams;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Adds a constant and counts its invocations.
    struct AddConstant {
        value: f32,
        calls: Arc<AtomicUsize>,
    }

    impl Filter for AddConstant {
        fn name(&self) -> &'static str {
            "AddConstant"
        }

        fn execute(&self, image: &Volume, _: Option<&FilterParams>) -> Result<Volume, FilterError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let samples = image.samples().iter().map(|v| v + self.value).collect();
            Ok(Volume::from_array(samples, image)?)
        }
    }

    struct Failing {
        calls: Arc<AtomicUsize>,
    }

    impl Filter for Failing {
        fn name(&self) -> &'static str {
            "Failing"
        }

        fn execute(&self, _: &Volume, _: Option<&FilterParams>) -> Result<Volume, FilterError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(FilterError::Parameter("always fails".to_string()))
        }
    }

    fn ramp() -> Volume {
        Volume::from_fn(Geometry::new([4, 4, 4]), |[x, y, z]| (x + 2 * y + 3 * z) as f32).unwrap()
    }

    #[test]
    fn test_empty_pipeline_is_identity() {
        let input = ramp();
        let pipeline = FilterPipeline::new();
        assert!(pipeline.is_empty());
        assert_eq!(pipeline.execute(&input).unwrap(), input);
    }

    #[test]
    fn test_pipeline_equals_manual_chaining() {
        let input = ramp();
        let resampling: FilterParams = ResamplingParams::new([2, 3, 2], Interpolation::Linear).unwrap().into();

        let mut pipeline = FilterPipeline::new();
        pipeline
            .add(ImageNormalization, None)
            .add(ImageResampling::new(), Some(resampling.clone()));
        let piped = pipeline.execute(&input).unwrap();

        let step1 = ImageNormalization.execute(&input, None).unwrap();
        let manual = ImageResampling::new().execute(&step1, Some(&resampling)).unwrap();
        assert_eq!(piped, manual);
    }

    #[test]
    fn test_stages_run_in_insertion_order() {
        let calls = Arc::new(AtomicUsize::new(0));
        let pipeline = FilterPipeline::new()
            .with_stage(AddConstant { value: 1.0, calls: calls.clone() }, None)
            .with_stage(ImageNormalization, None)
            .with_stage(AddConstant { value: 10.0, calls: calls.clone() }, None);
        let out = pipeline.execute(&ramp()).unwrap();
        assert_eq!(out.min_max(), Some((10.0, 11.0)));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_failure_stops_later_stages() {
        let before = Arc::new(AtomicUsize::new(0));
        let failing = Arc::new(AtomicUsize::new(0));
        let after = Arc::new(AtomicUsize::new(0));
        let pipeline = FilterPipeline::new()
            .with_stage(AddConstant { value: 1.0, calls: before.clone() }, None)
            .with_stage(Failing { calls: failing.clone() }, None)
            .with_stage(AddConstant { value: 1.0, calls: after.clone() }, None);

        let err = pipeline.execute(&ramp()).unwrap_err();
        assert_eq!(err.stage_index(), 1);
        assert!(matches!(err.filter_error(), FilterError::Parameter(_)));
        assert!(err.to_string().contains("stage 1 (Failing)"));
        assert_eq!(before.load(Ordering::SeqCst), 1);
        assert_eq!(failing.load(Ordering::SeqCst), 1);
        assert_eq!(after.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_descriptors_do_not_execute() {
        let calls = Arc::new(AtomicUsize::new(0));
        let resampling: FilterParams = ResamplingParams::new([2, 2, 2], Interpolation::Nearest).unwrap().into();
        let pipeline = FilterPipeline::new()
            .with_stage(ImageNormalization, None)
            .with_stage(ImageResampling::new(), Some(resampling))
            .with_stage(AddConstant { value: 0.0, calls: calls.clone() }, None);

        assert_eq!(
            pipeline.descriptors(),
            vec![
                "ImageNormalization".to_string(),
                "ImageResampling(size=[2, 2, 2], interpolation=nearest)".to_string(),
                "AddConstant".to_string(),
            ]
        );
        assert_eq!(pipeline.len(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
