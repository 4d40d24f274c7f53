//! Error taxonomy for volumes, kernels, filters, pipelines and configs.

use std::path::PathBuf;

/// Boxed error used at the seams where callers supply their own I/O.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Invalid volume construction.
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("sample count {actual} does not match geometry size {expected}")]
    SampleCount { expected: usize, actual: usize },
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),
}

/// Failure inside a numeric kernel.
#[derive(Debug, thiserror::Error)]
pub enum KernelError {
    #[error("invalid kernel argument: {0}")]
    InvalidArgument(String),
    #[error("degenerate input: {0}")]
    Degenerate(String),
    #[error(transparent)]
    Image(#[from] ImageError),
}

/// Failure of a single filter invocation.
#[derive(Debug, thiserror::Error)]
pub enum FilterError {
    /// Missing, malformed or unsupported parameter. Raised before any numeric work.
    #[error("parameter error: {0}")]
    Parameter(String),
    /// An auxiliary image (mask, atlas) does not share the primary image's geometry.
    #[error("{auxiliary} geometry does not match image: {detail}")]
    GeometryMismatch {
        auxiliary: &'static str,
        detail: String,
    },
    #[error("kernel error: {0}")]
    Kernel(#[from] KernelError),
}

impl FilterError {
    pub(crate) fn parameter(message: impl Into<String>) -> Self {
        Self::Parameter(message.into())
    }
}

impl From<ImageError> for FilterError {
    fn from(err: ImageError) -> Self {
        Self::Kernel(KernelError::Image(err))
    }
}

/// A pipeline aborted at its first failing stage.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("stage {index} ({descriptor}) failed: {source}")]
    Stage {
        index: usize,
        descriptor: String,
        #[source]
        source: FilterError,
    },
}

impl PipelineError {
    /// Index of the stage that failed.
    pub fn stage_index(&self) -> usize {
        match self {
            Self::Stage { index, .. } => *index,
        }
    }

    /// The underlying filter error.
    pub fn filter_error(&self) -> &FilterError {
        match self {
            Self::Stage { source, .. } => source,
        }
    }
}

/// Failure while reading or building a pipeline description.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("stage {index}: {source}")]
    Stage {
        index: usize,
        #[source]
        source: FilterError,
    },
    #[error("failed to load auxiliary image {}: {source}", path.display())]
    Auxiliary {
        path: PathBuf,
        #[source]
        source: BoxError,
    },
}
