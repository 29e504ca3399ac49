use tract_core::prelude::DatumType;

/// Everything that can go wrong while loading or running a recognizer.
///
/// `Configuration` is a startup failure. Every other variant is scoped to the
/// request that produced it.
#[derive(Debug, thiserror::Error)]
pub enum RecognizeError {
    #[error("configuration error: {reason}")]
    Configuration {
        reason: String,
        #[source]
        source: Option<anyhow::Error>,
    },
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("could not decode image")]
    Decode(#[source] image::ImageError),
    #[error(
        "expected model to produce a [1 N] shaped tensor where N is the number of labels, instead it produced one with shape {0:?}"
    )]
    ShapeMismatch(Vec<usize>),
    #[error("recognizer is not ready: model and labels must both be loaded")]
    NotLoaded,
    #[error("class index {index} is out of range for a label table of {labels} entries")]
    IndexOutOfRange { index: usize, labels: usize },
    #[error("model produced an empty probability vector")]
    NoClasses,
    #[error("best class probability at index {0} is not finite")]
    NonFiniteProbability(usize),
    #[error("a node named {0:?} already exists in this graph")]
    DuplicateNode(String),
    #[error("tensor handle {0:?} does not belong to this graph")]
    ForeignHandle(String),
    #[error("{op} takes {expected} input(s), {got} given")]
    Arity { op: &'static str, expected: usize, got: usize },
    #[error("{op} does not support {dt:?} inputs")]
    UnsupportedType { op: &'static str, dt: DatumType },
    #[error("execution failed: {0}")]
    Execution(#[source] anyhow::Error),
    #[error("recognition did not complete within {0:?}")]
    DeadlineExceeded(std::time::Duration),
    #[error("{0} recognition workers already running")]
    Overloaded(usize),
}

impl RecognizeError {
    pub fn configuration(reason: impl Into<String>) -> RecognizeError {
        RecognizeError::Configuration { reason: reason.into(), source: None }
    }

    pub(crate) fn configuration_from(
        reason: impl Into<String>,
        source: anyhow::Error,
    ) -> RecognizeError {
        RecognizeError::Configuration { reason: reason.into(), source: Some(source) }
    }

    /// True for failures that only affect the current request.
    pub fn is_per_request(&self) -> bool {
        !matches!(self, RecognizeError::Configuration { .. })
    }

    /// True for failures that reveal a bug in graph construction rather than a bad input.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            RecognizeError::DuplicateNode(_)
                | RecognizeError::ForeignHandle(_)
                | RecognizeError::Arity { .. }
                | RecognizeError::UnsupportedType { .. }
        )
    }
}

pub type RecognizeResult<T> = std::result::Result<T, RecognizeError>;
