pub mod artifacts;
pub mod engine;
pub mod features;
pub mod model;
pub mod scaler;

pub use artifacts::{ArtifactError, ArtifactSource, FsArtifactSource, ModelArtifacts};
pub use engine::{SuggestError, SuggestionEngine, SuggestionResult};

/// A vector handed to a scaler or model had the wrong number of values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{stage} expects {expected} values, got {actual}")]
pub struct ShapeError {
    pub stage: &'static str,
    pub expected: usize,
    pub actual: usize,
}

impl ShapeError {
    pub(crate) fn check(stage: &'static str, expected: usize, actual: usize) -> Result<(), Self> {
        if expected == actual {
            Ok(())
        } else {
            Err(Self {
                stage,
                expected,
                actual,
            })
        }
    }
}
