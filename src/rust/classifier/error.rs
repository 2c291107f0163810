use ort::Error as OrtError;
use std::fmt;

use crate::features::FeatureError;

/// Represents the different types of errors that can occur while predicting a category.
///
/// All of these are recoverable: a failed prediction leaves the classifier
/// untouched and the next call starts from scratch.
#[derive(Debug, Clone, PartialEq)]
pub enum ClassifierError {
    /// The input could not be turned into a feature row
    FeatureError(FeatureError),
    /// The model rejected the row or failed while evaluating it
    ModelError(String),
    /// The model produced a probability vector that cannot be ranked
    ProbabilityError(String),
    /// The classifier could not be assembled from its parts
    BuildError(String),
    /// A model artifact is structurally invalid
    ValidationError(String),
}

impl fmt::Display for ClassifierError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FeatureError(err) => write!(f, "Feature error: {}", err),
            Self::ModelError(msg) => write!(f, "Model error: {}", msg),
            Self::ProbabilityError(msg) => write!(f, "Probability error: {}", msg),
            Self::BuildError(msg) => write!(f, "Build error: {}", msg),
            Self::ValidationError(msg) => write!(f, "Validation error: {}", msg),
        }
    }
}

impl std::error::Error for ClassifierError {}

impl From<FeatureError> for ClassifierError {
    fn from(err: FeatureError) -> Self {
        ClassifierError::FeatureError(err)
    }
}

impl From<OrtError> for ClassifierError {
    fn from(err: OrtError) -> Self {
        ClassifierError::BuildError(err.to_string())
    }
}
