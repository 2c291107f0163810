#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FeatureError {
    #[error("Missing column {0} while assembling the feature row")]
    MissingColumn(&'static str),
    #[error("Invalid value {value:?} for field {field}")]
    InvalidInput { field: &'static str, value: String },
    #[error("Unknown form field: {0}")]
    UnknownField(String),
    #[error("Unknown content rating: {0}")]
    UnknownContentRating(String),
    #[error("Invalid default bundle: {0}")]
    InvalidDefaults(String),
    #[error("Label encoder has no classes")]
    EmptyEncoder,
}
