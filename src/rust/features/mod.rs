mod error;
pub mod inputs;
pub mod row;

pub use error::FeatureError;
pub use inputs::{AppInputs, FormField};
pub use row::{
    BuiltRow, ContentRating, DefaultBundle, EncodingFallback, FeatureRow, FeatureValue,
    IosVersionMode, RowBuilder, COLUMNS,
};
