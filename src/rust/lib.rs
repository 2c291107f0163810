//! Predicts an iOS app's App Store category from a handful of app attributes
//! using a pre-trained gradient-boosted classifier.
//!
//! The model and its label encoder are downloaded once into a local cache,
//! loaded lazily, and shared read-only by every prediction.
//!
//! # Basic Usage
//!
//! ```no_run
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use appcat::{AppInputs, ArtifactHandle, ArtifactManager, BuiltinBundle, CategoryClassifier};
//!
//! let handle = ArtifactHandle::new(ArtifactManager::new_default()?, BuiltinBundle::ReleaseV1.info());
//! let artifacts = handle.get().await?;
//!
//! let classifier = CategoryClassifier::builder()
//!     .with_artifacts(&artifacts)?
//!     .build()?;
//!
//! let prediction = classifier.predict(&AppInputs::new(500_000_000, 150.0, 4.5, 13.0, 120))?;
//! println!("Predicted App Category: {}", prediction.label);
//! # Ok(())
//! # }
//! ```
//!
//! # Local artifacts
//!
//! A model exported as tree-ensemble JSON (or as ONNX, by file extension) can be
//! used without any network access:
//!
//! ```no_run
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use appcat::{ArtifactHandle, ArtifactManager, BundleInfo};
//!
//! let bundle = BundleInfo::from_local(
//!     "local",
//!     "model.json".into(),
//!     Some("category_label_encoder.json".into()),
//! );
//! let handle = ArtifactHandle::new(ArtifactManager::new_default()?, bundle);
//! let artifacts = handle.get().await?;
//! println!("Loaded a {} model", artifacts.model.kind());
//! # Ok(())
//! # }
//! ```

pub mod artifact_manager;
pub mod artifacts;
pub mod classifier;
pub mod config;
pub mod encoder;
pub mod features;
pub mod form;
pub mod handle;
pub mod render;
mod runtime;

pub use artifact_manager::{ArtifactError, ArtifactFile, ArtifactManager};
pub use artifacts::{ArtifactInfo, ArtifactSource, BuiltinBundle, BundleInfo};
pub use classifier::{
    CategoryClassifier, CategoryModel, ClassifierBuilder, ClassifierError, ClassifierInfo,
    Prediction, RankedCategory,
};
pub use config::{AppConfig, ConfigError};
pub use encoder::LabelEncoder;
pub use features::{AppInputs, ContentRating, DefaultBundle, FeatureError, FormField, IosVersionMode};
pub use form::{InputForm, SessionSummary};
pub use handle::{ArtifactHandle, LoadedArtifacts};
pub use runtime::{create_session_builder, OptimizationLevel, RuntimeConfig};

pub fn init_logger() {
    env_logger::init();
}
