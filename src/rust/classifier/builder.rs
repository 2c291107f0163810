use std::sync::Arc;

use log::info;

use super::classifier::CategoryClassifier;
use super::decode::LabelDecoder;
use super::error::ClassifierError;
use super::model::CategoryModel;
use crate::encoder::LabelEncoder;
use crate::features::{DefaultBundle, IosVersionMode, RowBuilder};
use crate::handle::LoadedArtifacts;

/// Number of ranked categories shown when the model reports probabilities.
pub const DEFAULT_TOP_K: usize = 5;

/// A builder for constructing a CategoryClassifier with a fluent interface.
#[derive(Debug)]
pub struct ClassifierBuilder {
    model: Option<Arc<dyn CategoryModel>>,
    target_encoder: Option<LabelEncoder>,
    ios_mode: Option<IosVersionMode>,
    defaults: DefaultBundle,
    top_k: usize,
}

impl Default for ClassifierBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassifierBuilder {
    /// Creates a new empty ClassifierBuilder instance with default configuration
    ///
    /// # Example
    /// ```
    /// use appcat::ClassifierBuilder;
    ///
    /// let builder = ClassifierBuilder::new();
    /// ```
    pub fn new() -> Self {
        Self {
            model: None,
            target_encoder: None,
            ios_mode: None,
            defaults: DefaultBundle::default(),
            top_k: DEFAULT_TOP_K,
        }
    }

    /// Takes the model and encoders of a loaded bundle.
    ///
    /// A bundle that ships an iOS version encoder switches the row builder
    /// to encoded mode; otherwise the version string is passed through.
    pub fn with_artifacts(self, artifacts: &LoadedArtifacts) -> Result<Self, ClassifierError> {
        let mode = match &artifacts.ios_encoder {
            Some(encoder) => IosVersionMode::Encoded(encoder.clone()),
            None => IosVersionMode::Raw,
        };
        let mut builder = self
            .with_model(Arc::clone(&artifacts.model))?
            .with_ios_mode(mode)?;
        if let Some(encoder) = &artifacts.target_encoder {
            builder = builder.with_label_encoder(encoder.clone());
        }
        info!("Classifier configured from bundle {}", artifacts.bundle);
        Ok(builder)
    }

    /// Sets the model used for prediction
    ///
    /// # Returns
    /// * `Result<Self, ClassifierError>` - The builder instance, or a `BuildError`
    ///   if a model was already set
    pub fn with_model(mut self, model: Arc<dyn CategoryModel>) -> Result<Self, ClassifierError> {
        if self.model.is_some() {
            return Err(ClassifierError::BuildError("Model already set".to_string()));
        }
        self.model = Some(model);
        Ok(self)
    }

    /// Sets the encoder that maps class indices back to category names
    pub fn with_label_encoder(mut self, encoder: LabelEncoder) -> Self {
        self.target_encoder = Some(encoder);
        self
    }

    /// Chooses how `Required_IOS_Version` enters the feature row.
    ///
    /// A deployment uses a single mode: asking for a different mode than one
    /// already chosen is a `BuildError`.
    pub fn with_ios_mode(mut self, mode: IosVersionMode) -> Result<Self, ClassifierError> {
        match &self.ios_mode {
            Some(current) if *current != mode => Err(ClassifierError::BuildError(
                "Required_IOS_Version mode already chosen for this deployment".to_string(),
            )),
            _ => {
                self.ios_mode = Some(mode);
                Ok(self)
            }
        }
    }

    /// Replaces the values used for columns the form does not collect
    pub fn with_defaults(mut self, defaults: DefaultBundle) -> Self {
        self.defaults = defaults;
        self
    }

    /// Sets how many ranked categories a prediction carries
    pub fn with_top_k(mut self, top_k: usize) -> Result<Self, ClassifierError> {
        if top_k == 0 {
            return Err(ClassifierError::ValidationError("top_k must be at least 1".into()));
        }
        self.top_k = top_k;
        Ok(self)
    }

    /// Builds and returns the final CategoryClassifier instance
    ///
    /// # Returns
    /// * `Result<CategoryClassifier, ClassifierError>` - The constructed classifier, or an error if:
    ///   - No model has been set
    ///   - The label encoder and the model disagree on the number of classes
    ///   - The iOS version encoder is empty
    pub fn build(self) -> Result<CategoryClassifier, ClassifierError> {
        let model = self
            .model
            .ok_or_else(|| ClassifierError::BuildError("Model must be set".to_string()))?;

        if let (Some(encoder), Some(n_classes)) = (&self.target_encoder, model.n_classes()) {
            if encoder.len() != n_classes {
                return Err(ClassifierError::BuildError(format!(
                    "Label encoder has {} classes but the model predicts {}",
                    encoder.len(),
                    n_classes
                )));
            }
        }

        let row_builder = RowBuilder::new(self.defaults, self.ios_mode.unwrap_or_default())?;
        Ok(CategoryClassifier {
            model,
            row_builder,
            decoder: LabelDecoder::new(self.target_encoder),
            top_k: self.top_k,
        })
    }
}
