use std::sync::Arc;

use log::debug;
use ndarray::Array1;

use super::decode::LabelDecoder;
use super::error::ClassifierError;
use super::model::CategoryModel;
use super::utils::{normalize_probabilities, top_k_indices};
use crate::features::{AppInputs, EncodingFallback, FeatureRow, IosVersionMode, RowBuilder};

/// One entry of the confidence ranking.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedCategory {
    pub index: usize,
    pub label: String,
    pub probability: f64,
}

/// The outcome of a successful prediction.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub class_index: usize,
    pub label: String,
    /// The row the model saw
    pub row: FeatureRow,
    /// Highest-probability categories, if the model produces probabilities
    pub top_k: Option<Vec<RankedCategory>>,
    /// Set when a categorical input had to be substituted
    pub fallback: Option<EncodingFallback>,
}

/// Predicts an app's store category from form inputs.
///
/// The classifier holds only read-only state, so it is `Send + Sync` and a
/// failed prediction never affects the next one.
///
/// ```no_run
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// use appcat::{AppInputs, ArtifactHandle, ArtifactManager, BuiltinBundle, CategoryClassifier};
///
/// let handle = ArtifactHandle::new(ArtifactManager::new_default()?, BuiltinBundle::ReleaseV1.info());
/// let classifier = CategoryClassifier::builder()
///     .with_artifacts(&*handle.get().await?)?
///     .build()?;
///
/// let prediction = classifier.predict(&AppInputs::default())?;
/// println!("Predicted category: {}", prediction.label);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct CategoryClassifier {
    pub(crate) model: Arc<dyn CategoryModel>,
    pub(crate) row_builder: RowBuilder,
    pub(crate) decoder: LabelDecoder,
    pub(crate) top_k: usize,
}

// Compile-time verification of thread-safety
const _: () = {
    fn assert_send_sync<T: Send + Sync>() {}
    fn verify_thread_safety() {
        assert_send_sync::<CategoryClassifier>();
    }
};

impl CategoryClassifier {
    /// Creates a new ClassifierBuilder for fluent construction
    pub fn builder() -> super::builder::ClassifierBuilder {
        super::builder::ClassifierBuilder::new()
    }

    /// Returns information about the classifier's current state
    pub fn info(&self) -> super::ClassifierInfo {
        let num_classes = self.known_classes();
        super::ClassifierInfo {
            model_kind: self.model.kind(),
            num_classes,
            class_labels: num_classes
                .map(|n| (0..n).map(|i| self.decoder.decode(i)).collect())
                .unwrap_or_default(),
            ios_version_mode: match self.row_builder.mode() {
                IosVersionMode::Raw => "raw",
                IosVersionMode::Encoded(_) => "encoded",
            },
            top_k: self.top_k,
        }
    }

    pub fn decoder(&self) -> &LabelDecoder {
        &self.decoder
    }

    pub fn row_builder(&self) -> &RowBuilder {
        &self.row_builder
    }

    /// Predicts the category for the given inputs.
    ///
    /// # Returns
    /// A [`Prediction`] with the decoded label, the row that was fed to the
    /// model and, when the model exposes probabilities, the top-K ranking.
    ///
    /// # Errors
    /// - `FeatureError` if the row cannot be assembled
    /// - `ModelError` if the model fails on the row
    /// - `ProbabilityError` if the probability vector is malformed
    pub fn predict(&self, inputs: &AppInputs) -> Result<Prediction, ClassifierError> {
        let built = self.row_builder.build(inputs)?;
        if let Some(fallback) = &built.fallback {
            debug!("Degraded input: {}", fallback);
        }

        let class_index = self.model.predict(&built.row)?;
        let label = self.decoder.decode(class_index);
        debug!("Model predicted class {} ({})", class_index, label);

        let top_k = match self.model.predict_proba(&built.row)? {
            Some(probabilities) => Some(self.rank(probabilities)?),
            None => None,
        };

        Ok(Prediction {
            class_index,
            label,
            row: built.row,
            top_k,
            fallback: built.fallback,
        })
    }

    /// Ranks a probability vector and decodes the top `k` entries.
    pub fn rank(&self, probabilities: Vec<f64>) -> Result<Vec<RankedCategory>, ClassifierError> {
        let expected_len = self.known_classes().unwrap_or(probabilities.len());
        let probabilities = normalize_probabilities(&Array1::from(probabilities), expected_len)?;
        Ok(top_k_indices(&probabilities, self.top_k)
            .into_iter()
            .map(|index| RankedCategory {
                index,
                label: self.decoder.decode(index),
                probability: probabilities[index],
            })
            .collect())
    }

    fn known_classes(&self) -> Option<usize> {
        self.decoder
            .encoder()
            .map(|encoder| encoder.len())
            .or_else(|| self.model.n_classes())
    }
}
