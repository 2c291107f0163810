use std::fmt::Debug;
use std::path::Path;
use std::sync::Arc;

use log::info;

use super::error::ClassifierError;
use super::onnx::OnnxModel;
use super::tree::TreeEnsemble;
use crate::features::FeatureRow;
use crate::runtime::RuntimeConfig;

/// The prediction interface of a trained category model.
///
/// Implementations are read-only after construction and shared through `Arc`.
pub trait CategoryModel: Send + Sync + Debug {
    /// Number of classes the model was trained on, when the artifact says so.
    fn n_classes(&self) -> Option<usize>;

    /// Returns the predicted class index for the row.
    fn predict(&self, row: &FeatureRow) -> Result<usize, ClassifierError>;

    /// Returns one probability per class, or `None` if the model cannot
    /// produce probabilities.
    fn predict_proba(&self, row: &FeatureRow) -> Result<Option<Vec<f64>>, ClassifierError> {
        let _ = row;
        Ok(None)
    }

    /// Short name of the backend, for logs.
    fn kind(&self) -> &'static str;
}

/// Loads a model artifact, picking the backend from the file extension:
/// `.onnx` goes through ONNX Runtime, anything else is read as a JSON tree ensemble.
///
/// # Arguments
/// * `path` - Location of the artifact on disk
/// * `runtime_config` - Session settings for ONNX models
/// * `n_classes` - Class count to report for backends that do not store it
pub fn load_model(
    path: &Path,
    runtime_config: &RuntimeConfig,
    n_classes: Option<usize>,
) -> Result<Arc<dyn CategoryModel>, ClassifierError> {
    let is_onnx = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("onnx"))
        .unwrap_or(false);

    let model: Arc<dyn CategoryModel> = if is_onnx {
        Arc::new(OnnxModel::from_file(path, runtime_config, n_classes)?)
    } else {
        Arc::new(TreeEnsemble::from_file(path)?)
    };
    info!("Loaded {} model from {:?}", model.kind(), path);
    Ok(model)
}
