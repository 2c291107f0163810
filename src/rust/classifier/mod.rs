mod builder;
#[allow(clippy::module_inception)]
mod classifier;
mod decode;
mod error;
mod model;
mod onnx;
mod tree;
mod utils;

pub use builder::{ClassifierBuilder, DEFAULT_TOP_K};
pub use classifier::{CategoryClassifier, Prediction, RankedCategory};
pub use decode::LabelDecoder;
pub use error::ClassifierError;
pub use model::{load_model, CategoryModel};
pub use onnx::OnnxModel;
pub use tree::{Node, Tree, TreeEnsemble};

/// Information about the current state and configuration of a classifier
#[derive(Debug, Clone)]
pub struct ClassifierInfo {
    /// Which model implementation is loaded ("tree-ensemble", "onnx")
    pub model_kind: &'static str,
    /// Number of classes, when the encoder or the model knows it
    pub num_classes: Option<usize>,
    /// Decoded labels of the classes, in index order
    pub class_labels: Vec<String>,
    /// How `Required_IOS_Version` enters the feature row ("raw" or "encoded")
    pub ios_version_mode: &'static str,
    /// Number of ranked categories a prediction carries
    pub top_k: usize,
}
