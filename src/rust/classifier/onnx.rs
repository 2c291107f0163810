use std::collections::HashMap;
use std::path::Path;

use log::debug;
use ndarray::Array2;
use ort::session::Session;
use ort::value::Tensor;

use super::error::ClassifierError;
use super::model::CategoryModel;
use crate::features::{ContentRating, FeatureRow, FeatureValue};
use crate::features::row::CONTENT_RATING;
use crate::runtime::{create_session_builder, RuntimeConfig};

/// A category model exported to ONNX.
///
/// # Model Input Format
/// - one float tensor of shape `[1, 10]`, columns in feature-row order
/// - `Content_Rating` is fed as its ordinal, other string cells must parse as numbers,
///   so the iOS version works in both raw and encoded mode
///
/// # Model Output Format
/// - output 0: predicted label, `int64` tensor of shape `[1]`
/// - output 1 (optional): class probabilities, `float` tensor of shape `[1, n_classes]`
///   (exporters must disable ZipMap so probabilities come out as a plain tensor)
#[derive(Debug)]
pub struct OnnxModel {
    session: Session,
    input_name: String,
    n_classes: Option<usize>,
}

impl OnnxModel {
    pub fn from_file(
        path: &Path,
        config: &RuntimeConfig,
        n_classes: Option<usize>,
    ) -> Result<Self, ClassifierError> {
        let session = create_session_builder(config)?
            .commit_from_file(path)
            .map_err(|e| ClassifierError::ValidationError(format!("Failed to load ONNX model: {}", e)))?;
        Self::validate_model(&session)?;
        let input_name = session.inputs[0].name.clone();
        Ok(Self {
            session,
            input_name,
            n_classes,
        })
    }

    /// Validates that the model has one input and at least one output.
    fn validate_model(session: &Session) -> Result<(), ClassifierError> {
        if session.inputs.len() != 1 {
            return Err(ClassifierError::ValidationError(format!(
                "Model must have exactly 1 input (the feature row), found {}",
                session.inputs.len()
            )));
        }
        if session.outputs.is_empty() {
            return Err(ClassifierError::ValidationError(
                "Model must have at least 1 output for labels".to_string(),
            ));
        }
        Ok(())
    }

    fn run(&self, row: &FeatureRow, want_proba: bool) -> Result<(usize, Option<Vec<f64>>), ClassifierError> {
        let features = numeric_row(row)?;
        let input_array = Array2::from_shape_vec((1, features.len()), features)
            .map_err(|e| ClassifierError::ModelError(format!("Failed to create input array: {}", e)))?;
        let input_dyn = input_array.into_dyn();
        let input_row = input_dyn.as_standard_layout();

        let mut input_tensors = HashMap::new();
        input_tensors.insert(
            self.input_name.as_str(),
            Tensor::from_array(&input_row)
                .map_err(|e| ClassifierError::ModelError(format!("Failed to create input tensor: {}", e)))?,
        );

        let outputs = self
            .session
            .run(input_tensors)
            .map_err(|e| ClassifierError::ModelError(format!("Failed to run model: {}", e)))?;

        let labels = outputs[0]
            .try_extract_tensor::<i64>()
            .map_err(|e| ClassifierError::ModelError(format!("Failed to extract label tensor: {}", e)))?;
        let label = labels
            .iter()
            .next()
            .copied()
            .ok_or_else(|| ClassifierError::ModelError("Model returned no label".into()))?;
        let label = usize::try_from(label)
            .map_err(|_| ClassifierError::ModelError(format!("Model returned negative label {}", label)))?;

        let probabilities = if want_proba && self.session.outputs.len() > 1 {
            match outputs[1].try_extract_tensor::<f32>() {
                Ok(tensor) => Some(tensor.iter().map(|&p| p as f64).collect()),
                Err(e) => {
                    debug!("Second output is not a float tensor, skipping probabilities: {}", e);
                    None
                }
            }
        } else {
            None
        };

        Ok((label, probabilities))
    }
}

/// Flattens a feature row into the float vector the ONNX graph expects.
pub(crate) fn numeric_row(row: &FeatureRow) -> Result<Vec<f32>, ClassifierError> {
    row.iter()
        .map(|(column, value)| match value {
            FeatureValue::Str(level) if column == CONTENT_RATING => {
                Ok(level.parse::<ContentRating>()?.ordinal() as f32)
            }
            other => other.as_f64().map(|v| v as f32).ok_or_else(|| {
                ClassifierError::ModelError(format!(
                    "Column {} value {:?} is not numeric",
                    column,
                    other.to_string()
                ))
            }),
        })
        .collect()
}

impl CategoryModel for OnnxModel {
    fn n_classes(&self) -> Option<usize> {
        self.n_classes
    }

    fn predict(&self, row: &FeatureRow) -> Result<usize, ClassifierError> {
        self.run(row, false).map(|(label, _)| label)
    }

    fn predict_proba(&self, row: &FeatureRow) -> Result<Option<Vec<f64>>, ClassifierError> {
        self.run(row, true).map(|(_, probabilities)| probabilities)
    }

    fn kind(&self) -> &'static str {
        "onnx"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{AppInputs, RowBuilder};

    #[test]
    fn test_numeric_row_maps_content_rating() {
        let row = RowBuilder::default().build(&AppInputs::default()).unwrap().row;
        let values = numeric_row(&row).unwrap();
        assert_eq!(values.len(), 10);
        assert_eq!(values[3], 13.0);
        assert_eq!(values[5], 0.0);
        assert_eq!(values[6], 2023.0);
    }

    #[test]
    fn test_garbage_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.onnx");
        std::fs::write(&path, b"not an onnx graph").unwrap();
        let err = OnnxModel::from_file(&path, &RuntimeConfig::default(), Some(3)).unwrap_err();
        assert!(matches!(err, ClassifierError::ValidationError(_) | ClassifierError::BuildError(_)));
    }
}
