use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// A fitted mapping between string classes and integer indices.
///
/// The index of a class is its position in the class list. [`LabelEncoder::fit`]
/// sorts and de-duplicates its input, so fitted encoders use lexicographic
/// order. An encoder read from disk keeps the saved order exactly, since that
/// order is the mapping the model was trained with.
///
/// The on-disk format is JSON:
///
/// ```json
/// { "classes": ["Book", "Business", "Education"] }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "EncoderFile", into = "EncoderFile")]
pub struct LabelEncoder {
    classes: Vec<String>,
    index: HashMap<String, usize>,
}

#[derive(Serialize, Deserialize)]
struct EncoderFile {
    classes: Vec<String>,
}

impl TryFrom<EncoderFile> for LabelEncoder {
    type Error = String;

    fn try_from(file: EncoderFile) -> Result<Self, Self::Error> {
        if file.classes.is_empty() {
            return Err("label encoder must list at least one class".into());
        }
        let mut index = HashMap::with_capacity(file.classes.len());
        for (i, class) in file.classes.iter().enumerate() {
            if let Some(first) = index.insert(class.clone(), i) {
                return Err(format!(
                    "label encoder lists class {:?} twice (positions {} and {})",
                    class, first, i
                ));
            }
        }
        Ok(Self {
            classes: file.classes,
            index,
        })
    }
}

impl From<LabelEncoder> for EncoderFile {
    fn from(encoder: LabelEncoder) -> Self {
        Self { classes: encoder.classes }
    }
}

/// Result of encoding a value that may be outside the fitted vocabulary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Encoded {
    Known(usize),
    /// The value was unseen; `index` points at `substitute`.
    Substituted { index: usize, substitute: String },
}

impl Encoded {
    pub fn index(&self) -> usize {
        match self {
            Self::Known(index) | Self::Substituted { index, .. } => *index,
        }
    }
}

impl LabelEncoder {
    /// Fits an encoder on the given values, sorting and de-duplicating them.
    pub fn fit<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut classes: Vec<String> = values.into_iter().map(Into::into).collect();
        classes.sort();
        classes.dedup();
        let index = classes
            .iter()
            .enumerate()
            .map(|(i, class)| (class.clone(), i))
            .collect();
        Self { classes, index }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let bytes = std::fs::read(path.as_ref()).map_err(|e| e.to_string())?;
        serde_json::from_slice(&bytes).map_err(|e| e.to_string())
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn transform(&self, value: &str) -> Option<usize> {
        self.index.get(value).copied()
    }

    /// Encodes `value`, substituting the lexicographically maximal known class
    /// when `value` was never seen during fitting.
    ///
    /// Returns `None` only for an empty encoder.
    pub fn transform_or_max(&self, value: &str) -> Option<Encoded> {
        if let Some(index) = self.transform(value) {
            return Some(Encoded::Known(index));
        }
        let (index, substitute) = self
            .classes
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.cmp(b))?;
        Some(Encoded::Substituted {
            index,
            substitute: substitute.clone(),
        })
    }

    pub fn inverse_transform(&self, index: usize) -> Option<&str> {
        self.classes.get(index).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ios_encoder() -> LabelEncoder {
        LabelEncoder::fit(["9.0", "13.0", "12.1", "8.0", "13.0"])
    }

    #[test]
    fn test_fit_sorts_and_dedups() {
        let encoder = ios_encoder();
        assert_eq!(encoder.classes(), &["12.1", "13.0", "8.0", "9.0"]);
    }

    #[test]
    fn test_round_trip() {
        let encoder = ios_encoder();
        let index = encoder.transform("13.0").unwrap();
        assert_eq!(encoder.inverse_transform(index), Some("13.0"));
    }

    #[test]
    fn test_unseen_value_uses_max_class() {
        let encoder = ios_encoder();
        let encoded = encoder.transform_or_max("17.4").unwrap();
        assert_eq!(
            encoded,
            Encoded::Substituted { index: 3, substitute: "9.0".into() }
        );
        assert_eq!(encoder.inverse_transform(encoded.index()), Some("9.0"));
    }

    #[test]
    fn test_deserialize_rejects_empty() {
        assert!(serde_json::from_str::<LabelEncoder>(r#"{"classes": []}"#).is_err());
    }

    #[test]
    fn test_saved_order_is_kept() {
        let json = r#"{"classes": ["Utilities", "Games", "Education"]}"#;
        let encoder: LabelEncoder = serde_json::from_str(json).unwrap();
        assert_eq!(encoder.classes(), &["Utilities", "Games", "Education"]);
        assert_eq!(encoder.inverse_transform(0), Some("Utilities"));
        assert_eq!(encoder.inverse_transform(2), Some("Education"));
        assert_eq!(encoder.transform("Games"), Some(1));
        assert_eq!(
            encoder.transform_or_max("Weather"),
            Some(Encoded::Substituted { index: 0, substitute: "Utilities".into() })
        );
    }

    #[test]
    fn test_deserialize_rejects_duplicates() {
        let json = r#"{"classes": ["Utilities", "Games", "Education", "Games"]}"#;
        let err = serde_json::from_str::<LabelEncoder>(json).unwrap_err();
        assert!(err.to_string().contains("twice"));
    }

    #[test]
    fn test_serialize_keeps_order() {
        let json = r#"{"classes":["b","a"]}"#;
        let encoder: LabelEncoder = serde_json::from_str(json).unwrap();
        assert_eq!(serde_json::to_string(&encoder).unwrap(), json);
    }
}
