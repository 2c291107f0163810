use std::collections::HashMap;

use lazy_static::lazy_static;

use crate::encoder::LabelEncoder;

lazy_static! {
    /// Primary App Store categories in the order a label encoder fitted on the
    /// category names assigns them.
    static ref BUILTIN_CATEGORIES: HashMap<u64, &'static str> = [
        "Book",
        "Business",
        "Developer Tools",
        "Education",
        "Entertainment",
        "Finance",
        "Food & Drink",
        "Games",
        "Graphics & Design",
        "Health & Fitness",
        "Lifestyle",
        "Magazines & Newspapers",
        "Medical",
        "Music",
        "Navigation",
        "News",
        "Photo & Video",
        "Productivity",
        "Reference",
        "Shopping",
        "Social Networking",
        "Sports",
        "Stickers",
        "Travel",
        "Utilities",
        "Weather",
    ]
    .iter()
    .enumerate()
    .map(|(i, name)| (i as u64, *name))
    .collect();
}

/// Turns class indices into category names.
///
/// Resolution order:
/// 1. the target encoder's class name, when an encoder is loaded and its
///    class name is not itself a number;
/// 2. the built-in category table, keyed by the encoder's numeric class name
///    or by the raw index when there is no encoder;
/// 3. `"Class <index>"`.
///
/// Decoding never fails and never returns an empty string.
#[derive(Debug, Clone, Default)]
pub struct LabelDecoder {
    encoder: Option<LabelEncoder>,
}

impl LabelDecoder {
    pub fn new(encoder: Option<LabelEncoder>) -> Self {
        Self { encoder }
    }

    pub fn encoder(&self) -> Option<&LabelEncoder> {
        self.encoder.as_ref()
    }

    pub fn decode(&self, index: usize) -> String {
        let table_key = match self.encoder.as_ref().and_then(|e| e.inverse_transform(index)) {
            Some(name) => match name.trim().parse::<u64>() {
                Ok(code) => Some(code),
                Err(_) if !name.trim().is_empty() => return name.to_string(),
                Err(_) => None,
            },
            None if self.encoder.is_none() => Some(index as u64),
            None => None,
        };

        table_key
            .and_then(|key| BUILTIN_CATEGORIES.get(&key))
            .map(|name| name.to_string())
            .unwrap_or_else(|| format!("Class {}", index))
    }
}
