//! Plain-text rendering of predictions, input rows and failures.

use std::fmt::Write;

use crate::classifier::{ClassifierError, Prediction};
use crate::features::{AppInputs, FeatureRow, FormField};

/// Renders a prediction: the category, any degraded-input notice and the
/// confidence ranking when the model provides one.
pub fn prediction(prediction: &Prediction) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Results:");
    let _ = writeln!(out, "  Predicted App Category: {}", prediction.label);

    if let Some(fallback) = &prediction.fallback {
        let _ = writeln!(out, "  Note: reduced confidence, {}", fallback);
    }

    if let Some(top_k) = &prediction.top_k {
        let _ = writeln!(out, "  Confidence scores (top {}):", top_k.len());
        let width = top_k.iter().map(|r| r.label.len()).max().unwrap_or(0);
        for ranked in top_k {
            let _ = writeln!(
                out,
                "    {:<width$}  {:>5.1}%",
                ranked.label,
                ranked.probability * 100.0,
                width = width
            );
        }
    }
    out
}

/// Renders the feature row the model saw, one column per line.
pub fn row(row: &FeatureRow) -> String {
    let mut out = String::from("  Input row:\n");
    let width = row.columns().iter().map(|c| c.len()).max().unwrap_or(0);
    for (column, value) in row.iter() {
        let _ = writeln!(out, "    {:<width$}  {}", column, value, width = width);
    }
    out
}

/// Renders the current form values.
pub fn form(inputs: &AppInputs) -> String {
    let mut out = String::from("Input Parameters:\n");
    for field in FormField::ALL {
        let _ = writeln!(
            out,
            "  {:<22} [{}] {}",
            field.label(),
            field.key(),
            field.display_value(inputs)
        );
    }
    out
}

/// A user-facing message for a failed prediction. The session can continue.
pub fn failure(error: &ClassifierError) -> String {
    format!("Prediction failed: {}\nAdjust the inputs and try again.\n", error)
}
