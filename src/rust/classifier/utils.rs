use ndarray::Array1;

use super::error::ClassifierError;

/// Validates a probability vector and rescales it to sum to one.
pub(crate) fn normalize_probabilities(
    probabilities: &Array1<f64>,
    expected_len: usize,
) -> Result<Array1<f64>, ClassifierError> {
    if probabilities.len() != expected_len {
        return Err(ClassifierError::ProbabilityError(format!(
            "Expected {} probabilities, got {}",
            expected_len,
            probabilities.len()
        )));
    }
    if let Some(pos) = probabilities.iter().position(|p| !p.is_finite() || *p < 0.0) {
        return Err(ClassifierError::ProbabilityError(format!(
            "Probability {} is {} (must be finite and nonnegative)",
            pos, probabilities[pos]
        )));
    }
    let sum = probabilities.sum();
    if sum <= 0.0 {
        return Err(ClassifierError::ProbabilityError("Probabilities sum to zero".into()));
    }
    Ok(probabilities / sum)
}

/// Indices of the `k` largest probabilities, highest first. Equal
/// probabilities keep their original index order.
pub(crate) fn top_k_indices(probabilities: &Array1<f64>, k: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..probabilities.len()).collect();
    order.sort_by(|&a, &b| {
        probabilities[b]
            .partial_cmp(&probabilities[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    order.truncate(k);
    order
}
