//! Case-insensitive string similarity.

/// Jaro–Winkler similarity of the lowercased inputs, in `[0, 1]`.
///
/// Pure and deterministic. Two empty strings score `1.0`.
#[must_use]
pub fn similarity(a: &str, b: &str) -> f64 {
    strsim::jaro_winkler(&a.to_lowercase(), &b.to_lowercase())
}

/// Similarity of two optional attributes; a missing side never matches.
#[must_use]
pub fn attribute_similarity(a: Option<&str>, b: Option<&str>) -> Option<f64> {
    Some(similarity(a?, b?))
}
