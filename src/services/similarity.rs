use ndarray::ArrayView1;

/// Cosine similarity between two equal-length vectors, in [-1, 1].
///
/// Either vector having a zero norm yields 0.0: a profile with no signal
/// ranks at the bottom instead of erroring. Unequal lengths are a caller
/// bug and panic.
pub fn cosine_similarity(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
    assert_eq!(
        a.len(),
        b.len(),
        "similarity vectors must have equal length"
    );
    let norm_a = a.dot(&a).sqrt();
    let norm_b = b.dot(&b).sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    a.dot(&b) / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::aview1;

    #[test]
    fn test_self_similarity_is_one() {
        let v = [4.0, 3.5, 5.0, 4.2];
        assert!((cosine_similarity(aview1(&v), aview1(&v)) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_vector_yields_zero() {
        let a = [0.0, 0.0, 0.0];
        let b = [1.0, 2.0, 3.0];
        assert_eq!(cosine_similarity(aview1(&a), aview1(&b)), 0.0);
        assert_eq!(cosine_similarity(aview1(&b), aview1(&a)), 0.0);
    }

    #[test]
    fn test_opposite_vectors_are_negative_one() {
        let a = [1.0, 2.0];
        let b = [-1.0, -2.0];
        assert!((cosine_similarity(aview1(&a), aview1(&b)) + 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_orthogonal_vectors_are_zero() {
        let a = [1.0, 0.0];
        let b = [0.0, 1.0];
        assert!(cosine_similarity(aview1(&a), aview1(&b)).abs() < 1e-9);
    }

    #[test]
    #[should_panic(expected = "equal length")]
    fn test_length_mismatch_panics() {
        let a = [1.0, 2.0];
        let b = [1.0, 2.0, 3.0];
        cosine_similarity(aview1(&a), aview1(&b));
    }
}
