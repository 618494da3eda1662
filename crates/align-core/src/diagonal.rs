//! Diagonal alignment prior: closed-form probabilities and the feature
//! whose expectation the tension optimizer matches.
//!
//! All positions are 1-based: target position `j` ranges over `1..=m`,
//! source position `i` over `1..=n`. `NULL_WORD` alignments are handled
//! by the caller (mapper/viterbi); these functions only cover the
//! non-null diagonal distribution.

/// The (negative) distance of alignment point `(j, i)` from the diagonal,
/// in normalized sentence-length coordinates.
///
/// This is the sufficient statistic whose expectation under the model is
/// matched to its empirical expectation by the tension optimizer.
#[inline]
#[must_use]
pub fn feature(j: u32, i: u32, m: u32, n: u32) -> f64 {
    -((i as f64 / n as f64) - (j as f64 / m as f64)).abs()
}

/// The unnormalized diagonal-prior probability of aligning target
/// position `j` to source position `i`, given tension `lambda`.
#[inline]
#[must_use]
pub fn unnormalized_prob(j: u32, i: u32, m: u32, n: u32, lambda: f64) -> f64 {
    (lambda * feature(j, i, m, n)).exp()
}

/// The normalizer for the non-null alignment positions at target
/// position `j`: `sum_{i=1..=n} unnormalized_prob(j, i, m, n, lambda)`.
#[must_use]
pub fn compute_z(j: u32, m: u32, n: u32, lambda: f64) -> f64 {
    (1..=n).map(|i| unnormalized_prob(j, i, m, n, lambda)).sum()
}

/// The derivative of `log(compute_z(j, m, n, lambda))` with respect to
/// `lambda`, in closed form: the expectation of [`feature`] under the
/// (non-null) diagonal distribution at position `j`.
#[must_use]
pub fn compute_dlog_z(j: u32, m: u32, n: u32, lambda: f64) -> f64 {
    let z = compute_z(j, m, n, lambda);
    if z == 0.0 {
        return 0.0;
    }
    (1..=n)
        .map(|i| feature(j, i, m, n) * unnormalized_prob(j, i, m, n, lambda))
        .sum::<f64>()
        / z
}
