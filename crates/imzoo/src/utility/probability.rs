//! # Probability Utilities

/// Check that a value is a valid probability.
///
/// # Returns
///
/// `true` if ``0.0 <= prob <= 1.0``.
#[inline(always)]
pub fn is_probability(prob: f64) -> bool {
    (0.0..=1.0).contains(&prob)
}

/// Assert that a value is a valid probability, and return it.
///
/// # Panics
///
/// If the value is not in ``[0.0, 1.0]``.
#[inline(always)]
pub fn expect_probability(prob: f64) -> f64 {
    assert!(is_probability(prob), "Expected probability, found: {prob}");
    prob
}
