//! Numeric helpers for comparing accelerator output against the host reference.

use crate::{DiagnosticVector, Expression, Scalar};

/// Returns `true` when `actual` matches `expected` within a relative `tolerance`.
///
/// Below magnitude 1 the tolerance is absolute. NaN matches only NaN, and infinities
/// must agree in sign.
pub fn values_agree(expected: Scalar, actual: Scalar, tolerance: Scalar) -> bool {
    if expected.is_nan() || actual.is_nan() {
        return expected.is_nan() && actual.is_nan();
    }
    if expected.is_infinite() || actual.is_infinite() {
        return expected == actual;
    }
    (expected - actual).abs() <= tolerance * expected.abs().max(1.0)
}

/// Absolute residual used for reporting; non-finite agreement counts as zero.
pub fn residual(expected: Scalar, actual: Scalar) -> Scalar {
    if values_agree(expected, actual, 0.0) {
        0.0
    } else if expected.is_finite() && actual.is_finite() {
        (expected - actual).abs()
    } else {
        Scalar::INFINITY
    }
}

/// Slots of `actual` that disagree with the diagnostics expected for `expr`.
pub fn diagnostic_mismatches(
    expr: &Expression,
    actual: &DiagnosticVector,
    tolerance: Scalar,
) -> Vec<usize> {
    let expected = DiagnosticVector::expected_for(expr);
    expected
        .as_array()
        .iter()
        .zip(actual.as_array().iter())
        .enumerate()
        .filter(|(_, (e, a))| !values_agree(**e, **a, tolerance))
        .map(|(slot, _)| slot)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Operator;

    #[test]
    fn agreement_rules() {
        assert!(values_agree(8.0, 8.0, 0.0));
        assert!(values_agree(1000.0, 1000.001, 1e-5));
        assert!(!values_agree(1000.0, 1001.0, 1e-5));
        assert!(values_agree(f32::NAN, f32::NAN, 1e-5));
        assert!(!values_agree(f32::NAN, 0.0, 1e-5));
        assert!(values_agree(f32::INFINITY, f32::INFINITY, 0.0));
        assert!(!values_agree(f32::INFINITY, f32::NEG_INFINITY, 1e-5));
        assert!(!values_agree(f32::MAX, f32::INFINITY, 1e-5));
    }

    #[test]
    fn residual_is_zero_for_matching_non_finite() {
        assert_eq!(residual(f32::INFINITY, f32::INFINITY), 0.0);
        assert_eq!(residual(f32::NAN, f32::NAN), 0.0);
        assert_eq!(residual(2.0, 2.5), 0.5);
        assert_eq!(residual(1.0, f32::NAN), f32::INFINITY);
    }

    #[test]
    fn mismatched_lane_is_reported() {
        let expr = Expression::new(Operator::Multiply, 3.0, 4.0);
        let mut diag = DiagnosticVector::expected_for(&expr);
        assert!(diagnostic_mismatches(&expr, &diag, 1e-6).is_empty());

        diag.0[5] = 0.0;
        assert_eq!(diagnostic_mismatches(&expr, &diag, 1e-6), vec![5]);
    }
}
