//! Vector math helpers on top of [`glam::Vec2`].
//!
//! The engine leans on glam for everything it already does well: arithmetic
//! operators, `length`, `normalize_or_zero` (zero-length safe), `dot`,
//! `distance`, `clamp_length_max`, and `is_nan`. The one gap is scalar
//! division, which glam resolves to Inf/NaN when the divisor is zero; the
//! steering math wants that case surfaced as an error instead, so
//! [`VecExt::checked_div`] exists.

use glam::Vec2;

use crate::error::MathError;

/// Extension methods for [`Vec2`].
pub trait VecExt: Sized {
    /// Divide by a scalar, failing on a zero divisor instead of silently
    /// producing Inf/NaN components.
    fn checked_div(self, divisor: f32) -> Result<Self, MathError>;
}

impl VecExt for Vec2 {
    fn checked_div(self, divisor: f32) -> Result<Self, MathError> {
        if divisor == 0.0 {
            return Err(MathError::DivisionByZero);
        }
        Ok(self / divisor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checked_div_scales_components() {
        let v = Vec2::new(8.0, -2.0).checked_div(2.0).unwrap();
        assert_eq!(v, Vec2::new(4.0, -1.0));
    }

    #[test]
    fn checked_div_rejects_zero_divisor() {
        let err = Vec2::new(1.0, 1.0).checked_div(0.0).unwrap_err();
        assert_eq!(err, MathError::DivisionByZero);
    }

    // The remaining operations the engine depends on come straight from
    // glam; these pin the exact semantics relied upon.

    #[test]
    fn normalize_or_zero_is_zero_safe() {
        assert_eq!(Vec2::ZERO.normalize_or_zero(), Vec2::ZERO);

        let unit = Vec2::new(3.0, 4.0).normalize_or_zero();
        assert!((unit.length() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn clamp_length_max_only_shrinks() {
        let short = Vec2::new(1.0, 0.0);
        assert_eq!(short.clamp_length_max(5.0), short);

        let long = Vec2::new(30.0, 40.0).clamp_length_max(5.0);
        assert!((long.length() - 5.0).abs() < 1e-4);
        // Direction preserved
        assert!((long.normalize_or_zero() - Vec2::new(0.6, 0.8)).length() < 1e-6);
    }

    #[test]
    fn nan_detection_catches_either_component() {
        assert!(Vec2::new(f32::NAN, 0.0).is_nan());
        assert!(Vec2::new(0.0, f32::NAN).is_nan());
        assert!(!Vec2::new(1.0, 2.0).is_nan());
    }
}
