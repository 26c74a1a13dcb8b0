//! Detection thresholds for instantaneous hand jumps.
//!
//! A fitted polynomial maps the angle between the jump direction and the
//! saccade direction (in the view plane) to the largest offset, in meters,
//! that goes unnoticed. Two coefficient sets were fit to the study data in
//! R; either can be swapped for custom-fitted coefficients.

/// Polynomial detection-threshold model. Coefficients are stored
/// low-order-first and evaluated in `f64`.
#[derive(Debug, Clone)]
pub struct DetectionThresholdModel {
    coefficients: Vec<f64>,
}

impl DetectionThresholdModel {
    /// Order-2 fit without derivative constraints.
    pub fn order2_unconstrained() -> Self {
        Self {
            coefficients: vec![0.0020174414, -0.0000288204, 9.172646e-07],
        }
    }

    /// Order-4 fit with the derivatives at 0 and 180 degrees constrained
    /// to zero.
    pub fn order4_constrained() -> Self {
        Self {
            coefficients: vec![0.0028410482, 0.0, -2.136055e-06, 3.934331e-08, -1.309667e-10],
        }
    }

    /// Custom-fitted coefficients, low-order-first.
    pub fn from_coefficients(coefficients: Vec<f64>) -> Self {
        Self { coefficients }
    }

    /// Largest unnoticeable hand jump, in meters, for the given angle in
    /// degrees between jump direction and saccade direction. Angles
    /// outside [0, 180] are folded back into the range first.
    pub fn approximate_threshold(&self, angle_deg: f32) -> f32 {
        let mut angle = angle_deg;
        if angle > 180.0 {
            angle = 360.0 - angle;
        }
        if angle < 0.0 {
            angle = -angle;
        }

        let x = angle as f64;
        let mut value = 0.0;
        for &c in self.coefficients.iter().rev() {
            value = value * x + c;
        }
        value as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order2_at_zero_is_constant_term() {
        let model = DetectionThresholdModel::order2_unconstrained();
        assert!((model.approximate_threshold(0.0) - 0.0020174414).abs() < 1e-9);
    }

    #[test]
    fn test_order2_known_value() {
        let model = DetectionThresholdModel::order2_unconstrained();
        // 9.172646e-7 * 90^2 - 2.88204e-5 * 90 + 2.0174414e-3
        let expected = 9.172646e-07 * 8100.0 - 0.0000288204 * 90.0 + 0.0020174414;
        let got = model.approximate_threshold(90.0) as f64;
        assert!((got - expected).abs() < 1e-9, "got {got}, expected {expected}");
    }

    #[test]
    fn test_order4_endpoints() {
        let model = DetectionThresholdModel::order4_constrained();
        assert!((model.approximate_threshold(0.0) - 0.0028410482).abs() < 1e-9);
        let at_180 = model.approximate_threshold(180.0);
        let at_90 = model.approximate_threshold(90.0);
        assert!(at_180 > 0.0 && at_90 > 0.0);
    }

    #[test]
    fn test_fold_into_range() {
        let model = DetectionThresholdModel::order2_unconstrained();
        assert_eq!(
            model.approximate_threshold(190.0),
            model.approximate_threshold(170.0)
        );
        assert_eq!(
            model.approximate_threshold(-45.0),
            model.approximate_threshold(45.0)
        );
    }

    #[test]
    fn test_custom_coefficients() {
        // constant model: always 5 cm
        let model = DetectionThresholdModel::from_coefficients(vec![0.05]);
        assert_eq!(model.approximate_threshold(123.0), 0.05);
    }
}
