use crate::common::*;

/// A precision/recall sample.
#[derive(Debug, Clone, Copy)]
pub struct PrecRec {
    pub precision: R64,
    pub recall: R64,
}

#[derive(Debug, Clone, Copy)]
pub enum IntegralMethod {
    /// Sample the precision envelope at evenly spaced recall positions.
    Interpolation(usize),
}

/// Average-precision integrator over a precision/recall curve.
#[derive(Debug)]
pub struct ApCalculator {
    integral_method: IntegralMethod,
}

impl ApCalculator {
    /// The COCO flavor with 101 interpolation points.
    pub fn new_coco() -> Self {
        Self::new(IntegralMethod::Interpolation(101)).unwrap()
    }

    pub fn new(integral_method: IntegralMethod) -> Result<Self> {
        let IntegralMethod::Interpolation(num_points) = integral_method;
        ensure!(
            num_points >= 2,
            "invalid number of interpolated points {}",
            num_points
        );
        Ok(Self { integral_method })
    }

    /// Compute average precision from a curve ordered by non-decreasing
    /// recall.
    pub fn compute_by_prec_rec(&self, sorted_prec_rec: &[PrecRec]) -> R64 {
        if sorted_prec_rec.is_empty() {
            return r64(0.0);
        }

        // precision envelope: running max of precision from the right
        let envelope = {
            let mut envelope = Vec::with_capacity(sorted_prec_rec.len());
            let mut max_precision = r64(0.0);
            for &PrecRec { precision, recall } in sorted_prec_rec.iter().rev() {
                max_precision = max_precision.max(precision);
                envelope.push(PrecRec {
                    precision: max_precision,
                    recall,
                });
            }
            envelope.reverse();
            envelope
        };

        let IntegralMethod::Interpolation(num_points) = self.integral_method;
        let sum: R64 = (0..num_points)
            .map(|index| r64(index as f64 / (num_points - 1) as f64))
            .map(|recall| precision_at(&envelope, recall))
            .sum();
        sum / r64(num_points as f64)
    }
}

/// Stepwise precision at a recall position; zero beyond the max recall.
fn precision_at(envelope: &[PrecRec], recall: R64) -> R64 {
    envelope
        .iter()
        .find(|point| point.recall >= recall)
        .map(|point| point.precision)
        .unwrap_or_else(|| r64(0.0))
}
