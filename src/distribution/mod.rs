//! Tools to generate clamped noise and randomly initialized weights.

use ndarray::{ArrayD, IxDyn};
use rand::Rng;
use rand_distr::{Distribution, Normal};
use crate::error::HyperparameterError;


/// Samples the normal distribution at the given mean and standard deviation and clamps
/// the output value between the given minimum and maximum, if standard deviation is `0.` the
/// mean is always returned
pub fn limited_distr<R: Rng + ?Sized>(
    rng: &mut R,
    mean: f32,
    std: f32,
    minimum: f32,
    maximum: f32,
) -> Result<f32, HyperparameterError> {
    if !(std >= 0.) {
        return Err(HyperparameterError::InvalidDistribution { mean, std });
    }
    if std == 0.0 {
        return Ok(mean);
    }

    let normal = Normal::new(mean, std)
        .map_err(|_| HyperparameterError::InvalidDistribution { mean, std })?;
    let output: f32 = normal.sample(rng);

    Ok(output.max(minimum).min(maximum))
}

/// Generates a weight tensor of the given shape where each weight is drawn
/// using [`limited_distr`]
pub fn random_weights<R: Rng + ?Sized>(
    rng: &mut R,
    shape: &[usize],
    mean: f32,
    std: f32,
    minimum: f32,
    maximum: f32,
) -> Result<ArrayD<f32>, HyperparameterError> {
    if !(std >= 0.) {
        return Err(HyperparameterError::InvalidDistribution { mean, std });
    }
    if std == 0.0 {
        return Ok(ArrayD::from_elem(IxDyn(shape), mean));
    }

    let normal = Normal::new(mean, std)
        .map_err(|_| HyperparameterError::InvalidDistribution { mean, std })?;

    Ok(
        ArrayD::from_shape_fn(IxDyn(shape), |_| {
            let output: f32 = normal.sample(rng);

            output.max(minimum).min(maximum)
        })
    )
}
