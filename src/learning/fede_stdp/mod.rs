//! Normalized, weight dependent STDP from Paredes-Valles et al. that averages the
//! update over the batch dimension.

use ndarray::{ArrayD, Zip};
use tracing::{debug, trace, warn};
use crate::{
    error::{HyperparameterError, LearningRuleError, TensorError},
    layer::{extract_layers, lookup_tensor, FromLayerRecord, OrderedDict, StateDict},
    tensor::{batch_mean, find_max, SharedTensor},
};
use super::{Defaults, LearningRule};


/// Hyperparameters for [`FedeSTDP`]
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FedeSTDPParameters {
    /// Learning rate, must be positive
    pub lr: f32,
    /// Weight the update pulls towards
    pub w_init: f32,
    /// Offset between potentiation and depression, must fall between `0` and `1`
    pub a: f32,
}

impl FedeSTDPParameters {
    pub fn new(lr: f32, w_init: f32, a: f32) -> Self {
        FedeSTDPParameters { lr, w_init, a }
    }

    /// Errors if the learning rate is not positive or `a` is outside of `[0, 1]`
    pub fn validate(&self) -> Result<(), HyperparameterError> {
        if !(self.lr > 0.) {
            return Err(HyperparameterError::NonPositiveLearningRate(self.lr));
        }
        if !(0. ..=1.).contains(&self.a) {
            return Err(HyperparameterError::AsymmetryOutOfRange(self.a));
        }

        Ok(())
    }
}

impl From<&FedeSTDPParameters> for Defaults {
    fn from(params: &FedeSTDPParameters) -> Self {
        [
            ("lr", params.lr),
            ("w_init", params.w_init),
            ("a", params.a),
        ].into_iter().collect()
    }
}

/// State of a single layer used by [`FedeSTDP`]
#[derive(Debug, Clone)]
pub struct FedeSTDPLayer {
    trace: SharedTensor<f32>,
    weight: SharedTensor<f32>,
}

impl FromLayerRecord for FedeSTDPLayer {
    fn from_layer_record(key: &str, record: &StateDict) -> Result<Self, LearningRuleError> {
        Ok(FedeSTDPLayer {
            trace: lookup_tensor(record, key, "connection", "trace")?,
            weight: lookup_tensor(record, key, "connection", "weight")?,
        })
    }
}

impl FedeSTDPLayer {
    /// Weight being optimized, aliases the connection's weight
    pub fn weight(&self) -> &SharedTensor<f32> {
        &self.weight
    }

    /// Connection trace the update is calculated from
    pub fn trace(&self) -> &SharedTensor<f32> {
        &self.trace
    }
}

/// Shape of the trace once aligned with the weight, anything in front of the weight
/// shape is batch
fn align_with_weight(weight_shape: &[usize], trace_shape: &[usize]) -> Result<Vec<usize>, TensorError> {
    let weight_size: usize = weight_shape.iter().product();
    let trace_size: usize = trace_shape.iter().product();

    if weight_size == 0 || trace_size % weight_size != 0 {
        return Err(TensorError::ShapeMismatch {
            expected: weight_shape.to_vec(),
            found: trace_shape.to_vec(),
        });
    }
    if trace_size == 0 {
        return Err(TensorError::EmptyBatch);
    }

    let mut shape = vec![trace_size / weight_size];
    shape.extend_from_slice(weight_shape);

    Ok(shape)
}

/// STDP variant from Paredes-Valles that normalizes the trace by its maximum and pulls
/// weights towards `w_init`, the update is averaged over the batch dimension
///
/// The rule keeps no state of its own so [`LearningRule::update_state`] and
/// [`LearningRule::reset_state`] do nothing
#[derive(Debug)]
pub struct FedeSTDP {
    layers: OrderedDict<FedeSTDPLayer>,
    defaults: Defaults,
    params: FedeSTDPParameters,
}

impl FedeSTDP {
    /// Checks the hyperparameters and the given layers, selecting the connection
    /// trace and weight of each layer
    pub fn new(layers: &StateDict, params: FedeSTDPParameters) -> Result<Self, LearningRuleError> {
        params.validate()?;

        let layers: OrderedDict<FedeSTDPLayer> = extract_layers(layers)?;
        let defaults = Defaults::from(&params);

        debug!(
            layers = layers.len(),
            lr = params.lr,
            w_init = params.w_init,
            a = params.a,
            "constructed FedeSTDP"
        );

        Ok(FedeSTDP { layers, defaults, params })
    }

    pub fn parameters(&self) -> &FedeSTDPParameters {
        &self.params
    }

    /// Calculates the weight change for a single layer without applying it
    pub fn weight_increment(&self, layer: &FedeSTDPLayer) -> Result<ArrayD<f32>, LearningRuleError> {
        let FedeSTDPParameters { lr, w_init, a } = self.params;

        let weight = layer.weight.read()?;
        let trace = layer.trace.read()?;

        let batched_shape = align_with_weight(weight.shape(), trace.shape())?;
        let trace = trace.to_shape(batched_shape.clone())
            .map_err(|_| TensorError::ShapeMismatch {
                expected: batched_shape.clone(),
                found: trace.shape().to_vec(),
            })?;

        let max = find_max(&trace.view()).ok_or(TensorError::EmptyBatch)?;
        if !(max > 0.) || !max.is_finite() {
            warn!(max, "normalizing trace by a non positive or non finite maximum");
        }

        let dw = weight.mapv(|w| w - w_init);
        let dw = dw.broadcast(batched_shape.clone())
            .ok_or_else(|| TensorError::IncompatibleBroadcast {
                from: weight.shape().to_vec(),
                to: batched_shape,
            })?;

        let per_sample = Zip::from(&trace)
            .and(&dw)
            .map_collect(|&t, &d| {
                let norm_trace = t / max;

                let ltp_w = (-d).exp();
                let ltp_t = norm_trace.exp() - a;

                let ltd_w = -(d.exp());
                let ltd_t = (1. - norm_trace).exp() - a;

                ltp_w * ltp_t + ltd_w * ltd_t
            });

        let mut increment = batch_mean(&per_sample.view())?;
        increment.mapv_inplace(|i| lr * i);

        Ok(increment)
    }
}

impl LearningRule for FedeSTDP {
    type Layer = FedeSTDPLayer;
    type Signal = ();

    fn layers(&self) -> &OrderedDict<FedeSTDPLayer> {
        &self.layers
    }

    fn defaults(&self) -> &Defaults {
        &self.defaults
    }

    fn update_state(&mut self) -> Result<(), LearningRuleError> {
        Ok(())
    }

    fn reset_state(&mut self) -> Result<(), LearningRuleError> {
        Ok(())
    }

    /// Updates layers in order, a layer sharing its weight with an earlier layer sees
    /// the weight after the earlier update
    ///
    /// Every layer is checked before any weight is written, an error leaves all
    /// weights unchanged
    fn step(&mut self, _: ()) -> Result<(), LearningRuleError> {
        for layer in self.layers.values() {
            align_with_weight(&layer.weight.shape()?, &layer.trace.shape()?)?;
            layer.weight.check_writable()?;
        }

        for (key, layer) in self.layers.iter() {
            trace!(layer = key, "applying normalized stdp update");

            let increment = self.weight_increment(layer)?;
            *layer.weight.write()? += &increment;
        }

        Ok(())
    }
}
