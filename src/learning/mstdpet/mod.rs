//! Reward modulated spike time dependent plasticity with an eligibility trace (MSTDPET).
//!
//! Correlated pre and postsynaptic activity accumulates in a decaying eligibility trace
//! and a global scalar reward decides when and how strongly that trace is turned into
//! a weight change (Florian 2007).

use ndarray::{ArrayD, IxDyn, Zip};
use tracing::{debug, trace};
use crate::{
    error::{LearningRuleError, TensorError},
    layer::{extract_layers, lookup_spikes, lookup_tensor, FromLayerRecord, OrderedDict, StateDict},
    tensor::{batch_mean, broadcast_leading, check_broadcast_leading, SharedTensor, SpikeTensor},
};
use super::{Defaults, LearningRule};


/// Hyperparameters for [`MSTDPET`]
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MSTDPETParameters {
    /// Presynaptic amplitude, not used by the trace update yet
    pub a_pre: f32,
    /// Postsynaptic amplitude, not used by the trace update yet
    pub a_post: f32,
    /// Learning rate
    pub lr: f32,
    /// Multiplicative decay applied to the eligibility trace every timestep
    pub e_trace_decay: f32,
}

impl Default for MSTDPETParameters {
    fn default() -> Self {
        MSTDPETParameters {
            a_pre: 1.,
            a_post: 1.,
            lr: 0.0001,
            e_trace_decay: (-1. / 20.0_f32).exp(),
        }
    }
}

impl From<&MSTDPETParameters> for Defaults {
    fn from(params: &MSTDPETParameters) -> Self {
        [
            ("a_pre", params.a_pre),
            ("a_post", params.a_post),
            ("lr", params.lr),
            ("e_trace_decay", params.e_trace_decay),
        ].into_iter().collect()
    }
}

/// State of a single layer used by [`MSTDPET`]
#[derive(Debug)]
pub struct MSTDPETLayer {
    pre_spikes: SpikeTensor,
    pre_trace: SharedTensor<f32>,
    post_spikes: SpikeTensor,
    post_trace: SharedTensor<f32>,
    weight: SharedTensor<f32>,
    e_trace: ArrayD<f32>,
}

impl FromLayerRecord for MSTDPETLayer {
    fn from_layer_record(key: &str, record: &StateDict) -> Result<Self, LearningRuleError> {
        let pre_spikes = lookup_spikes(record, key, "connection", "spikes")?;
        let pre_trace = lookup_tensor(record, key, "connection", "trace")?;
        let post_spikes = lookup_spikes(record, key, "neuron", "spikes")?;
        let post_trace = lookup_tensor(record, key, "neuron", "trace")?;
        let weight = lookup_tensor(record, key, "connection", "weight")?;

        let e_trace = ArrayD::zeros(IxDyn(&pre_trace.shape()?));

        Ok(MSTDPETLayer { pre_spikes, pre_trace, post_spikes, post_trace, weight, e_trace })
    }
}

fn check_shape(expected: &[usize], found: &[usize]) -> Result<(), TensorError> {
    if expected != found {
        return Err(TensorError::ShapeMismatch { expected: expected.to_vec(), found: found.to_vec() });
    }

    Ok(())
}

impl MSTDPETLayer {
    /// Weight being optimized, aliases the connection's weight
    pub fn weight(&self) -> &SharedTensor<f32> {
        &self.weight
    }

    /// Current eligibility trace, same shape as the connection trace
    pub fn e_trace(&self) -> &ArrayD<f32> {
        &self.e_trace
    }

    /// Errors if the latest network state no longer lines up with the eligibility trace
    fn check_inputs(&self) -> Result<(), TensorError> {
        let shape = self.e_trace.shape();

        check_shape(shape, &self.pre_spikes.shape()?)?;
        check_shape(shape, &self.pre_trace.shape()?)?;
        check_broadcast_leading(&self.post_spikes.shape()?, shape)?;
        check_broadcast_leading(&self.post_trace.shape()?, shape)?;

        Ok(())
    }

    fn update_e_trace(&mut self, decay: f32) -> Result<(), TensorError> {
        self.check_inputs()?;

        let shape = self.e_trace.shape().to_vec();

        let pre_spikes = self.pre_spikes.to_float()?;
        let pre_trace = self.pre_trace.read()?;
        let post_spikes = broadcast_leading(&self.post_spikes.to_float()?.view(), &shape)?;
        let post_trace = broadcast_leading(&self.post_trace.read()?.view(), &shape)?;

        // post firing after pre potentiates, pre firing after post depresses
        Zip::from(&mut self.e_trace)
            .and(&post_spikes)
            .and(&*pre_trace)
            .and(&pre_spikes)
            .and(&post_trace)
            .for_each(|e, &post_s, &pre_t, &pre_s, &post_t| {
                *e = *e * decay + post_s * pre_t - pre_s * post_t;
            });

        Ok(())
    }
}

/// Applies MSTDPET (Florian 2007) to the given layers using a single scalar reward,
/// the weight update can be applied at any timestep
///
/// ```rust
/// # use spiking_learning_rules::error::LearningRuleError;
/// use spiking_learning_rules::{
///     layer::{ConnectionState, LayerRecord, NeuronState, StateDict},
///     learning::{LearningRule, mstdpet::{MSTDPET, MSTDPETParameters}},
///     tensor::SharedTensor,
/// };
///
/// # fn main() -> Result<(), LearningRuleError> {
/// let weight = SharedTensor::from_shape_vec(&[1, 1], vec![0.5])?;
/// let record = LayerRecord::new(
///     ConnectionState {
///         spikes: SharedTensor::from_shape_vec(&[1, 1, 1], vec![false])?,
///         trace: SharedTensor::from_shape_vec(&[1, 1, 1], vec![0.5])?,
///         weight: weight.clone(),
///     },
///     NeuronState {
///         spikes: SharedTensor::from_shape_vec(&[1, 1], vec![true])?,
///         trace: SharedTensor::zeros(&[1, 1]),
///     },
/// );
/// let layers = StateDict::ordered().with("fc1", record);
///
/// let mut rule = MSTDPET::new(
///     &layers,
///     MSTDPETParameters { lr: 0.1, ..MSTDPETParameters::default() },
/// )?;
///
/// rule.update_state()?;
/// rule.step(1.)?;
///
/// assert!((weight.read()?[[0, 0]] - 0.55).abs() < 1e-6);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct MSTDPET {
    layers: OrderedDict<MSTDPETLayer>,
    defaults: Defaults,
    params: MSTDPETParameters,
}

impl MSTDPET {
    /// Checks the given layers and selects the spikes, traces and weight of each layer,
    /// allocating an empty eligibility trace for every layer
    pub fn new(layers: &StateDict, params: MSTDPETParameters) -> Result<Self, LearningRuleError> {
        let layers: OrderedDict<MSTDPETLayer> = extract_layers(layers)?;
        let defaults = Defaults::from(&params);

        debug!(
            layers = layers.len(),
            lr = params.lr,
            e_trace_decay = params.e_trace_decay,
            "constructed MSTDPET"
        );

        Ok(MSTDPET { layers, defaults, params })
    }

    pub fn parameters(&self) -> &MSTDPETParameters {
        &self.params
    }

    /// Eligibility trace of the given layer
    pub fn e_trace(&self, key: &str) -> Option<&ArrayD<f32>> {
        self.layers.get(key).map(|layer| layer.e_trace())
    }
}

impl LearningRule for MSTDPET {
    type Layer = MSTDPETLayer;
    type Signal = f32;

    fn layers(&self) -> &OrderedDict<MSTDPETLayer> {
        &self.layers
    }

    fn defaults(&self) -> &Defaults {
        &self.defaults
    }

    /// Decays the eligibility trace and adds the latest pre and postsynaptic correlations,
    /// has to be called manually after each timestep
    ///
    /// Shapes of every layer are checked first, an error leaves all traces unchanged
    fn update_state(&mut self) -> Result<(), LearningRuleError> {
        let decay = self.params.e_trace_decay;

        // no trace is touched unless every layer lines up
        for layer in self.layers.values() {
            layer.check_inputs()?;
        }

        for (key, layer) in self.layers.iter_mut() {
            trace!(layer = key, "updating eligibility trace");
            layer.update_e_trace(decay)?;
        }

        Ok(())
    }

    fn reset_state(&mut self) -> Result<(), LearningRuleError> {
        for layer in self.layers.values_mut() {
            layer.e_trace.fill(0.);
        }

        Ok(())
    }

    /// Adds `lr * reward * mean(e_trace)` to every weight, the mean is taken over the batch
    fn step(&mut self, reward: f32) -> Result<(), LearningRuleError> {
        // TODO: optional weight clamping once connections expose weight bounds
        let scale = self.params.lr * reward;

        let mut increments = Vec::with_capacity(self.layers.len());
        for (key, layer) in self.layers.iter() {
            let mut increment = batch_mean(&layer.e_trace.view())?;
            increment.mapv_inplace(|i| scale * i);

            check_shape(&layer.weight.shape()?, increment.shape())?;
            layer.weight.check_writable()?;

            trace!(layer = key, reward, "applying reward modulated update");
            increments.push(increment);
        }

        for (layer, increment) in self.layers.values().zip(increments) {
            let mut weight = layer.weight.write()?;
            *weight += &increment;
        }

        Ok(())
    }
}
