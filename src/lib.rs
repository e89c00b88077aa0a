//! # Spiking Learning Rules
//!
//! `spiking_learning_rules` implements correlation based learning rules for spiking
//! neural networks. Rules read spikes and traces exposed by connections and neurons
//! and update the connection weights in place. Currently implements reward modulated
//! spike time dependent plasticity with an eligibility trace (MSTDPET) and a
//! normalized, weight dependent STDP variant (FedeSTDP).
//!
//! Network state is shared with a rule through [`tensor::SharedTensor`] handles, the
//! network keeps writing its latest spikes and traces into the same storage the rule
//! reads from, and the rule adds its updates directly into the network's weights.
//!
//! ## Example Code
//!
//! See the `demos` folder of the repository for full training loops, each can be run
//! with `cargo run --example <name>`.
//!
//! ### Reward modulated training loop
//!
//! ```rust
//! use spiking_learning_rules::{
//!     error::LearningRuleError,
//!     layer::{ConnectionState, LayerRecord, NeuronState, StateDict},
//!     learning::{LearningRule, mstdpet::{MSTDPET, MSTDPETParameters}},
//!     tensor::SharedTensor,
//! };
//!
//! /// Runs a few timesteps where the network alternates between postsynaptic and
//! /// presynaptic firing, rewarding the network on the last timestep
//! fn train(iterations: usize) -> Result<f32, LearningRuleError> {
//!     // single synapse with a batch size of one
//!     let pre_spikes = SharedTensor::silent(&[1, 1, 1]);
//!     let pre_trace = SharedTensor::zeros(&[1, 1, 1]);
//!     let post_spikes = SharedTensor::silent(&[1, 1]);
//!     let post_trace = SharedTensor::zeros(&[1, 1]);
//!     let weight = SharedTensor::from_shape_vec(&[1, 1], vec![0.5])?;
//!
//!     let layers = StateDict::ordered().with(
//!         "fc1",
//!         LayerRecord::new(
//!             ConnectionState {
//!                 spikes: pre_spikes.clone(),
//!                 trace: pre_trace.clone(),
//!                 weight: weight.clone(),
//!             },
//!             NeuronState { spikes: post_spikes.clone(), trace: post_trace.clone() },
//!         ),
//!     );
//!
//!     let mut rule = MSTDPET::new(&layers, MSTDPETParameters::default())?;
//!
//!     for timestep in 0..iterations {
//!         // the network writes its state for the current timestep
//!         let pre_firing = timestep % 2 == 0;
//!         pre_spikes.write()?.fill(pre_firing);
//!         post_spikes.write()?.fill(!pre_firing);
//!         pre_trace.write()?.mapv_inplace(|t| 0.9 * t + if pre_firing { 1. } else { 0. });
//!         post_trace.write()?.mapv_inplace(|t| 0.9 * t + if pre_firing { 0. } else { 1. });
//!
//!         // called once per timestep, outside of any forward pass
//!         rule.update_state()?;
//!     }
//!
//!     rule.step(1.)?;
//!
//!     let updated = weight.read()?[[0, 0]];
//!
//!     Ok(updated)
//! }
//!
//! let updated = train(10).unwrap();
//! assert!(updated > 0.5);
//! ```
//!
//! ### Normalized STDP
//!
//! ```rust
//! use spiking_learning_rules::{
//!     layer::{ConnectionState, LayerRecord, NeuronState, StateDict},
//!     learning::{LearningRule, fede_stdp::{FedeSTDP, FedeSTDPParameters}},
//!     tensor::SharedTensor,
//! };
//!
//! let weight = SharedTensor::from_shape_vec(&[1], vec![0.5]).unwrap();
//! let layers = StateDict::ordered().with(
//!     "fc1",
//!     LayerRecord::new(
//!         ConnectionState {
//!             spikes: SharedTensor::silent(&[1, 1]),
//!             trace: SharedTensor::from_shape_vec(&[1, 1], vec![1.]).unwrap(),
//!             weight: weight.clone(),
//!         },
//!         NeuronState { spikes: SharedTensor::silent(&[1, 1]), trace: SharedTensor::zeros(&[1, 1]) },
//!     ),
//! );
//!
//! let mut rule = FedeSTDP::new(&layers, FedeSTDPParameters::new(0.1, 0.5, 0.5)).unwrap();
//! rule.step(()).unwrap();
//!
//! // 0.5 + 0.1 * ((e - 0.5) - (1 - 0.5))
//! assert!((weight.read().unwrap()[[0]] - 0.67183).abs() < 1e-4);
//! ```

pub mod error;
pub mod tensor;
pub mod layer;
pub mod learning;
pub mod distribution;
