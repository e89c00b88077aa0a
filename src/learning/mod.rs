//! Correlation based learning rules that update synaptic weights from spikes and traces.
//!
//! A training loop calls [`LearningRule::update_state`] once after every simulation
//! timestep and [`LearningRule::step`] whenever the accumulated changes should be
//! committed to the weights.

use crate::{
    error::LearningRuleError,
    layer::{OrderedDict, StateDict},
};
pub mod mstdpet;
pub mod fede_stdp;


/// Hyperparameters a learning rule was constructed with, kept for introspection
/// and never modified after construction
#[derive(Debug, Clone, Default)]
pub struct Defaults {
    values: OrderedDict<f32>,
}

impl Defaults {
    pub fn get(&self, name: &str) -> Option<f32> {
        self.values.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f32)> {
        self.values.iter().map(|(name, value)| (name, *value))
    }
}

impl<'a> FromIterator<(&'a str, f32)> for Defaults {
    fn from_iter<I: IntoIterator<Item = (&'a str, f32)>>(iter: I) -> Self {
        Defaults { values: iter.into_iter().collect() }
    }
}

/// Handles updating weights of a set of layers given their spiking activity
pub trait LearningRule {
    /// Per layer working state the rule operates on
    type Layer;
    /// Argument given when committing an update, a reward for reward modulated
    /// rules and `()` for unsupervised rules
    type Signal;
    /// Layers being optimized in the order they were given
    fn layers(&self) -> &OrderedDict<Self::Layer>;
    /// Hyperparameters the rule was constructed with
    fn defaults(&self) -> &Defaults;
    /// Updates any time dependent state based on the latest network activity, should
    /// be called exactly once per simulation timestep and not from within a forward pass
    fn update_state(&mut self) -> Result<(), LearningRuleError>;
    /// Performs a single learning step, updating the weights in place
    fn step(&mut self, signal: Self::Signal) -> Result<(), LearningRuleError>;
    /// Clears any persistent state of the rule without changing weights
    fn reset_state(&mut self) -> Result<(), LearningRuleError>;
    /// Adds a new group of layers to an existing rule, currently does nothing
    fn add_layer_group(&mut self, _layers: StateDict) -> Result<(), LearningRuleError> {
        Ok(())
    }
}
