//! Layer collections handed to learning rules and the tools to validate them and pull
//! out the state each rule works on.
//!
//! Layers are given as a nested state dict, the top level maps a layer key to a layer
//! record and each record holds a `connection` and a `neuron` state dict:
//!
//! ```text
//! layers
//! └── "layer_key"
//!     ├── "connection"
//!     │   ├── "spikes" : [batch, *weight_shape] (bool)
//!     │   ├── "trace"  : [batch, *weight_shape]
//!     │   └── "weight" : [*weight_shape]
//!     └── "neuron"
//!         ├── "spikes" : [batch, *post_shape] (bool)
//!         └── "trace"  : [batch, *post_shape]
//! ```
//!
//! `post_shape` lines up with the leading axes of the weight shape.

use std::collections::HashMap;
use crate::{
    error::{LayerError, LearningRuleError},
    tensor::{SharedTensor, SpikeTensor},
};


/// A map that iterates in insertion order with unique keys, inserting an existing
/// key replaces the value in place without changing its position
#[derive(Debug, Clone)]
pub struct OrderedDict<V> {
    /// Converts a key to its index in `entries`
    key_to_index: HashMap<String, usize>,
    /// Key value pairs in insertion order
    entries: Vec<(String, V)>,
}

impl<V> Default for OrderedDict<V> {
    fn default() -> Self {
        OrderedDict { key_to_index: HashMap::new(), entries: vec![] }
    }
}

impl<V> OrderedDict<V> {
    pub fn new() -> Self {
        OrderedDict::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Inserts a value, returning the previous value if the key was already present
    pub fn insert(&mut self, key: impl Into<String>, value: V) -> Option<V> {
        let key = key.into();

        match self.key_to_index.get(&key) {
            Some(&index) => Some(std::mem::replace(&mut self.entries[index].1, value)),
            None => {
                self.key_to_index.insert(key.clone(), self.entries.len());
                self.entries.push((key, value));

                None
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.key_to_index.get(key).map(|&index| &self.entries[index].1)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut V> {
        match self.key_to_index.get(key) {
            Some(&index) => Some(&mut self.entries[index].1),
            None => None,
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.key_to_index.contains_key(key)
    }

    /// First inserted entry
    pub fn first(&self) -> Option<(&str, &V)> {
        self.entries.first().map(|(key, value)| (key.as_str(), value))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.iter().map(|(_, value)| value)
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut V> {
        self.entries.iter_mut().map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut V)> {
        self.entries.iter_mut().map(|(key, value)| (key.as_str(), value))
    }
}

impl<K: Into<String>, V> FromIterator<(K, V)> for OrderedDict<V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut dict = OrderedDict::new();
        for (key, value) in iter {
            dict.insert(key, value);
        }

        dict
    }
}

impl<V> IntoIterator for OrderedDict<V> {
    type Item = (String, V);
    type IntoIter = std::vec::IntoIter<(String, V)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// A single entry of a state dict
#[derive(Debug, Clone)]
pub enum StateValue {
    /// Floating point tensor such as a trace or a weight
    Tensor(SharedTensor<f32>),
    /// Spike indicator tensor
    Spikes(SharedTensor<bool>),
    /// Nested state dict
    Dict(StateDict),
}

impl StateValue {
    pub fn as_dict(&self) -> Option<&StateDict> {
        match self {
            StateValue::Dict(dict) => Some(dict),
            _ => None,
        }
    }
}

impl From<SharedTensor<f32>> for StateValue {
    fn from(tensor: SharedTensor<f32>) -> Self {
        StateValue::Tensor(tensor)
    }
}

impl From<SharedTensor<bool>> for StateValue {
    fn from(spikes: SharedTensor<bool>) -> Self {
        StateValue::Spikes(spikes)
    }
}

impl From<StateDict> for StateValue {
    fn from(dict: StateDict) -> Self {
        StateValue::Dict(dict)
    }
}

/// A mapping of named state, either with a deterministic insertion ordering or
/// hash ordered
///
/// Learning rules only accept ordered dicts at the top level so that layers are always
/// visited in the order the caller gave them
#[derive(Debug, Clone)]
pub enum StateDict {
    Ordered(OrderedDict<StateValue>),
    Unordered(HashMap<String, StateValue>),
}

impl Default for StateDict {
    fn default() -> Self {
        StateDict::ordered()
    }
}

impl StateDict {
    /// Empty ordered state dict
    pub fn ordered() -> Self {
        StateDict::Ordered(OrderedDict::new())
    }

    /// Empty unordered state dict
    pub fn unordered() -> Self {
        StateDict::Unordered(HashMap::new())
    }

    /// Inserts the given entry and returns the dict, useful for building records inline
    pub fn with(mut self, key: impl Into<String>, value: impl Into<StateValue>) -> Self {
        self.insert(key, value);

        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<StateValue>) -> Option<StateValue> {
        match self {
            StateDict::Ordered(dict) => dict.insert(key, value.into()),
            StateDict::Unordered(dict) => dict.insert(key.into(), value.into()),
        }
    }

    pub fn get(&self, key: &str) -> Option<&StateValue> {
        match self {
            StateDict::Ordered(dict) => dict.get(key),
            StateDict::Unordered(dict) => dict.get(key),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            StateDict::Ordered(dict) => dict.len(),
            StateDict::Unordered(dict) => dict.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_ordered(&self) -> bool {
        matches!(self, StateDict::Ordered(_))
    }

    /// Iterates over entries, in insertion order if the dict is ordered
    pub fn iter(&self) -> Box<dyn Iterator<Item = (&str, &StateValue)> + '_> {
        match self {
            StateDict::Ordered(dict) => Box::new(dict.iter()),
            StateDict::Unordered(dict) => Box::new(dict.iter().map(|(key, value)| (key.as_str(), value))),
        }
    }

    /// First entry, arbitrary if the dict is unordered
    pub fn first(&self) -> Option<(&str, &StateValue)> {
        self.iter().next()
    }
}

/// State exposed by a connection between two populations
#[derive(Debug, Clone)]
pub struct ConnectionState {
    /// Presynaptic spikes arriving at each synapse, `[batch, *weight_shape]`
    pub spikes: SharedTensor<bool>,
    /// Presynaptic trace at each synapse, `[batch, *weight_shape]`
    pub trace: SharedTensor<f32>,
    /// Synaptic weights, `[*weight_shape]`
    pub weight: SharedTensor<f32>,
}

impl From<ConnectionState> for StateDict {
    fn from(connection: ConnectionState) -> Self {
        StateDict::ordered()
            .with("spikes", connection.spikes)
            .with("trace", connection.trace)
            .with("weight", connection.weight)
    }
}

/// State exposed by the postsynaptic population of a connection
#[derive(Debug, Clone)]
pub struct NeuronState {
    /// Postsynaptic spikes, `[batch, *post_shape]`
    pub spikes: SharedTensor<bool>,
    /// Postsynaptic trace, `[batch, *post_shape]`
    pub trace: SharedTensor<f32>,
}

impl From<NeuronState> for StateDict {
    fn from(neuron: NeuronState) -> Self {
        StateDict::ordered()
            .with("spikes", neuron.spikes)
            .with("trace", neuron.trace)
    }
}

/// A connection and its postsynaptic neurons which together form a single layer
#[derive(Debug, Clone)]
pub struct LayerRecord {
    pub connection: ConnectionState,
    pub neuron: NeuronState,
}

impl LayerRecord {
    pub fn new(connection: ConnectionState, neuron: NeuronState) -> Self {
        LayerRecord { connection, neuron }
    }
}

impl From<LayerRecord> for StateDict {
    fn from(record: LayerRecord) -> Self {
        StateDict::ordered()
            .with("connection", StateDict::from(record.connection))
            .with("neuron", StateDict::from(record.neuron))
    }
}

impl From<LayerRecord> for StateValue {
    fn from(record: LayerRecord) -> Self {
        StateValue::Dict(record.into())
    }
}

/// Checks that layers given to a learning rule have a deterministic ordering, are not empty,
/// and that the first layer is a state dict
///
/// Only the structure is checked, missing entries and tensor shapes are reported when
/// a learning rule extracts the state it needs
pub fn check_layers(layers: &StateDict) -> Result<(), LayerError> {
    if !layers.is_ordered() {
        return Err(LayerError::NonDeterministicOrdering);
    }

    match layers.first() {
        None => Err(LayerError::EmptyLayers),
        Some((key, value)) => match value {
            StateValue::Dict(_) => Ok(()),
            _ => Err(LayerError::MalformedLayer(String::from(key))),
        },
    }
}

/// Builds the working record a learning rule needs from a single layer record
pub trait FromLayerRecord: Sized {
    fn from_layer_record(key: &str, record: &StateDict) -> Result<Self, LearningRuleError>;
}

/// Checks the given layers and converts every layer record into a working record,
/// keeping the order the layers were given in
pub fn extract_layers<L: FromLayerRecord>(layers: &StateDict) -> Result<OrderedDict<L>, LearningRuleError> {
    check_layers(layers)?;

    let mut extracted = OrderedDict::new();
    for (key, value) in layers.iter() {
        let record = value.as_dict()
            .ok_or_else(|| LayerError::MalformedLayer(String::from(key)))?;

        extracted.insert(key, L::from_layer_record(key, record)?);
    }

    Ok(extracted)
}

fn lookup<'a>(record: &'a StateDict, layer: &str, section: &str, name: &str) -> Result<&'a StateValue, LayerError> {
    let section_dict = match record.get(section) {
        Some(StateValue::Dict(dict)) => dict,
        Some(_) => return Err(LayerError::UnexpectedEntry(format!("{}/{}", layer, section))),
        None => return Err(LayerError::MissingEntry(format!("{}/{}", layer, section))),
    };

    section_dict.get(name)
        .ok_or_else(|| LayerError::MissingEntry(format!("{}/{}/{}", layer, section, name)))
}

/// Retrieves a floating point tensor at `section/name` from a layer record
pub fn lookup_tensor(record: &StateDict, layer: &str, section: &str, name: &str) -> Result<SharedTensor<f32>, LayerError> {
    match lookup(record, layer, section, name)? {
        StateValue::Tensor(tensor) => Ok(tensor.clone()),
        _ => Err(LayerError::UnexpectedEntry(format!("{}/{}/{}", layer, section, name))),
    }
}

/// Retrieves a spike tensor at `section/name` from a layer record, spikes may be given
/// as a binary tensor or as a float tensor of `0.` and `1.`
pub fn lookup_spikes(record: &StateDict, layer: &str, section: &str, name: &str) -> Result<SpikeTensor, LayerError> {
    match lookup(record, layer, section, name)? {
        StateValue::Spikes(spikes) => Ok(SpikeTensor::Binary(spikes.clone())),
        StateValue::Tensor(spikes) => Ok(SpikeTensor::Float(spikes.clone())),
        StateValue::Dict(_) => Err(LayerError::UnexpectedEntry(format!("{}/{}/{}", layer, section, name))),
    }
}
