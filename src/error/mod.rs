use std::fmt::{Display, Debug, Formatter, Result};


/// Error set for structural problems with the layers given to a learning rule
#[derive(Clone, PartialEq, Eq)]
pub enum LayerError {
    /// Layers must be given with a deterministic ordering (an ordered state dict)
    NonDeterministicOrdering,
    /// No layers were given so there is nothing to optimize
    EmptyLayers,
    /// Layer record under the given key is not a state dict
    MalformedLayer(String),
    /// Entry at the given path could not be found in a layer record
    MissingEntry(String),
    /// Entry at the given path is not of the expected kind
    UnexpectedEntry(String),
}

impl Display for LayerError {
    fn fmt(&self, f: &mut Formatter) -> Result {
        match self {
            LayerError::NonDeterministicOrdering => write!(
                f, "Layers should be given with a deterministic ordering, got an unordered state dict"
            ),
            LayerError::EmptyLayers => write!(f, "Got an empty layers collection"),
            LayerError::MalformedLayer(key) => write!(f, "Layer record `{}` should be a state dict", key),
            LayerError::MissingEntry(path) => write!(f, "Entry `{}` not found in layer record", path),
            LayerError::UnexpectedEntry(path) => write!(f, "Entry `{}` is not of the expected kind", path),
        }
    }
}

impl Debug for LayerError {
    fn fmt(&self, f: &mut Formatter) -> Result {
        write!(f, "file: {}, line: {}, error: {}", file!(), line!(), self)
    }
}

/// Error set for invalid learning rule hyperparameters
#[derive(Clone, PartialEq)]
pub enum HyperparameterError {
    /// Learning rate must be strictly positive
    NonPositiveLearningRate(f32),
    /// Asymmetry offset must fall between `0` and `1`
    AsymmetryOutOfRange(f32),
    /// Normal distribution cannot be built from the given mean and standard deviation
    InvalidDistribution { mean: f32, std: f32 },
}

impl Display for HyperparameterError {
    fn fmt(&self, f: &mut Formatter) -> Result {
        match self {
            HyperparameterError::NonPositiveLearningRate(lr) => write!(
                f, "Learning rate should be positive, got {}", lr
            ),
            HyperparameterError::AsymmetryOutOfRange(a) => write!(
                f, "Asymmetry offset `a` should fall between 0 and 1, got {}", a
            ),
            HyperparameterError::InvalidDistribution { mean, std } => write!(
                f, "Cannot sample a normal distribution with mean {} and standard deviation {}", mean, std
            ),
        }
    }
}

impl Debug for HyperparameterError {
    fn fmt(&self, f: &mut Formatter) -> Result {
        write!(f, "file: {}, line: {}, error: {}", file!(), line!(), self)
    }
}

/// Error set for tensor access and shape problems during an update
#[derive(Clone, PartialEq, Eq)]
pub enum TensorError {
    /// Tensor shapes do not match
    ShapeMismatch { expected: Vec<usize>, found: Vec<usize> },
    /// Tensor cannot be broadcast to the given shape
    IncompatibleBroadcast { from: Vec<usize>, to: Vec<usize> },
    /// Batch dimension is missing or has a length of zero
    EmptyBatch,
    /// Tensor is already borrowed elsewhere and cannot be accessed
    TensorBorrowed,
}

impl Display for TensorError {
    fn fmt(&self, f: &mut Formatter) -> Result {
        match self {
            TensorError::ShapeMismatch { expected, found } => write!(
                f, "Expected tensor of shape {:?}, found {:?}", expected, found
            ),
            TensorError::IncompatibleBroadcast { from, to } => write!(
                f, "Cannot broadcast tensor of shape {:?} to {:?}", from, to
            ),
            TensorError::EmptyBatch => write!(f, "Tensor has an empty batch dimension"),
            TensorError::TensorBorrowed => write!(f, "Tensor is already borrowed"),
        }
    }
}

impl Debug for TensorError {
    fn fmt(&self, f: &mut Formatter) -> Result {
        write!(f, "file: {}, line: {}, error: {}", file!(), line!(), self)
    }
}

/// A set of errors that may occur when using the library
#[derive(Clone, PartialEq)]
pub enum LearningRuleError {
    /// Errors related to the structure of the given layers
    LayerRelatedError(LayerError),
    /// Errors related to hyperparameters
    HyperparameterRelatedError(HyperparameterError),
    /// Errors related to tensor access and shapes
    TensorRelatedError(TensorError),
}

impl Display for LearningRuleError {
    fn fmt(&self, f: &mut Formatter) -> Result {
        match self {
            LearningRuleError::LayerRelatedError(err) => write!(f, "{}", err),
            LearningRuleError::HyperparameterRelatedError(err) => write!(f, "{}", err),
            LearningRuleError::TensorRelatedError(err) => write!(f, "{}", err),
        }
    }
}

impl Debug for LearningRuleError {
    fn fmt(&self, f: &mut Formatter) -> Result {
        write!(f, "file: {}, line: {}, error: {}", file!(), line!(), self)
    }
}

impl std::error::Error for LearningRuleError {}

impl From<LayerError> for LearningRuleError {
    fn from(err: LayerError) -> LearningRuleError {
        LearningRuleError::LayerRelatedError(err)
    }
}

impl From<HyperparameterError> for LearningRuleError {
    fn from(err: HyperparameterError) -> LearningRuleError {
        LearningRuleError::HyperparameterRelatedError(err)
    }
}

impl From<TensorError> for LearningRuleError {
    fn from(err: TensorError) -> LearningRuleError {
        LearningRuleError::TensorRelatedError(err)
    }
}
