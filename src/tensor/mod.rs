//! Shared tensor handles so learning rules can read and update network state in place.

use std::{
    cell::{Ref, RefCell, RefMut},
    rc::Rc,
};
use ndarray::{ArrayD, ArrayViewD, Axis, IxDyn};
use crate::error::TensorError;


/// A handle to caller owned tensor storage, cloning the handle aliases the same
/// underlying array rather than copying it
///
/// Handles are single threaded, the network and the learning rule take turns accessing
/// the storage and an access while another mutable access is alive returns
/// [`TensorError::TensorBorrowed`]
///
/// ```rust
/// # use ndarray::{ArrayD, IxDyn};
/// use spiking_learning_rules::tensor::SharedTensor;
///
/// let weight = SharedTensor::new(ArrayD::<f32>::zeros(IxDyn(&[2, 3])));
/// let alias = weight.clone();
///
/// alias.write().unwrap().fill(0.5);
///
/// assert!(weight.ptr_eq(&alias));
/// assert!(weight.read().unwrap().iter().all(|i| *i == 0.5));
/// ```
#[derive(Debug)]
pub struct SharedTensor<A> {
    inner: Rc<RefCell<ArrayD<A>>>,
}

impl<A> Clone for SharedTensor<A> {
    fn clone(&self) -> Self {
        SharedTensor { inner: Rc::clone(&self.inner) }
    }
}

impl<A> From<ArrayD<A>> for SharedTensor<A> {
    fn from(array: ArrayD<A>) -> Self {
        SharedTensor::new(array)
    }
}

impl<A> SharedTensor<A> {
    /// Wraps the given array in a new handle
    pub fn new(array: ArrayD<A>) -> Self {
        SharedTensor { inner: Rc::new(RefCell::new(array)) }
    }

    /// Immutably borrows the underlying array
    pub fn read(&self) -> Result<Ref<'_, ArrayD<A>>, TensorError> {
        self.inner.try_borrow().map_err(|_| TensorError::TensorBorrowed)
    }

    /// Mutably borrows the underlying array
    pub fn write(&self) -> Result<RefMut<'_, ArrayD<A>>, TensorError> {
        self.inner.try_borrow_mut().map_err(|_| TensorError::TensorBorrowed)
    }

    /// Errors if the underlying array could not currently be written to
    pub fn check_writable(&self) -> Result<(), TensorError> {
        self.write().map(|_| ())
    }

    /// Returns the shape of the underlying array
    pub fn shape(&self) -> Result<Vec<usize>, TensorError> {
        Ok(self.read()?.shape().to_vec())
    }

    /// Returns `true` if both handles point to the same storage
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<A: Clone> SharedTensor<A> {
    /// Creates a handle from a flat vector of values in row major order
    pub fn from_shape_vec(shape: &[usize], values: Vec<A>) -> Result<Self, TensorError> {
        let found = vec![values.len()];

        ArrayD::from_shape_vec(IxDyn(shape), values)
            .map(SharedTensor::new)
            .map_err(|_| TensorError::ShapeMismatch { expected: shape.to_vec(), found })
    }

    /// Copies the current contents out of the handle
    pub fn to_owned_array(&self) -> Result<ArrayD<A>, TensorError> {
        Ok(self.read()?.clone())
    }
}

impl SharedTensor<f32> {
    /// Tensor of zeros with the given shape
    pub fn zeros(shape: &[usize]) -> Self {
        SharedTensor::new(ArrayD::zeros(IxDyn(shape)))
    }
}

impl SharedTensor<bool> {
    /// Spike tensor where no unit is firing
    pub fn silent(shape: &[usize]) -> Self {
        SharedTensor::new(ArrayD::from_elem(IxDyn(shape), false))
    }
}

/// Casts a spike indicator tensor to `1.` where spiking and `0.` otherwise
pub fn spikes_to_float(spikes: &ArrayViewD<bool>) -> ArrayD<f32> {
    spikes.mapv(|is_spiking| if is_spiking { 1. } else { 0. })
}

/// Handle to a spike indicator tensor, either binary or already given as `0.`/`1.` floats
#[derive(Debug, Clone)]
pub enum SpikeTensor {
    Binary(SharedTensor<bool>),
    Float(SharedTensor<f32>),
}

impl From<SharedTensor<bool>> for SpikeTensor {
    fn from(spikes: SharedTensor<bool>) -> Self {
        SpikeTensor::Binary(spikes)
    }
}

impl From<SharedTensor<f32>> for SpikeTensor {
    fn from(spikes: SharedTensor<f32>) -> Self {
        SpikeTensor::Float(spikes)
    }
}

impl SpikeTensor {
    pub fn shape(&self) -> Result<Vec<usize>, TensorError> {
        match self {
            SpikeTensor::Binary(spikes) => spikes.shape(),
            SpikeTensor::Float(spikes) => spikes.shape(),
        }
    }

    /// Reads the spikes as a float tensor, float spikes are used as given
    pub fn to_float(&self) -> Result<ArrayD<f32>, TensorError> {
        match self {
            SpikeTensor::Binary(spikes) => Ok(spikes_to_float(&spikes.read()?.view())),
            SpikeTensor::Float(spikes) => spikes.to_owned_array(),
        }
    }
}

/// Checks that a tensor of shape `from` can be broadcast to `to` by [`broadcast_leading`]
pub fn check_broadcast_leading(from: &[usize], to: &[usize]) -> Result<(), TensorError> {
    let compatible = from.len() <= to.len()
        && from.iter().zip(to.iter()).all(|(f, t)| f == t || *f == 1);

    if !compatible {
        return Err(TensorError::IncompatibleBroadcast { from: from.to_vec(), to: to.to_vec() });
    }

    Ok(())
}

/// Broadcasts a tensor whose axes line up with the leading axes of `shape`,
/// trailing axes are padded with length one before broadcasting
///
/// A neuron tensor of shape `[batch, post]` is broadcast against a connection tensor
/// of shape `[batch, post, pre]` this way
pub fn broadcast_leading(tensor: &ArrayViewD<f32>, shape: &[usize]) -> Result<ArrayD<f32>, TensorError> {
    let incompatible = || TensorError::IncompatibleBroadcast {
        from: tensor.shape().to_vec(),
        to: shape.to_vec(),
    };

    if tensor.ndim() > shape.len() {
        return Err(incompatible());
    }

    let mut padded = tensor.shape().to_vec();
    padded.resize(shape.len(), 1);

    let reshaped = tensor.to_shape(padded).map_err(|_| incompatible())?;
    let broadcasted = reshaped.broadcast(shape.to_vec()).ok_or_else(incompatible)?;

    Ok(broadcasted.to_owned())
}

/// Averages a tensor over its leading batch axis
pub fn batch_mean(tensor: &ArrayViewD<f32>) -> Result<ArrayD<f32>, TensorError> {
    if tensor.ndim() == 0 {
        return Err(TensorError::EmptyBatch);
    }

    tensor.mean_axis(Axis(0)).ok_or(TensorError::EmptyBatch)
}

/// Largest value in the tensor, `NaN` is treated as larger than every other value
pub fn find_max(tensor: &ArrayViewD<f32>) -> Option<f32> {
    tensor.iter().copied().max_by(|a, b| a.total_cmp(b))
}
