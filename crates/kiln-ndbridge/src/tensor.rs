//! Native Tensor Handles
//!
//! The bridge's view of the tensor engine: a dtype tag, a dimension vector
//! and a contiguous byte buffer. Engine buffers are reference-counted so
//! several tensor handles can share one allocation (`alias`); a buffer can
//! be moved out exclusively only while a single handle owns it, which is
//! what makes the zero-copy handoff to the array runtime safe.
//!
//! A tensor can also *adopt* an ndarray's storage instead of owning engine
//! memory: the storage reference is released when the tensor drops, so the
//! backing bytes survive exactly as long as the tensor needs them.

use std::fmt;
use std::sync::Arc;

use crate::array::{element_count, NdArray};
use crate::dtype::DType;
use crate::error::{BridgeError, BridgeResult};
use crate::ownership::OwnershipToken;

// ============================================================================
// Engine Allocations
// ============================================================================

/// A buffer owned by the tensor engine's allocator.
///
/// The release token is the engine's deallocation hook: it fires exactly
/// once when the allocation dies, wherever that happens to be. Moving the
/// allocation (or re-homing the token during an exclusive transfer) never
/// duplicates the hook.
pub struct EngineAlloc {
    bytes: Box<[u8]>,
    release: OwnershipToken,
}

impl EngineAlloc {
    pub(crate) fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes: bytes.into_boxed_slice(),
            release: OwnershipToken::inert(),
        }
    }

    pub(crate) fn with_release(
        bytes: Vec<u8>,
        release: impl FnOnce() + Send + Sync + 'static,
    ) -> Self {
        Self {
            bytes: bytes.into_boxed_slice(),
            release: OwnershipToken::new(release),
        }
    }

    pub(crate) fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    pub(crate) fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Move the deallocation hook out, leaving the allocation's own drop
    /// path inert. Part of the exclusive-transfer handoff.
    pub(crate) fn take_release(&mut self) -> OwnershipToken {
        self.release.take()
    }
}

impl fmt::Debug for EngineAlloc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineAlloc")
            .field("len", &self.bytes.len())
            .field("release", &self.release)
            .finish()
    }
}

// ============================================================================
// Tensor Handles
// ============================================================================

/// Backing buffer of a native tensor.
#[derive(Debug)]
pub(crate) enum TensorBuf {
    /// Engine-allocated memory, possibly shared by sibling handles
    Engine(Arc<EngineAlloc>),
    /// Storage adopted from the array runtime; the reference is released
    /// when the tensor drops (the deferred decrement)
    Adopted(NdArray),
}

/// The tensor engine's in-memory tensor handle.
#[derive(Debug)]
pub struct NativeTensor {
    dtype: DType,
    dims: Vec<i64>,
    buf: TensorBuf,
}

impl NativeTensor {
    /// Create a tensor over a fresh engine allocation.
    ///
    /// For fixed-width dtypes the data must exactly fill
    /// `element count x element width`. String tensors carry the packed
    /// encoding and resource tensors an opaque blob; neither is sized here.
    pub fn new(dtype: DType, dims: Vec<i64>, data: Vec<u8>) -> BridgeResult<Self> {
        Self::from_alloc(dtype, dims, EngineAlloc::new(data))
    }

    /// Create a tensor whose allocation fires `release` when it dies.
    pub fn with_release(
        dtype: DType,
        dims: Vec<i64>,
        data: Vec<u8>,
        release: impl FnOnce() + Send + Sync + 'static,
    ) -> BridgeResult<Self> {
        Self::from_alloc(dtype, dims, EngineAlloc::with_release(data, release))
    }

    fn from_alloc(dtype: DType, dims: Vec<i64>, alloc: EngineAlloc) -> BridgeResult<Self> {
        let count = element_count(&dims)?;
        if let Some(width) = dtype.fixed_width() {
            let expected = (count as usize).checked_mul(width).ok_or_else(|| {
                BridgeError::invalid_argument(format!("shape {dims:?} overflows byte size"))
            })?;
            if alloc.len() != expected {
                return Err(BridgeError::invalid_argument(format!(
                    "buffer holds {} bytes but shape {dims:?} of {dtype} needs {expected}",
                    alloc.len()
                )));
            }
        }
        Ok(Self {
            dtype,
            dims,
            buf: TensorBuf::Engine(Arc::new(alloc)),
        })
    }

    /// Create a tensor that adopts an ndarray's storage without copying.
    pub(crate) fn adopt(dtype: DType, dims: Vec<i64>, array: NdArray) -> BridgeResult<Self> {
        if !array.is_dense() {
            return Err(BridgeError::internal(
                "cannot adopt an ndarray without dense storage",
            ));
        }
        element_count(&dims)?;
        Ok(Self {
            dtype,
            dims,
            buf: TensorBuf::Adopted(array),
        })
    }

    /// Get the dtype tag
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    /// Get the declared dimensions
    pub fn dims(&self) -> &[i64] {
        &self.dims
    }

    /// Get the number of dimensions
    pub fn num_dims(&self) -> usize {
        self.dims.len()
    }

    /// Get the total byte size of the backing buffer
    pub fn byte_size(&self) -> usize {
        self.data().len()
    }

    /// Borrow the backing bytes
    pub fn data(&self) -> &[u8] {
        match &self.buf {
            TensorBuf::Engine(alloc) => alloc.as_slice(),
            TensorBuf::Adopted(array) => array.data().unwrap_or(&[]),
        }
    }

    /// Base pointer of the backing bytes, for aliasing checks
    pub fn data_ptr(&self) -> *const u8 {
        self.data().as_ptr()
    }

    /// Create a second handle sharing this tensor's buffer.
    pub fn alias(&self) -> NativeTensor {
        let buf = match &self.buf {
            TensorBuf::Engine(alloc) => TensorBuf::Engine(Arc::clone(alloc)),
            TensorBuf::Adopted(array) => TensorBuf::Adopted(array.clone()),
        };
        Self {
            dtype: self.dtype,
            dims: self.dims.clone(),
            buf,
        }
    }

    /// Derive the ndarray shape and element count for this tensor.
    ///
    /// Resource tensors must be scalars and surface as a rank-1 byte array
    /// spanning the whole buffer; every other dtype uses the declared
    /// dimensions, with an empty dimension vector meaning one element.
    pub fn resolved_shape(&self) -> BridgeResult<(Vec<i64>, i64)> {
        if self.dtype.is_resource() {
            if !self.dims.is_empty() {
                return Err(BridgeError::invalid_argument(
                    "fetching of non-scalar resource tensors is not supported",
                ));
            }
            let nbytes = self.byte_size() as i64;
            return Ok((vec![nbytes], nbytes));
        }
        let count = element_count(&self.dims)?;
        Ok((self.dims.clone(), count))
    }

    /// Attempt to take exclusive ownership of the engine buffer.
    ///
    /// Granted only when this handle is the buffer's sole owner; a shared
    /// or adopted buffer returns the handle intact so the caller can fall
    /// back to copying.
    pub(crate) fn try_move(self) -> Result<EngineAlloc, NativeTensor> {
        let Self { dtype, dims, buf } = self;
        match buf {
            TensorBuf::Engine(alloc) => Arc::try_unwrap(alloc).map_err(|alloc| Self {
                dtype,
                dims,
                buf: TensorBuf::Engine(alloc),
            }),
            buf @ TensorBuf::Adopted(_) => Err(Self { dtype, dims, buf }),
        }
    }

    pub(crate) fn into_parts(self) -> (DType, Vec<i64>, TensorBuf) {
        (self.dtype, self.dims, self.buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_new_fixed_width_size_check() {
        let tensor = NativeTensor::new(DType::Int32, vec![2, 3], vec![0u8; 24]).unwrap();
        assert_eq!(tensor.byte_size(), 24);

        let err = NativeTensor::new(DType::Int32, vec![2, 3], vec![0u8; 20]).unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn test_string_tensor_unsized() {
        // Packed encodings are validated by the codec, not at construction.
        let tensor = NativeTensor::new(DType::Str, vec![3], vec![0u8; 7]).unwrap();
        assert_eq!(tensor.byte_size(), 7);
    }

    #[test]
    fn test_alias_shares_buffer() {
        let tensor = NativeTensor::new(DType::UInt8, vec![4], vec![1, 2, 3, 4]).unwrap();
        let sibling = tensor.alias();
        assert_eq!(tensor.data_ptr(), sibling.data_ptr());
        assert_eq!(sibling.data(), &[1, 2, 3, 4]);
    }

    #[test]
    fn test_try_move_unique() {
        let tensor = NativeTensor::new(DType::UInt8, vec![2], vec![7, 9]).unwrap();
        let alloc = tensor.try_move().unwrap();
        assert_eq!(alloc.as_slice(), &[7, 9]);
    }

    #[test]
    fn test_try_move_refused_when_shared() {
        let tensor = NativeTensor::new(DType::UInt8, vec![2], vec![7, 9]).unwrap();
        let sibling = tensor.alias();
        let tensor = tensor.try_move().unwrap_err();
        assert_eq!(tensor.data(), &[7, 9]);
        drop(sibling);
        // Sole owner again, move now succeeds.
        assert!(tensor.try_move().is_ok());
    }

    #[test]
    fn test_release_hook_fires_once_across_aliases() {
        let count = Arc::new(AtomicUsize::new(0));
        let probe = Arc::clone(&count);
        let tensor = NativeTensor::with_release(DType::UInt8, vec![1], vec![0], move || {
            probe.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
        let sibling = tensor.alias();

        drop(tensor);
        assert_eq!(count.load(Ordering::SeqCst), 0);
        drop(sibling);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_resolved_shape_general() {
        let tensor = NativeTensor::new(DType::Float32, vec![2, 5], vec![0u8; 40]).unwrap();
        let (dims, nelems) = tensor.resolved_shape().unwrap();
        assert_eq!(dims, vec![2, 5]);
        assert_eq!(nelems, 10);
    }

    #[test]
    fn test_resolved_shape_scalar() {
        let tensor = NativeTensor::new(DType::Float64, vec![], vec![0u8; 8]).unwrap();
        let (dims, nelems) = tensor.resolved_shape().unwrap();
        assert!(dims.is_empty());
        assert_eq!(nelems, 1);
    }

    #[test]
    fn test_resolved_shape_resource_scalar() {
        let tensor = NativeTensor::new(DType::Resource, vec![], vec![0u8; 13]).unwrap();
        let (dims, nelems) = tensor.resolved_shape().unwrap();
        assert_eq!(dims, vec![13]);
        assert_eq!(nelems, 13);
    }

    #[test]
    fn test_resolved_shape_resource_nonscalar_fails() {
        let tensor = NativeTensor::new(DType::Resource, vec![2], vec![0u8; 8]).unwrap();
        let err = tensor.resolved_shape().unwrap_err();
        assert!(err.is_invalid_argument());
        assert!(err.to_string().contains("non-scalar resource"));
    }
}
