//! Scripting-Runtime ndarray Objects
//!
//! The bridge's view of the embedding runtime's array object: a descriptor,
//! a dimension vector and a reference-counted storage cell. Storage is
//! always dense and contiguous; the only exception is the `string` dtype,
//! whose variable-length elements live out-of-line as individual values.
//!
//! The storage `Arc` is the reference count shared with any aliasing owner:
//! a tensor that adopts an array's buffer holds a storage reference that is
//! released only when the tensor itself is dropped, and an array built over
//! an engine buffer keeps that allocation (and its release token) alive
//! until the last array reference drops.

use std::fmt;
use std::sync::Arc;

use smol_str::SmolStr;

use crate::dtype::{descr_for_dtype, ArrayDescr, DType};
use crate::error::{BridgeError, BridgeResult};
use crate::ownership::OwnershipToken;
use crate::tensor::EngineAlloc;

// ============================================================================
// Elements and Boundary Values
// ============================================================================

/// One element of a `string` ndarray.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArrayElem {
    /// Already-byte-encoded element, used as-is
    Bytes(Vec<u8>),
    /// Text element, encoded as its UTF-8 byte form
    Text(SmolStr),
    /// Any other runtime object, identified only by its type name.
    /// Cannot be encoded.
    Object(SmolStr),
}

impl ArrayElem {
    /// Get the runtime type name for this element
    pub fn type_name(&self) -> &str {
        match self {
            ArrayElem::Bytes(_) => "bytes",
            ArrayElem::Text(_) => "str",
            ArrayElem::Object(name) => name.as_str(),
        }
    }
}

/// A value crossing the conversion boundary.
///
/// A null tensor converts to `None` (the runtime's none sentinel), never to
/// an error; feeding `None` back into the array-to-tensor direction fails
/// with `InvalidArgument`.
#[derive(Debug, Clone)]
pub enum ArrayValue {
    /// The runtime's none sentinel
    None,
    /// A dense ndarray
    Array(NdArray),
}

impl ArrayValue {
    /// Check if this is the none sentinel
    pub fn is_none(&self) -> bool {
        matches!(self, ArrayValue::None)
    }

    /// Borrow the array, if present
    pub fn as_array(&self) -> Option<&NdArray> {
        match self {
            ArrayValue::Array(array) => Some(array),
            ArrayValue::None => None,
        }
    }

    /// Take the array, if present
    pub fn into_array(self) -> Option<NdArray> {
        match self {
            ArrayValue::Array(array) => Some(array),
            ArrayValue::None => None,
        }
    }
}

// ============================================================================
// Storage
// ============================================================================

/// Backing bytes of a dense ndarray.
#[derive(Debug)]
pub(crate) enum DenseBytes {
    /// The array runtime's own allocation
    Owned(Box<[u8]>),
    /// An engine allocation aliased without a copy. The token (present on
    /// exclusive transfers) fires the engine's release hook when the last
    /// array reference drops; for shared aliases the hook stays inside the
    /// allocation and fires when every co-owner is gone.
    Engine {
        alloc: Arc<EngineAlloc>,
        _token: Option<OwnershipToken>,
    },
}

impl DenseBytes {
    pub(crate) fn as_slice(&self) -> &[u8] {
        match self {
            DenseBytes::Owned(bytes) => bytes,
            DenseBytes::Engine { alloc, .. } => alloc.as_slice(),
        }
    }
}

/// Reference-counted storage cell shared by every alias of an ndarray.
#[derive(Debug)]
pub(crate) enum Storage {
    /// Contiguous, densely packed bytes
    Dense(DenseBytes),
    /// Out-of-line elements of a `string` ndarray, in row-major order
    Elems(Vec<ArrayElem>),
}

/// Validate a dimension vector and derive its element count.
///
/// An empty dimension vector is a scalar (one element).
pub(crate) fn element_count(dims: &[i64]) -> BridgeResult<i64> {
    let mut count: i64 = 1;
    for &dim in dims {
        if dim < 0 {
            return Err(BridgeError::invalid_argument(format!(
                "negative dimension {dim} in shape {dims:?}"
            )));
        }
        count = count.checked_mul(dim).ok_or_else(|| {
            BridgeError::invalid_argument(format!("shape {dims:?} overflows element count"))
        })?;
    }
    Ok(count)
}

// ============================================================================
// NdArray
// ============================================================================

/// The scripting runtime's dense ndarray object.
///
/// Cloning an `NdArray` shares its storage cell (a reference-count bump),
/// it never copies element data.
#[derive(Clone)]
pub struct NdArray {
    descr: &'static ArrayDescr,
    dims: Vec<i64>,
    storage: Arc<Storage>,
}

impl NdArray {
    /// Create a dense ndarray from existing bytes.
    ///
    /// The data must exactly fill `element count x descriptor width`.
    pub fn from_data(dtype: DType, dims: Vec<i64>, data: Vec<u8>) -> BridgeResult<Self> {
        if dtype.is_variable_length() {
            return Err(BridgeError::invalid_argument(
                "string ndarrays store elements out-of-line; use from_elems",
            ));
        }
        let descr = descr_for_dtype(dtype)?;
        let count = element_count(&dims)? as usize;
        let expected = count.checked_mul(descr.width).ok_or_else(|| {
            BridgeError::invalid_argument(format!("shape {dims:?} overflows byte size"))
        })?;
        if data.len() != expected {
            return Err(BridgeError::invalid_argument(format!(
                "data size {} doesn't match expected size {expected}",
                data.len()
            )));
        }
        Ok(Self {
            descr,
            dims,
            storage: Arc::new(Storage::Dense(DenseBytes::Owned(data.into_boxed_slice()))),
        })
    }

    /// Create a `string` ndarray from its elements, in row-major order.
    pub fn from_elems(dims: Vec<i64>, elems: Vec<ArrayElem>) -> BridgeResult<Self> {
        let descr = descr_for_dtype(DType::Str)?;
        let count = element_count(&dims)? as usize;
        if elems.len() != count {
            return Err(BridgeError::invalid_argument(format!(
                "element count {} doesn't match shape {dims:?} ({count} elements)",
                elems.len()
            )));
        }
        Ok(Self {
            descr,
            dims,
            storage: Arc::new(Storage::Elems(elems)),
        })
    }

    /// Build a dense ndarray directly over aliased bytes.
    ///
    /// Callers guarantee the byte length matches the shape; this is the
    /// zero-copy construction path and performs no validation.
    pub(crate) fn from_dense_parts(
        descr: &'static ArrayDescr,
        dims: Vec<i64>,
        bytes: DenseBytes,
    ) -> Self {
        Self {
            descr,
            dims,
            storage: Arc::new(Storage::Dense(bytes)),
        }
    }

    /// Build an ndarray view over an existing storage cell.
    pub(crate) fn from_shared_storage(
        descr: &'static ArrayDescr,
        dims: Vec<i64>,
        storage: Arc<Storage>,
    ) -> Self {
        Self {
            descr,
            dims,
            storage,
        }
    }

    /// Get the descriptor
    pub fn descr(&self) -> &'static ArrayDescr {
        self.descr
    }

    /// Get the dtype
    pub fn dtype(&self) -> DType {
        self.descr.dtype
    }

    /// Get the shape
    pub fn dims(&self) -> &[i64] {
        &self.dims
    }

    /// Get the number of dimensions
    pub fn ndim(&self) -> usize {
        self.dims.len()
    }

    /// Get the total number of elements (1 for a scalar)
    pub fn size(&self) -> usize {
        self.dims.iter().map(|&d| d as usize).product()
    }

    /// Check if this array uses dense byte storage
    pub fn is_dense(&self) -> bool {
        matches!(*self.storage, Storage::Dense(_))
    }

    /// Borrow the dense backing bytes, if this array has them
    pub fn data(&self) -> Option<&[u8]> {
        match &*self.storage {
            Storage::Dense(bytes) => Some(bytes.as_slice()),
            Storage::Elems(_) => None,
        }
    }

    /// Borrow the out-of-line elements of a `string` ndarray
    pub fn elems(&self) -> Option<&[ArrayElem]> {
        match &*self.storage {
            Storage::Elems(elems) => Some(elems),
            Storage::Dense(_) => None,
        }
    }

    /// Base pointer of the dense backing bytes, for aliasing checks
    pub fn data_ptr(&self) -> Option<*const u8> {
        self.data().map(|d| d.as_ptr())
    }

    /// Number of live references to this array's storage cell
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.storage)
    }

    /// Check whether two arrays share one storage cell
    pub fn shares_storage_with(&self, other: &NdArray) -> bool {
        Arc::ptr_eq(&self.storage, &other.storage)
    }

    pub(crate) fn storage(&self) -> &Arc<Storage> {
        &self.storage
    }
}

impl fmt::Debug for NdArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NdArray")
            .field("dtype", &self.dtype())
            .field("dims", &self.dims)
            .field("refs", &self.ref_count())
            .finish()
    }
}
