//! Conversion Orchestrator
//!
//! The public entry points of the bridge. Each conversion resolves the
//! destination shape, then picks the cheapest safe transfer:
//!
//! - **Aliasing**: hand the source buffer to the destination runtime
//!   outright. Tensor to array requires exclusive ownership of the engine
//!   buffer; array to tensor adopts the array's storage and releases it
//!   when the tensor drops.
//! - **Copy**: byte-exact fallback into a freshly allocated destination,
//!   used whenever aliasing is inapplicable or refused.
//! - **String codec**: the packed encoding for variable-length elements,
//!   in both directions.
//!
//! A refused move is the only silently recovered condition; every other
//! failure aborts the conversion with the first error encountered.

use std::sync::Arc;

use crate::array::{ArrayValue, DenseBytes, NdArray};
use crate::codec;
use crate::dtype::{descr_for_dtype, dtype_for_descr, DType};
use crate::error::{BridgeError, BridgeResult};
use crate::tensor::{NativeTensor, TensorBuf};

// ============================================================================
// Copy Converter
// ============================================================================

const SMALL_COPY_MAX: usize = 16;

fn copy_fixed<const N: usize>(dst: &mut [u8], src: &[u8]) {
    let mut chunk = [0u8; N];
    chunk.copy_from_slice(&src[..N]);
    dst[..N].copy_from_slice(&chunk);
}

/// Byte-exact copy between equal-length buffers.
///
/// Payloads up to [`SMALL_COPY_MAX`] go through fixed-size copies, which
/// compile to inline moves; larger payloads use one block copy. The two
/// branches differ only in throughput.
pub(crate) fn fast_copy(dst: &mut [u8], src: &[u8]) {
    match src.len() {
        0 => {}
        1 => copy_fixed::<1>(dst, src),
        2 => copy_fixed::<2>(dst, src),
        3 => copy_fixed::<3>(dst, src),
        4 => copy_fixed::<4>(dst, src),
        5 => copy_fixed::<5>(dst, src),
        6 => copy_fixed::<6>(dst, src),
        7 => copy_fixed::<7>(dst, src),
        8 => copy_fixed::<8>(dst, src),
        9 => copy_fixed::<9>(dst, src),
        10 => copy_fixed::<10>(dst, src),
        11 => copy_fixed::<11>(dst, src),
        12 => copy_fixed::<12>(dst, src),
        13 => copy_fixed::<13>(dst, src),
        14 => copy_fixed::<14>(dst, src),
        15 => copy_fixed::<15>(dst, src),
        16 => copy_fixed::<16>(dst, src),
        _ => dst.copy_from_slice(src),
    }
}

fn copy_tensor_to_array(
    tensor: &NativeTensor,
    dims: Vec<i64>,
    nelems: i64,
) -> BridgeResult<ArrayValue> {
    let dtype = tensor.dtype();
    let descr = descr_for_dtype(dtype)?;

    if dtype.is_variable_length() {
        let elems = codec::decode_elems(tensor.data(), nelems as usize)?;
        return NdArray::from_elems(dims, elems).map(ArrayValue::Array);
    }

    let capacity = (nelems as usize).checked_mul(descr.width).ok_or_else(|| {
        BridgeError::internal(format!("shape {dims:?} overflows the destination size"))
    })?;
    let src = tensor.data();
    if capacity != src.len() {
        return Err(BridgeError::internal(format!(
            "ndarray would hold {capacity} bytes but the tensor holds {} bytes",
            src.len()
        )));
    }
    let mut dst = vec![0u8; capacity];
    fast_copy(&mut dst, src);
    NdArray::from_data(dtype, dims, dst).map(ArrayValue::Array)
}

// ============================================================================
// Tensor -> Array
// ============================================================================

/// Convert a native tensor into an ndarray.
///
/// A null tensor converts to the runtime's none sentinel. Fixed-width
/// dtypes first attempt an exclusive buffer transfer; on refusal (the
/// buffer is still shared) the data is copied. String tensors are decoded
/// through the packed codec, resource tensors surface as flat byte arrays.
pub fn tensor_to_array(tensor: Option<NativeTensor>) -> BridgeResult<ArrayValue> {
    let Some(tensor) = tensor else {
        return Ok(ArrayValue::None);
    };
    let (dims, nelems) = tensor.resolved_shape()?;
    let dtype = tensor.dtype();

    // If the dtype is neither string nor resource the tensor memory may be
    // reused outright.
    let tensor = if dtype.is_fixed_width() {
        match tensor.try_move() {
            Ok(mut alloc) => {
                let descr = descr_for_dtype(dtype)?;
                // The engine's release hook moves with the buffer and now
                // fires when the last array reference drops.
                let token = alloc.take_release();
                let bytes = DenseBytes::Engine {
                    alloc: Arc::new(alloc),
                    _token: Some(token),
                };
                return Ok(ArrayValue::Array(NdArray::from_dense_parts(
                    descr, dims, bytes,
                )));
            }
            Err(tensor) => tensor,
        }
    } else {
        tensor
    };

    copy_tensor_to_array(&tensor, dims, nelems)
}

/// Convert a native tensor into an ndarray, aliasing whenever the dtype
/// allows it.
///
/// String and resource tensors go through the ordinary full conversion.
/// Every other dtype reuses the tensor's buffer unconditionally: a shared
/// engine buffer stays alive until its sibling handles and the array are
/// all gone, and a buffer that was adopted from the array runtime
/// resurfaces its original storage.
pub fn tensor_to_array_zero_copy_preferred(
    tensor: Option<NativeTensor>,
) -> BridgeResult<ArrayValue> {
    let Some(tensor) = tensor else {
        return Ok(ArrayValue::None);
    };
    let dtype = tensor.dtype();
    if dtype.is_variable_length() || dtype.is_resource() {
        return tensor_to_array(Some(tensor));
    }

    let (dims, _nelems) = tensor.resolved_shape()?;
    let descr = descr_for_dtype(dtype)?;
    let (_, _, buf) = tensor.into_parts();
    let array = match buf {
        TensorBuf::Engine(alloc) => NdArray::from_dense_parts(
            descr,
            dims,
            DenseBytes::Engine {
                alloc,
                _token: None,
            },
        ),
        TensorBuf::Adopted(source) => {
            NdArray::from_shared_storage(descr, dims, Arc::clone(source.storage()))
        }
    };
    Ok(ArrayValue::Array(array))
}

// ============================================================================
// Array -> Tensor
// ============================================================================

/// Convert an ndarray into a native tensor.
///
/// Non-string, non-resource arrays are adopted without copying; the
/// array's storage reference is released when the tensor drops. Resource
/// arrays alias with the rank forced to zero. String arrays are encoded
/// into a fresh engine buffer that dies with the tensor.
pub fn array_to_tensor(value: ArrayValue) -> BridgeResult<NativeTensor> {
    let ArrayValue::Array(array) = value else {
        return Err(BridgeError::invalid_argument("not an ndarray"));
    };
    let dtype = dtype_for_descr(array.descr())?;

    match dtype {
        DType::Resource => NativeTensor::adopt(dtype, Vec::new(), array),
        DType::Str => {
            let Some(elems) = array.elems() else {
                return Err(BridgeError::internal(
                    "string ndarray without element storage",
                ));
            };
            let dims = array.dims().to_vec();
            let encoded = codec::encode_elems(elems)?;
            NativeTensor::new(dtype, dims, encoded)
        }
        _ => {
            let dims = array.dims().to_vec();
            NativeTensor::adopt(dtype, dims, array)
        }
    }
}
