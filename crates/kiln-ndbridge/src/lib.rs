//! # Kiln ndarray Bridge
//!
//! Conversion and ownership-transfer layer between the Kiln tensor
//! engine's native tensor handles and the embedded scripting runtime's
//! reference-counted ndarray objects.
//!
//! The two runtimes manage memory independently and share no allocator, so
//! the bridge's job is to move array data across that boundary with the
//! fewest possible copies while guaranteeing every buffer is freed exactly
//! once, whichever side outlives the other.
//!
//! ## Design Goals
//!
//! 1. **Zero-copy first**: alias the source buffer whenever ownership can
//!    be transferred or shared safely; copy only as a fallback
//! 2. **Singular ownership**: at any instant a buffer belongs to exactly
//!    one runtime's allocation rules, or has been handed off through an
//!    [`OwnershipToken`] that fires exactly once
//! 3. **Lossless variable-length data**: string/byte elements travel in a
//!    packed offset-table encoding that reproduces every element's bytes
//!    exactly, including empty elements and embedded zero bytes
//!
//! ## Module Structure
//!
//! - [`dtype`]: element type tags and the descriptor registry
//! - [`array`]: the scripting runtime's ndarray objects
//! - [`tensor`]: native tensor handles and engine allocations
//! - [`ownership`]: the cross-runtime release-callback token
//! - [`codec`]: the packed string-tensor wire format
//! - [`convert`]: the conversion entry points
//! - [`error`]: error types

pub mod array;
pub mod codec;
pub mod convert;
pub mod dtype;
pub mod error;
pub mod ownership;
pub mod tensor;

// Re-export main types for convenience
pub use array::{ArrayElem, ArrayValue, NdArray};
pub use convert::{array_to_tensor, tensor_to_array, tensor_to_array_zero_copy_preferred};
pub use dtype::{descr_for_dtype, dtype_for_descr, ArrayDescr, DType};
pub use error::{BridgeError, BridgeResult};
pub use ownership::OwnershipToken;
pub use tensor::NativeTensor;
