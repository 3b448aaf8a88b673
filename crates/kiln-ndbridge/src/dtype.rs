//! Dtype Enumeration and Descriptor Registry
//!
//! The two runtimes name element types differently: the tensor engine uses
//! a dtype tag on every tensor handle, the scripting runtime attaches a
//! descriptor to every ndarray. This module holds the closed enumeration of
//! element kinds the bridge understands and the registry that maps between
//! the two, consumed by the conversion layer as a bidirectional lookup.
//!
//! The registry is total for every registered dtype; a descriptor that is
//! not registered fails the reverse lookup with a reportable error rather
//! than being guessed at.

use std::fmt;
use std::sync::OnceLock;

use indexmap::IndexMap;

use crate::error::{BridgeError, BridgeResult};

// ============================================================================
// DType - Element Type Tags
// ============================================================================

/// Element type tag shared by tensors and ndarrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    /// Boolean
    Bool,

    /// Signed 8-bit integer
    Int8,
    /// Signed 16-bit integer
    Int16,
    /// Signed 32-bit integer
    Int32,
    /// Signed 64-bit integer
    Int64,

    /// Unsigned 8-bit integer
    UInt8,
    /// Unsigned 16-bit integer
    UInt16,
    /// Unsigned 32-bit integer
    UInt32,
    /// Unsigned 64-bit integer
    UInt64,

    /// 32-bit floating point
    Float32,
    /// 64-bit floating point
    Float64,

    /// 64-bit complex (2x float32)
    Complex64,
    /// 128-bit complex (2x float64)
    Complex128,

    /// Variable-length byte/text elements, stored in the packed
    /// offset-table encoding rather than as fixed-width data
    Str,
    /// Opaque scalar byte blob whose internal layout is defined by the
    /// tensor engine, not interpreted by the bridge
    Resource,
}

impl DType {
    /// Fixed element width in bytes, if this dtype has one.
    ///
    /// `Str` and `Resource` have no fixed width: string tensors carry the
    /// packed encoding, resource tensors carry an opaque blob.
    pub fn fixed_width(&self) -> Option<usize> {
        match self {
            DType::Bool | DType::Int8 | DType::UInt8 => Some(1),
            DType::Int16 | DType::UInt16 => Some(2),
            DType::Int32 | DType::UInt32 | DType::Float32 => Some(4),
            DType::Int64 | DType::UInt64 | DType::Float64 | DType::Complex64 => Some(8),
            DType::Complex128 => Some(16),
            DType::Str | DType::Resource => None,
        }
    }

    /// Check if this dtype stores fixed-width elements
    pub fn is_fixed_width(&self) -> bool {
        self.fixed_width().is_some()
    }

    /// Check if this is the variable-length string/bytes dtype
    pub fn is_variable_length(&self) -> bool {
        matches!(self, DType::Str)
    }

    /// Check if this is the opaque resource dtype
    pub fn is_resource(&self) -> bool {
        matches!(self, DType::Resource)
    }

    /// Check if this is an integer type
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            DType::Int8
                | DType::Int16
                | DType::Int32
                | DType::Int64
                | DType::UInt8
                | DType::UInt16
                | DType::UInt32
                | DType::UInt64
        )
    }

    /// Check if this is a floating point type
    pub fn is_float(&self) -> bool {
        matches!(self, DType::Float32 | DType::Float64)
    }

    /// Get the dtype name (e.g., "float64")
    pub fn name(&self) -> &'static str {
        match self {
            DType::Bool => "bool",
            DType::Int8 => "int8",
            DType::Int16 => "int16",
            DType::Int32 => "int32",
            DType::Int64 => "int64",
            DType::UInt8 => "uint8",
            DType::UInt16 => "uint16",
            DType::UInt32 => "uint32",
            DType::UInt64 => "uint64",
            DType::Float32 => "float32",
            DType::Float64 => "float64",
            DType::Complex64 => "complex64",
            DType::Complex128 => "complex128",
            DType::Str => "string",
            DType::Resource => "resource",
        }
    }

    /// Parse a dtype from its name
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "bool" => Some(DType::Bool),
            "int8" => Some(DType::Int8),
            "int16" => Some(DType::Int16),
            "int32" => Some(DType::Int32),
            "int64" => Some(DType::Int64),
            "uint8" => Some(DType::UInt8),
            "uint16" => Some(DType::UInt16),
            "uint32" => Some(DType::UInt32),
            "uint64" => Some(DType::UInt64),
            "float32" | "float" => Some(DType::Float32),
            "float64" | "double" => Some(DType::Float64),
            "complex64" => Some(DType::Complex64),
            "complex128" | "complex" => Some(DType::Complex128),
            "string" | "bytes" => Some(DType::Str),
            "resource" => Some(DType::Resource),
            _ => None,
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ============================================================================
// ArrayDescr - Scripting-Runtime Descriptors
// ============================================================================

/// The scripting runtime's element descriptor for an ndarray.
///
/// `width` is the per-element storage width on the array side: fixed-width
/// dtypes use their natural width, `resource` arrays are width-1 byte
/// blobs, and `string` arrays store elements out-of-line (width 0).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArrayDescr {
    /// The dtype this descriptor maps to
    pub dtype: DType,
    /// Per-element storage width in bytes on the array side
    pub width: usize,
    /// Descriptor name as the scripting runtime spells it
    pub name: &'static str,
}

static REGISTRY: OnceLock<IndexMap<DType, ArrayDescr>> = OnceLock::new();

fn registry() -> &'static IndexMap<DType, ArrayDescr> {
    REGISTRY.get_or_init(|| {
        let mut map = IndexMap::new();
        let entries = [
            (DType::Bool, 1),
            (DType::Int8, 1),
            (DType::Int16, 2),
            (DType::Int32, 4),
            (DType::Int64, 8),
            (DType::UInt8, 1),
            (DType::UInt16, 2),
            (DType::UInt32, 4),
            (DType::UInt64, 8),
            (DType::Float32, 4),
            (DType::Float64, 8),
            (DType::Complex64, 8),
            (DType::Complex128, 16),
            // String elements live out-of-line in element storage.
            (DType::Str, 0),
            // Resource blobs surface as flat byte arrays.
            (DType::Resource, 1),
        ];
        for (dtype, width) in entries {
            map.insert(
                dtype,
                ArrayDescr {
                    dtype,
                    width,
                    name: dtype.name(),
                },
            );
        }
        map
    })
}

/// Look up the array-side descriptor for a tensor dtype.
pub fn descr_for_dtype(dtype: DType) -> BridgeResult<&'static ArrayDescr> {
    registry()
        .get(&dtype)
        .ok_or_else(|| BridgeError::unsupported_dtype(dtype.name()))
}

/// Look up the tensor dtype for an array-side descriptor.
///
/// The descriptor must match a registered entry exactly; anything else is
/// reported as an unsupported dtype rather than coerced.
pub fn dtype_for_descr(descr: &ArrayDescr) -> BridgeResult<DType> {
    match registry().get(&descr.dtype) {
        Some(entry) if entry == descr => Ok(descr.dtype),
        _ => Err(BridgeError::unsupported_dtype(descr.name)),
    }
}
