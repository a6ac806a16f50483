//! The dtype model used throughout the evaluator.
//!
//! Unlike a compile-time generic tensor type, the graph this crate evaluates is produced by an
//! external, dynamically-typed graph builder: every tensor node carries its dtype as a runtime
//! value rather than as a Rust type parameter. `Dtype` is that runtime tag, and this module
//! centralizes the handful of facts the rest of the evaluator needs about each variant: its
//! OpenCL kernel-name suffix, its host element size, and which kernel family it dispatches to.

use std::fmt::Display;

/// The dtypes the evaluator supports.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Dtype {
    /// 32-bit IEEE-754 floating point.
    Fp32,
    /// 32-bit signed integer.
    Int32,
    /// Boolean, stored on the device as a 32-bit integer (OpenCL has no native bool buffer type).
    Bool,
}

impl Dtype {
    /// Returns the suffix used to select a kernel entry point for this dtype (`fp` or `int`).
    ///
    /// `Bool` shares the `int` family: boolean kernels operate on the same storage width as
    /// `Int32` and never participate directly in floating-point promotion.
    pub fn kernel_suffix(self) -> &'static str {
        match self {
            Dtype::Fp32 => "fp",
            Dtype::Int32 | Dtype::Bool => "int",
        }
    }

    /// Returns the size in bytes of a single element of this dtype as stored on the device.
    pub fn byte_size(self) -> usize {
        match self {
            Dtype::Fp32 => std::mem::size_of::<f32>(),
            Dtype::Int32 => std::mem::size_of::<i32>(),
            Dtype::Bool => std::mem::size_of::<i32>(),
        }
    }

    /// Returns true if this dtype belongs to the floating-point kernel family.
    pub fn is_float(self) -> bool {
        matches!(self, Dtype::Fp32)
    }
}

impl Display for Dtype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Dtype::Fp32 => "fp32",
            Dtype::Int32 => "int32",
            Dtype::Bool => "bool",
        };
        write!(f, "{name}")
    }
}

/// Parses the dtype tag the external graph collaborator hands the evaluator (the `data_type`
/// field on a `Tensor`/`Variable`/`Placeholder`) into the fixed, runtime `Dtype` set. Anything
/// outside `{fp32, int32, bool}` is an `UnsupportedDtype` error rather than a panic, since the
/// graph builder is free to request an allocation the evaluator cannot back.
impl TryFrom<&str> for Dtype {
    type Error = crate::Kind;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "fp32" | "float32" | "f32" => Ok(Dtype::Fp32),
            "int32" | "i32" => Ok(Dtype::Int32),
            "bool" => Ok(Dtype::Bool),
            other => Err(crate::Kind::UnsupportedDtype(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_supported_alias() {
        assert_eq!(Dtype::try_from("fp32").unwrap(), Dtype::Fp32);
        assert_eq!(Dtype::try_from("float32").unwrap(), Dtype::Fp32);
        assert_eq!(Dtype::try_from("int32").unwrap(), Dtype::Int32);
        assert_eq!(Dtype::try_from("bool").unwrap(), Dtype::Bool);
    }

    #[test]
    fn rejects_unknown_dtype() {
        let err = Dtype::try_from("fp64").unwrap_err();
        assert!(matches!(err, crate::Kind::UnsupportedDtype(name) if name == "fp64"));
    }
}
