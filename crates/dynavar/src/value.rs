//! Value kinds and concrete samples.
//!
//! A [`ValueKind`] names the data shape a function exchanges with the host
//! runtime; a [`Sample`] is one concrete value tagged with its kind. Scalar,
//! octet and digital samples pass through the driver's parameter cache,
//! array samples are always delivered directly.

#![allow(missing_docs)]

use std::fmt;

/// Data shape of a device variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Int32,
    Int64,
    UInt32Digital,
    Float64,
    Octet,
    Int8Array,
    Int16Array,
    Int32Array,
    Int64Array,
    Float32Array,
    Float64Array,
}

impl ValueKind {
    /// Canonical kind name used in diagnostics.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            ValueKind::Int32 => "Int32",
            ValueKind::Int64 => "Int64",
            ValueKind::UInt32Digital => "UInt32Digital",
            ValueKind::Float64 => "Float64",
            ValueKind::Octet => "Octet",
            ValueKind::Int8Array => "Int8Array",
            ValueKind::Int16Array => "Int16Array",
            ValueKind::Int32Array => "Int32Array",
            ValueKind::Int64Array => "Int64Array",
            ValueKind::Float32Array => "Float32Array",
            ValueKind::Float64Array => "Float64Array",
        }
    }

    /// True for the array-shaped kinds, which bypass the parameter cache.
    #[must_use]
    pub fn is_array(self) -> bool {
        matches!(
            self,
            ValueKind::Int8Array
                | ValueKind::Int16Array
                | ValueKind::Int32Array
                | ValueKind::Int64Array
                | ValueKind::Float32Array
                | ValueKind::Float64Array
        )
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One concrete value tagged with its kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Sample {
    Int32(i32),
    Int64(i64),
    UInt32Digital(u32),
    Float64(f64),
    Octet(String),
    Int8Array(Vec<i8>),
    Int16Array(Vec<i16>),
    Int32Array(Vec<i32>),
    Int64Array(Vec<i64>),
    Float32Array(Vec<f32>),
    Float64Array(Vec<f64>),
}

impl Sample {
    /// Kind tag of this sample.
    #[must_use]
    pub fn kind(&self) -> ValueKind {
        match self {
            Sample::Int32(_) => ValueKind::Int32,
            Sample::Int64(_) => ValueKind::Int64,
            Sample::UInt32Digital(_) => ValueKind::UInt32Digital,
            Sample::Float64(_) => ValueKind::Float64,
            Sample::Octet(_) => ValueKind::Octet,
            Sample::Int8Array(_) => ValueKind::Int8Array,
            Sample::Int16Array(_) => ValueKind::Int16Array,
            Sample::Int32Array(_) => ValueKind::Int32Array,
            Sample::Int64Array(_) => ValueKind::Int64Array,
            Sample::Float32Array(_) => ValueKind::Float32Array,
            Sample::Float64Array(_) => ValueKind::Float64Array,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_names_round_trip_through_display() {
        assert_eq!(ValueKind::UInt32Digital.to_string(), "UInt32Digital");
        assert_eq!(ValueKind::Float32Array.to_string(), "Float32Array");
    }

    #[test]
    fn array_kinds_flagged() {
        assert!(ValueKind::Int8Array.is_array());
        assert!(!ValueKind::Octet.is_array());
        assert!(!ValueKind::UInt32Digital.is_array());
    }

    #[test]
    fn samples_carry_their_kind() {
        assert_eq!(Sample::Int64(-3).kind(), ValueKind::Int64);
        assert_eq!(Sample::Octet("hi".into()).kind(), ValueKind::Octet);
        assert_eq!(
            Sample::Float64Array(vec![0.5, 1.5]).kind(),
            ValueKind::Float64Array
        );
    }
}
