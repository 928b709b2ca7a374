//! Errors across resolution, registration, dispatch and subscriptions.

use std::fmt;

use smol_str::SmolStr;
use thiserror::Error;

use crate::result::DeviceStatus;
use crate::value::ValueKind;
use crate::variable::ParamIndex;

/// Refusal returned by device-support hooks (address parsing, variable
/// setup) with a human-readable reason.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct Rejection(SmolStr);

impl Rejection {
    /// Rejection with the given reason.
    pub fn new(reason: impl Into<SmolStr>) -> Self {
        Self(reason.into())
    }

    /// The stated reason.
    #[must_use]
    pub fn reason(&self) -> &str {
        self.0.as_str()
    }
}

/// Failure reported by a host interrupt sink.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct SinkError(SmolStr);

impl SinkError {
    /// Sink error with the given reason.
    pub fn new(reason: impl Into<SmolStr>) -> Self {
        Self(reason.into())
    }

    /// The stated reason.
    #[must_use]
    pub fn reason(&self) -> &str {
        self.0.as_str()
    }
}

/// Why a binding string could not be resolved to a variable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindingError {
    /// The binding is empty or contains only whitespace.
    #[error("empty binding string")]
    EmptyBinding,
    /// An argument starts with a character reserved for structured syntax.
    #[error("argument '{0}' may not start with '{{' or '['")]
    ReservedArgument(SmolStr),
    /// No handlers are registered for the function.
    #[error("no handlers registered for function '{0}'")]
    UnknownFunction(SmolStr),
    /// The device refused to produce an address for the binding.
    #[error("address rejected for '{binding}': {reason}")]
    AddressRejected {
        /// Normalized binding text.
        binding: SmolStr,
        /// Device-supplied reason.
        reason: Rejection,
    },
    /// The device refused the freshly created variable.
    #[error("variable rejected for '{binding}': {reason}")]
    VariableRejected {
        /// Normalized binding text.
        binding: SmolStr,
        /// Device-supplied reason.
        reason: Rejection,
    },
}

/// Handler registration failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegisterError {
    /// A function name denotes exactly one value kind for the driver's
    /// lifetime; the existing registration stays intact.
    #[error("function '{function}' is registered as {registered}, cannot re-register as {requested}")]
    KindConflict {
        /// Function whose kind is already pinned.
        function: SmolStr,
        /// Kind pinned by the first registration.
        registered: ValueKind,
        /// Kind the rejected registration asked for.
        requested: ValueKind,
    },
}

/// Which dispatch operation was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// A read dispatch.
    Read,
    /// A write dispatch.
    Write,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::Read => "read",
            Operation::Write => "write",
        })
    }
}

/// Per-call dispatch failure reported back to the host runtime.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// No variable was ever bound at this index.
    #[error("no variable bound at index {0}")]
    UnknownIndex(ParamIndex),
    /// The variable exists but no handler covers the operation for its kind.
    #[error("no {operation} handler for '{function}' ({kind})")]
    HandlerMissing {
        /// Function of the variable.
        function: SmolStr,
        /// Kind of the variable.
        kind: ValueKind,
        /// Operation that had no handler.
        operation: Operation,
    },
    /// A read fell back to the parameter cache, which holds no value yet.
    #[error("parameter '{0}' has no cached value")]
    ValueUndefined(SmolStr),
    /// A posted value does not match the parameter's kind.
    #[error("parameter '{function}' is {expected}, not {requested}")]
    WrongKind {
        /// Function of the variable.
        function: SmolStr,
        /// Kind pinned at registration.
        expected: ValueKind,
        /// Kind of the posted value.
        requested: ValueKind,
    },
    /// The device handler failed; the status is carried back verbatim.
    #[error("device reported status {status}")]
    DeviceFailure {
        /// Status reported by the handler.
        status: DeviceStatus,
    },
}

/// Subscription shim failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubscribeError {
    /// No variable was ever bound at this index.
    #[error("no variable bound at index {0}")]
    UnknownIndex(ParamIndex),
    /// Host-native registration failed; count and hooks were left untouched.
    #[error("subscription rejected for '{function}': {reason}")]
    Rejected {
        /// Function of the variable.
        function: SmolStr,
        /// Host-supplied reason.
        reason: SinkError,
    },
    /// Cancel with no listeners attached; the count stays clamped at zero.
    #[error("cancel underflow for '{function}': no listeners attached")]
    Underflow {
        /// Function of the variable.
        function: SmolStr,
    },
}

#[cfg(test)]
mod tests {
    use expect_test::expect;

    use super::*;

    #[test]
    fn messages_name_the_offending_pieces() {
        expect![[r#"argument '{x}' may not start with '{' or '['"#]]
            .assert_eq(&BindingError::ReservedArgument("{x}".into()).to_string());
        expect![[r#"address rejected for 'CHAN 99': no such channel"#]].assert_eq(
            &BindingError::AddressRejected {
                binding: "CHAN 99".into(),
                reason: Rejection::new("no such channel"),
            }
            .to_string(),
        );
        expect![[r#"function 'F' is registered as Int32, cannot re-register as Float64"#]]
            .assert_eq(
                &RegisterError::KindConflict {
                    function: "F".into(),
                    registered: ValueKind::Int32,
                    requested: ValueKind::Float64,
                }
                .to_string(),
            );
        expect![[r#"no write handler for 'WAVE' (Float32Array)"#]].assert_eq(
            &DispatchError::HandlerMissing {
                function: "WAVE".into(),
                kind: ValueKind::Float32Array,
                operation: Operation::Write,
            }
            .to_string(),
        );
        expect![[r#"no variable bound at index 7"#]]
            .assert_eq(&DispatchError::UnknownIndex(ParamIndex(7)).to_string());
        expect![[r#"cancel underflow for 'COUNT': no listeners attached"#]].assert_eq(
            &SubscribeError::Underflow {
                function: "COUNT".into(),
            }
            .to_string(),
        );
    }
}
