//! `dynavar` - dynamic device-variable binding for record-based control runtimes.
//!
//! Record runtimes name device data with free-form binding strings such as
//! `TEMP 3` or `MOTOR speed`. This crate parses those strings, deduplicates
//! them into stable per-variable indices, and dispatches typed read/write
//! handlers registered per function name, so a device driver only has to
//! supply address parsing and the handlers themselves.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]

/// Binding-string parsing and canonical normalization.
pub mod binding;
/// Driver construction, binding resolution, dispatch and subscriptions.
pub mod driver;
/// Errors across resolution, registration, dispatch and subscriptions.
pub mod error;
/// Typed handler callbacks and registration bundles.
pub mod handlers;
/// Host-side test doubles.
pub mod harness;
/// Traits implemented by the host runtime embedding a driver.
pub mod host;
/// Callback results and the status/alarm vocabulary.
pub mod result;
/// Value kinds and concrete samples.
pub mod value;
/// Device addresses and live variable handles.
pub mod variable;

mod cache;
mod registry;

pub use binding::Binding;
pub use driver::{DeviceSupport, Driver, DriverOpts};
pub use error::{
    BindingError, DispatchError, Operation, RegisterError, Rejection, SinkError, SubscribeError,
};
pub use handlers::{ArrayHandlers, DigitalHandlers, InterruptEdge, OctetHandlers, ScalarHandlers};
pub use host::InterruptSink;
pub use result::{
    Ack, Alarm, AlarmCondition, AlarmSeverity, DeviceError, DeviceStatus, Notify, ReadResult,
    Reading, WriteResult,
};
pub use value::{Sample, ValueKind};
pub use variable::{DeviceAddress, ParamIndex, Variable, VariableInfo};
