//! Traits implemented by the host runtime embedding a driver.

use crate::error::SinkError;
use crate::value::Sample;
use crate::variable::Variable;

/// Host-side interrupt capability for one value kind.
///
/// The driver layers subscription counting on top of the host's native
/// bookkeeping instead of replacing it: [`attach`] and [`detach`] run the
/// host's own registration first and may refuse, and [`deliver`] hands a
/// sample to whatever listeners the host tracks for the variable.
///
/// [`attach`]: InterruptSink::attach
/// [`detach`]: InterruptSink::detach
/// [`deliver`]: InterruptSink::deliver
pub trait InterruptSink: Send {
    /// Register one more listener for `variable` with the host.
    fn attach(&mut self, variable: &Variable) -> Result<(), SinkError>;

    /// Remove one listener registration for `variable`.
    fn detach(&mut self, variable: &Variable) -> Result<(), SinkError>;

    /// Deliver a sample to the listeners attached to `variable`.
    fn deliver(&mut self, variable: &Variable, sample: &Sample) -> Result<(), SinkError>;
}
