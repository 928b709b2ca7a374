//! Host-side test doubles.
//!
//! A [`RecordingSink`] stands in for the host runtime's interrupt machinery
//! and logs every interaction into a shared [`SinkLog`]; a [`RejectingSink`]
//! exercises the failure paths. Used by this crate's own tests and handy
//! for driver authors testing against the same seams.

use std::sync::{Arc, Mutex};

use crate::error::SinkError;
use crate::host::InterruptSink;
use crate::value::Sample;
use crate::variable::{ParamIndex, Variable};

/// One event observed by a [`RecordingSink`].
#[derive(Debug, Clone, PartialEq)]
pub enum SinkEvent {
    /// A listener registered with the host.
    Attached(ParamIndex),
    /// A listener registration was removed.
    Detached(ParamIndex),
    /// A sample was delivered to the variable's listeners.
    Delivered(ParamIndex, Sample),
}

/// Shared, cloneable log of sink events.
///
/// Clone one handle per value kind and keep another for assertions.
#[derive(Debug, Clone, Default)]
pub struct SinkLog {
    events: Arc<Mutex<Vec<SinkEvent>>>,
}

impl SinkLog {
    /// Empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, event: SinkEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }

    /// Snapshot of all events recorded so far, in order.
    #[must_use]
    pub fn events(&self) -> Vec<SinkEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Samples delivered for one index, in order.
    #[must_use]
    pub fn delivered(&self, index: ParamIndex) -> Vec<Sample> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                SinkEvent::Delivered(i, sample) if i == index => Some(sample),
                _ => None,
            })
            .collect()
    }

    /// Forget everything recorded so far.
    pub fn clear(&self) {
        if let Ok(mut events) = self.events.lock() {
            events.clear();
        }
    }
}

/// Interrupt sink that accepts everything and records it into a [`SinkLog`].
#[derive(Debug, Clone)]
pub struct RecordingSink {
    log: SinkLog,
}

impl RecordingSink {
    /// Sink recording into `log`.
    #[must_use]
    pub fn new(log: SinkLog) -> Self {
        Self { log }
    }
}

impl InterruptSink for RecordingSink {
    fn attach(&mut self, variable: &Variable) -> Result<(), SinkError> {
        self.log.push(SinkEvent::Attached(variable.index()));
        Ok(())
    }

    fn detach(&mut self, variable: &Variable) -> Result<(), SinkError> {
        self.log.push(SinkEvent::Detached(variable.index()));
        Ok(())
    }

    fn deliver(&mut self, variable: &Variable, sample: &Sample) -> Result<(), SinkError> {
        self.log
            .push(SinkEvent::Delivered(variable.index(), sample.clone()));
        Ok(())
    }
}

/// Interrupt sink that refuses registration changes; deliveries succeed.
#[derive(Debug, Clone)]
pub struct RejectingSink {
    reject_attach: bool,
    reject_detach: bool,
}

impl RejectingSink {
    /// Refuse both attach and detach.
    #[must_use]
    pub fn new() -> Self {
        Self {
            reject_attach: true,
            reject_detach: true,
        }
    }

    /// Accept attach but refuse detach, for exercising teardown failures.
    #[must_use]
    pub fn detach_only() -> Self {
        Self {
            reject_attach: false,
            reject_detach: true,
        }
    }
}

impl Default for RejectingSink {
    fn default() -> Self {
        Self::new()
    }
}

impl InterruptSink for RejectingSink {
    fn attach(&mut self, _variable: &Variable) -> Result<(), SinkError> {
        if self.reject_attach {
            Err(SinkError::new("attach refused"))
        } else {
            Ok(())
        }
    }

    fn detach(&mut self, _variable: &Variable) -> Result<(), SinkError> {
        if self.reject_detach {
            Err(SinkError::new("detach refused"))
        } else {
            Ok(())
        }
    }

    fn deliver(&mut self, _variable: &Variable, _sample: &Sample) -> Result<(), SinkError> {
        Ok(())
    }
}
