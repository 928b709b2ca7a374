//! Callback results and the status/alarm vocabulary.
//!
//! Handlers report success as a [`Reading`] (reads) or an [`Ack`] (writes),
//! optionally overriding the alarm recorded on the parameter and the
//! interrupt propagation for that call. Failures are a [`DeviceError`]
//! whose status travels back to the host runtime verbatim.

#![allow(missing_docs)]

use std::fmt;

use thiserror::Error;

/// Completion status of one device operation, as reported to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceStatus {
    #[default]
    Ok,
    Timeout,
    Overflow,
    Error,
    Disconnected,
    Disabled,
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeviceStatus::Ok => "ok",
            DeviceStatus::Timeout => "timeout",
            DeviceStatus::Overflow => "overflow",
            DeviceStatus::Error => "error",
            DeviceStatus::Disconnected => "disconnected",
            DeviceStatus::Disabled => "disabled",
        };
        f.write_str(name)
    }
}

/// Host-runtime alarm condition vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlarmCondition {
    #[default]
    None,
    Read,
    Write,
    Hihi,
    High,
    Lolo,
    Low,
    State,
    Cos,
    Comm,
    Timeout,
    HwLimit,
    Calc,
    Scan,
    Link,
    Soft,
    BadSub,
    Udf,
    Disable,
    Simm,
    ReadAccess,
    WriteAccess,
}

/// Host-runtime alarm severity vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum AlarmSeverity {
    #[default]
    None,
    Minor,
    Major,
    Invalid,
}

/// Alarm condition and severity pair recorded on a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Alarm {
    pub condition: AlarmCondition,
    pub severity: AlarmSeverity,
}

impl Alarm {
    /// The no-alarm value; recording it clears any previous alarm.
    pub const NONE: Alarm = Alarm {
        condition: AlarmCondition::None,
        severity: AlarmSeverity::None,
    };

    /// Alarm with the given condition and severity.
    #[must_use]
    pub const fn new(condition: AlarmCondition, severity: AlarmSeverity) -> Self {
        Self {
            condition,
            severity,
        }
    }
}

/// Interrupt propagation requested by a handler for one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Notify {
    /// Propagate to interrupt listeners regardless of driver policy.
    On,
    /// Never propagate.
    Off,
    /// Follow the driver policy: successful writes propagate when
    /// auto-interrupts are enabled, reads stay silent.
    #[default]
    Default,
}

/// Successful read outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading<T> {
    /// The value read from the device.
    pub value: T,
    /// Alarm to record on the parameter; `None` clears any previous alarm.
    pub alarm: Option<Alarm>,
    /// Interrupt propagation override for this call.
    pub notify: Notify,
}

impl<T> Reading<T> {
    /// Reading with no alarm override and default propagation.
    pub fn new(value: T) -> Self {
        Self {
            value,
            alarm: None,
            notify: Notify::Default,
        }
    }

    /// Record this alarm on the parameter instead of clearing it.
    #[must_use]
    pub fn with_alarm(mut self, alarm: Alarm) -> Self {
        self.alarm = Some(alarm);
        self
    }

    /// Override interrupt propagation for this call.
    #[must_use]
    pub fn with_notify(mut self, notify: Notify) -> Self {
        self.notify = notify;
        self
    }
}

impl<T> From<T> for Reading<T> {
    fn from(value: T) -> Self {
        Reading::new(value)
    }
}

/// Successful write outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Ack {
    /// Alarm to record on the parameter; `None` clears any previous alarm.
    pub alarm: Option<Alarm>,
    /// Interrupt propagation override for this call.
    pub notify: Notify,
}

impl Ack {
    /// Plain acknowledgement: clears alarms, default propagation.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record this alarm on the parameter instead of clearing it.
    #[must_use]
    pub fn with_alarm(mut self, alarm: Alarm) -> Self {
        self.alarm = Some(alarm);
        self
    }

    /// Override interrupt propagation for this call.
    #[must_use]
    pub fn with_notify(mut self, notify: Notify) -> Self {
        self.notify = notify;
        self
    }
}

/// Failure reported by a device handler.
///
/// A status of [`DeviceStatus::Ok`] inside a failure is contradictory and is
/// coerced to [`DeviceStatus::Error`] during dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("device reported status {status}")]
pub struct DeviceError {
    /// Status carried back to the host runtime.
    pub status: DeviceStatus,
    /// Alarm override; when absent the driver derives one from the status.
    pub alarm: Option<Alarm>,
}

impl DeviceError {
    /// Failure with the given status and no alarm override.
    #[must_use]
    pub fn new(status: DeviceStatus) -> Self {
        Self {
            status,
            alarm: None,
        }
    }

    /// Record this alarm instead of the derived one.
    #[must_use]
    pub fn with_alarm(mut self, alarm: Alarm) -> Self {
        self.alarm = Some(alarm);
        self
    }
}

/// Result of a read handler.
pub type ReadResult<T> = Result<Reading<T>, DeviceError>;

/// Result of a write handler.
pub type WriteResult = Result<Ack, DeviceError>;
