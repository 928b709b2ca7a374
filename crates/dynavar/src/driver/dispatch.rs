//! Typed read and write dispatch.
//!
//! Each call resolves the variable, projects the function's handler bundle
//! back to its typed form, runs the callback and settles the parameter
//! cache, the alarm and the interrupt propagation for that call. Scalar
//! reads without a callback fall back to the cache; scalar writes without
//! one store the value directly.

use smol_str::SmolStr;
use tracing::warn;

use crate::cache::ParamCache;
use crate::error::{DispatchError, Operation};
use crate::handlers::{ArrayValue, HandlerSet, ScalarValue};
use crate::result::{Ack, Alarm, AlarmCondition, AlarmSeverity, DeviceError, DeviceStatus, Notify};
use crate::value::{Sample, ValueKind};
use crate::variable::{ParamIndex, Variable};

use super::{DeviceSupport, Driver};

impl<D: DeviceSupport> Driver<D> {
    /// Read an `Int32` variable.
    ///
    /// Without a read callback the last cached value is returned; a
    /// parameter never written yields
    /// [`ValueUndefined`](DispatchError::ValueUndefined).
    pub fn read_int32(&mut self, index: ParamIndex) -> Result<i32, DispatchError> {
        self.read_scalar(index)
    }

    /// Write an `Int32` variable and cache the written value.
    pub fn write_int32(&mut self, index: ParamIndex, value: i32) -> Result<(), DispatchError> {
        self.write_scalar(index, value)
    }

    /// Read an `Int64` variable.
    pub fn read_int64(&mut self, index: ParamIndex) -> Result<i64, DispatchError> {
        self.read_scalar(index)
    }

    /// Write an `Int64` variable.
    pub fn write_int64(&mut self, index: ParamIndex, value: i64) -> Result<(), DispatchError> {
        self.write_scalar(index, value)
    }

    /// Read a `Float64` variable.
    pub fn read_float64(&mut self, index: ParamIndex) -> Result<f64, DispatchError> {
        self.read_scalar(index)
    }

    /// Write a `Float64` variable.
    pub fn write_float64(&mut self, index: ParamIndex, value: f64) -> Result<(), DispatchError> {
        self.write_scalar(index, value)
    }

    /// Read the bits selected by `mask` from a digital variable.
    pub fn read_uint32_digital(
        &mut self,
        index: ParamIndex,
        mask: u32,
    ) -> Result<u32, DispatchError> {
        let auto = self.auto_interrupts;
        let (value, notify) = {
            let Self {
                device,
                handlers,
                vars,
                cache,
                ..
            } = self;
            let var = vars
                .get_mut(index)
                .ok_or(DispatchError::UnknownIndex(index))?;
            let set = if var.kind() == ValueKind::UInt32Digital {
                handlers.get_mut(var.function())
            } else {
                None
            };
            let Some(HandlerSet::UInt32Digital(digital)) = set else {
                return Err(soft_missing(&self.port, cache, var, Operation::Read));
            };
            match digital.read.as_mut() {
                None => {
                    let Some(&Sample::UInt32Digital(bits)) = cache.sample(index) else {
                        return Err(undefined(var));
                    };
                    return Ok(bits & mask);
                }
                Some(read_fn) => match read_fn(device, var, mask) {
                    Err(err) => {
                        return Err(device_failure(&self.port, cache, index, err, Operation::Read))
                    }
                    Ok(reading) => {
                        cache.set_digital(index, reading.value, mask);
                        settle_alarm(cache, index, reading.alarm);
                        (reading.value & mask, reading.notify)
                    }
                },
            }
        };
        if should_notify(notify, auto, Operation::Read) {
            self.post_updates();
        }
        Ok(value)
    }

    /// Write the bits selected by `mask` of a digital variable; unselected
    /// cached bits are preserved.
    pub fn write_uint32_digital(
        &mut self,
        index: ParamIndex,
        value: u32,
        mask: u32,
    ) -> Result<(), DispatchError> {
        let auto = self.auto_interrupts;
        let notify = {
            let Self {
                device,
                handlers,
                vars,
                cache,
                ..
            } = self;
            let var = vars
                .get_mut(index)
                .ok_or(DispatchError::UnknownIndex(index))?;
            let set = if var.kind() == ValueKind::UInt32Digital {
                handlers.get_mut(var.function())
            } else {
                None
            };
            let Some(HandlerSet::UInt32Digital(digital)) = set else {
                return Err(soft_missing(&self.port, cache, var, Operation::Write));
            };
            let ack = match digital.write.as_mut() {
                None => Ack::default(),
                Some(write_fn) => match write_fn(device, var, value, mask) {
                    Err(err) => {
                        return Err(device_failure(
                            &self.port,
                            cache,
                            index,
                            err,
                            Operation::Write,
                        ))
                    }
                    Ok(ack) => ack,
                },
            };
            cache.set_digital(index, value, mask);
            settle_alarm(cache, index, ack.alarm);
            ack.notify
        };
        if should_notify(notify, auto, Operation::Write) {
            self.post_updates();
        }
        Ok(())
    }

    /// Read an octet string into `dest`, returning the number of bytes
    /// copied. Longer strings are clamped to the destination.
    pub fn read_octet(
        &mut self,
        index: ParamIndex,
        dest: &mut [u8],
    ) -> Result<usize, DispatchError> {
        let auto = self.auto_interrupts;
        let (copied, notify) = {
            let Self {
                device,
                handlers,
                vars,
                cache,
                ..
            } = self;
            let var = vars
                .get_mut(index)
                .ok_or(DispatchError::UnknownIndex(index))?;
            let set = if var.kind() == ValueKind::Octet {
                handlers.get_mut(var.function())
            } else {
                None
            };
            let Some(HandlerSet::Octet(octet)) = set else {
                return Err(soft_missing(&self.port, cache, var, Operation::Read));
            };
            match octet.read.as_mut() {
                None => {
                    let Some(Sample::Octet(text)) = cache.sample(index) else {
                        return Err(undefined(var));
                    };
                    return Ok(copy_clamped(text.as_bytes(), dest));
                }
                Some(read_fn) => match read_fn(device, var) {
                    Err(err) => {
                        return Err(device_failure(&self.port, cache, index, err, Operation::Read))
                    }
                    Ok(reading) => {
                        let copied = copy_clamped(reading.value.as_bytes(), dest);
                        cache.set_sample(index, Sample::Octet(reading.value));
                        settle_alarm(cache, index, reading.alarm);
                        (copied, reading.notify)
                    }
                },
            }
        };
        if should_notify(notify, auto, Operation::Read) {
            self.post_updates();
        }
        Ok(copied)
    }

    /// Write an octet string and cache the written text.
    pub fn write_octet(&mut self, index: ParamIndex, value: &str) -> Result<(), DispatchError> {
        let auto = self.auto_interrupts;
        let notify = {
            let Self {
                device,
                handlers,
                vars,
                cache,
                ..
            } = self;
            let var = vars
                .get_mut(index)
                .ok_or(DispatchError::UnknownIndex(index))?;
            let set = if var.kind() == ValueKind::Octet {
                handlers.get_mut(var.function())
            } else {
                None
            };
            let Some(HandlerSet::Octet(octet)) = set else {
                return Err(soft_missing(&self.port, cache, var, Operation::Write));
            };
            let ack = match octet.write.as_mut() {
                None => Ack::default(),
                Some(write_fn) => match write_fn(device, var, value) {
                    Err(err) => {
                        return Err(device_failure(
                            &self.port,
                            cache,
                            index,
                            err,
                            Operation::Write,
                        ))
                    }
                    Ok(ack) => ack,
                },
            };
            cache.set_sample(index, Sample::Octet(value.to_owned()));
            settle_alarm(cache, index, ack.alarm);
            ack.notify
        };
        if should_notify(notify, auto, Operation::Write) {
            self.post_updates();
        }
        Ok(())
    }

    /// Read an `Int8Array` variable into `dest`, returning the element
    /// count copied. Longer results keep their leading elements.
    pub fn read_int8_array(
        &mut self,
        index: ParamIndex,
        dest: &mut [i8],
    ) -> Result<usize, DispatchError> {
        self.read_array(index, dest)
    }

    /// Write an `Int8Array` variable.
    pub fn write_int8_array(
        &mut self,
        index: ParamIndex,
        values: &[i8],
    ) -> Result<(), DispatchError> {
        self.write_array(index, values)
    }

    /// Read an `Int16Array` variable into `dest`.
    pub fn read_int16_array(
        &mut self,
        index: ParamIndex,
        dest: &mut [i16],
    ) -> Result<usize, DispatchError> {
        self.read_array(index, dest)
    }

    /// Write an `Int16Array` variable.
    pub fn write_int16_array(
        &mut self,
        index: ParamIndex,
        values: &[i16],
    ) -> Result<(), DispatchError> {
        self.write_array(index, values)
    }

    /// Read an `Int32Array` variable into `dest`.
    pub fn read_int32_array(
        &mut self,
        index: ParamIndex,
        dest: &mut [i32],
    ) -> Result<usize, DispatchError> {
        self.read_array(index, dest)
    }

    /// Write an `Int32Array` variable.
    pub fn write_int32_array(
        &mut self,
        index: ParamIndex,
        values: &[i32],
    ) -> Result<(), DispatchError> {
        self.write_array(index, values)
    }

    /// Read an `Int64Array` variable into `dest`.
    pub fn read_int64_array(
        &mut self,
        index: ParamIndex,
        dest: &mut [i64],
    ) -> Result<usize, DispatchError> {
        self.read_array(index, dest)
    }

    /// Write an `Int64Array` variable.
    pub fn write_int64_array(
        &mut self,
        index: ParamIndex,
        values: &[i64],
    ) -> Result<(), DispatchError> {
        self.write_array(index, values)
    }

    /// Read a `Float32Array` variable into `dest`.
    pub fn read_float32_array(
        &mut self,
        index: ParamIndex,
        dest: &mut [f32],
    ) -> Result<usize, DispatchError> {
        self.read_array(index, dest)
    }

    /// Write a `Float32Array` variable.
    pub fn write_float32_array(
        &mut self,
        index: ParamIndex,
        values: &[f32],
    ) -> Result<(), DispatchError> {
        self.write_array(index, values)
    }

    /// Read a `Float64Array` variable into `dest`.
    pub fn read_float64_array(
        &mut self,
        index: ParamIndex,
        dest: &mut [f64],
    ) -> Result<usize, DispatchError> {
        self.read_array(index, dest)
    }

    /// Write a `Float64Array` variable.
    pub fn write_float64_array(
        &mut self,
        index: ParamIndex,
        values: &[f64],
    ) -> Result<(), DispatchError> {
        self.write_array(index, values)
    }

    fn read_scalar<T: ScalarValue>(&mut self, index: ParamIndex) -> Result<T, DispatchError> {
        let auto = self.auto_interrupts;
        let (value, notify) = {
            let Self {
                device,
                handlers,
                vars,
                cache,
                ..
            } = self;
            let var = vars
                .get_mut(index)
                .ok_or(DispatchError::UnknownIndex(index))?;
            let set = if var.kind() == T::KIND {
                handlers.get_mut(var.function())
            } else {
                None
            };
            let Some(bundle) = set.and_then(T::handlers) else {
                return Err(soft_missing(&self.port, cache, var, Operation::Read));
            };
            match bundle.read.as_mut() {
                None => {
                    let cached = cache.sample(index).and_then(T::from_sample);
                    return cached.ok_or_else(|| undefined(var));
                }
                Some(read_fn) => match read_fn(device, var) {
                    Err(err) => {
                        return Err(device_failure(&self.port, cache, index, err, Operation::Read))
                    }
                    Ok(reading) => {
                        cache.set_sample(index, T::sample(reading.value));
                        settle_alarm(cache, index, reading.alarm);
                        (reading.value, reading.notify)
                    }
                },
            }
        };
        if should_notify(notify, auto, Operation::Read) {
            self.post_updates();
        }
        Ok(value)
    }

    fn write_scalar<T: ScalarValue>(
        &mut self,
        index: ParamIndex,
        value: T,
    ) -> Result<(), DispatchError> {
        let auto = self.auto_interrupts;
        let notify = {
            let Self {
                device,
                handlers,
                vars,
                cache,
                ..
            } = self;
            let var = vars
                .get_mut(index)
                .ok_or(DispatchError::UnknownIndex(index))?;
            let set = if var.kind() == T::KIND {
                handlers.get_mut(var.function())
            } else {
                None
            };
            let Some(bundle) = set.and_then(T::handlers) else {
                return Err(soft_missing(&self.port, cache, var, Operation::Write));
            };
            let ack = match bundle.write.as_mut() {
                None => Ack::default(),
                Some(write_fn) => match write_fn(device, var, value) {
                    Err(err) => {
                        return Err(device_failure(
                            &self.port,
                            cache,
                            index,
                            err,
                            Operation::Write,
                        ))
                    }
                    Ok(ack) => ack,
                },
            };
            cache.set_sample(index, T::sample(value));
            settle_alarm(cache, index, ack.alarm);
            ack.notify
        };
        if should_notify(notify, auto, Operation::Write) {
            self.post_updates();
        }
        Ok(())
    }

    fn read_array<T: ArrayValue>(
        &mut self,
        index: ParamIndex,
        dest: &mut [T],
    ) -> Result<usize, DispatchError> {
        let auto = self.auto_interrupts;
        let (copied, full, notify) = {
            let Self {
                device,
                handlers,
                vars,
                cache,
                ..
            } = self;
            let var = vars
                .get_mut(index)
                .ok_or(DispatchError::UnknownIndex(index))?;
            let set = if var.kind() == T::KIND {
                handlers.get_mut(var.function())
            } else {
                None
            };
            let Some(bundle) = set.and_then(T::handlers) else {
                return Err(soft_missing(&self.port, cache, var, Operation::Read));
            };
            // Arrays bypass the cache, so there is no fallback read.
            let Some(read_fn) = bundle.read.as_mut() else {
                return Err(soft_missing(&self.port, cache, var, Operation::Read));
            };
            match read_fn(device, var, dest.len()) {
                Err(err) => {
                    return Err(device_failure(&self.port, cache, index, err, Operation::Read))
                }
                Ok(reading) => {
                    let copied = copy_clamped(&reading.value, dest);
                    settle_alarm(cache, index, reading.alarm);
                    (copied, reading.value, reading.notify)
                }
            }
        };
        if should_notify(notify, auto, Operation::Read) {
            self.deliver_direct(index, T::sample(full));
        }
        Ok(copied)
    }

    fn write_array<T: ArrayValue>(
        &mut self,
        index: ParamIndex,
        values: &[T],
    ) -> Result<(), DispatchError> {
        let auto = self.auto_interrupts;
        let notify = {
            let Self {
                device,
                handlers,
                vars,
                cache,
                ..
            } = self;
            let var = vars
                .get_mut(index)
                .ok_or(DispatchError::UnknownIndex(index))?;
            let set = if var.kind() == T::KIND {
                handlers.get_mut(var.function())
            } else {
                None
            };
            let Some(bundle) = set.and_then(T::handlers) else {
                return Err(soft_missing(&self.port, cache, var, Operation::Write));
            };
            let Some(write_fn) = bundle.write.as_mut() else {
                return Err(soft_missing(&self.port, cache, var, Operation::Write));
            };
            match write_fn(device, var, values) {
                Err(err) => {
                    return Err(device_failure(
                        &self.port,
                        cache,
                        index,
                        err,
                        Operation::Write,
                    ))
                }
                Ok(ack) => {
                    settle_alarm(cache, index, ack.alarm);
                    ack.notify
                }
            }
        };
        if should_notify(notify, auto, Operation::Write) {
            self.deliver_direct(index, T::sample(values.to_vec()));
        }
        Ok(())
    }
}

/// Record a soft invalid alarm and report the missing handler.
fn soft_missing(
    port: &str,
    cache: &mut ParamCache,
    var: &Variable,
    operation: Operation,
) -> DispatchError {
    warn!(
        port,
        function = var.function(),
        kind = %var.kind(),
        %operation,
        "dispatch without matching handler"
    );
    cache.set_alarm(
        var.index(),
        Alarm::new(AlarmCondition::Soft, AlarmSeverity::Invalid),
    );
    DispatchError::HandlerMissing {
        function: var.function().into(),
        kind: var.kind(),
        operation,
    }
}

fn undefined(var: &Variable) -> DispatchError {
    DispatchError::ValueUndefined(SmolStr::new(var.binding().normalized()))
}

/// Translate a handler failure: record the supplied or derived alarm and
/// carry the status back, coercing a contradictory `Ok` to `Error`.
fn device_failure(
    port: &str,
    cache: &mut ParamCache,
    index: ParamIndex,
    err: DeviceError,
    operation: Operation,
) -> DispatchError {
    let derived = match operation {
        Operation::Read => AlarmCondition::Read,
        Operation::Write => AlarmCondition::Write,
    };
    cache.set_alarm(
        index,
        err.alarm
            .unwrap_or(Alarm::new(derived, AlarmSeverity::Invalid)),
    );
    let status = if err.status == DeviceStatus::Ok {
        DeviceStatus::Error
    } else {
        err.status
    };
    warn!(port, index = %index, %status, %operation, "handler failed");
    DispatchError::DeviceFailure { status }
}

/// Record the handler-supplied alarm, or clear the slot's alarm when the
/// handler supplied none.
fn settle_alarm(cache: &mut ParamCache, index: ParamIndex, alarm: Option<Alarm>) {
    cache.set_alarm(index, alarm.unwrap_or(Alarm::NONE));
}

fn should_notify(notify: Notify, auto_interrupts: bool, operation: Operation) -> bool {
    match notify {
        Notify::On => true,
        Notify::Off => false,
        Notify::Default => operation == Operation::Write && auto_interrupts,
    }
}

fn copy_clamped<T: Copy>(src: &[T], dest: &mut [T]) -> usize {
    let n = src.len().min(dest.len());
    dest[..n].copy_from_slice(&src[..n]);
    n
}
