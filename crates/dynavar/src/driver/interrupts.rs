//! Subscription shims and interrupt propagation.
//!
//! Subscriptions wrap the host's native registration with a per-variable
//! count: the host sink always runs first and may refuse, and the
//! function's interrupt hook fires only when the count crosses between
//! zero and one. Delivery comes in two flavors: the batched sweep over
//! dirtied cached parameters ([`Driver::post_updates`]) and direct
//! per-array delivery.

use tracing::{debug, warn};

use crate::error::{DispatchError, SinkError, SubscribeError};
use crate::handlers::InterruptEdge;
use crate::result::Alarm;
use crate::value::{Sample, ValueKind};
use crate::variable::ParamIndex;

use super::{DeviceSupport, Driver};

impl<D: DeviceSupport> Driver<D> {
    /// Attach one interrupt listener to the variable at `index`.
    ///
    /// The host sink registers first; if it refuses, the count and the
    /// interrupt hook stay untouched. On the 0→1 transition the function's
    /// interrupt hook runs with [`InterruptEdge::FirstUser`].
    pub fn subscribe(&mut self, index: ParamIndex) -> Result<(), SubscribeError> {
        let Self {
            port,
            device,
            handlers,
            vars,
            sinks,
            ..
        } = self;
        let var = vars
            .get_mut(index)
            .ok_or(SubscribeError::UnknownIndex(index))?;
        let Some(sink) = sinks.get_mut(&var.kind()) else {
            return Err(no_sink(var.function(), var.kind()));
        };
        sink.attach(var).map_err(|reason| SubscribeError::Rejected {
            function: var.function().into(),
            reason,
        })?;
        let count = var.add_subscriber();
        if count == 1 {
            if let Some(hook) = handlers.get_mut(var.function()).and_then(|set| set.interrupt_mut())
            {
                hook(device, var, InterruptEdge::FirstUser);
            }
        }
        debug!(port = %port, index = %index, count, "interrupt listener attached");
        Ok(())
    }

    /// Detach one interrupt listener from the variable at `index`.
    ///
    /// The host sink deregisters first; if it refuses, the count stays
    /// untouched. On the 1→0 transition the interrupt hook runs with
    /// [`InterruptEdge::LastUser`]. A cancel with no listeners attached is
    /// a host-side logic error: the count stays clamped at zero and the
    /// call fails.
    pub fn unsubscribe(&mut self, index: ParamIndex) -> Result<(), SubscribeError> {
        let Self {
            port,
            device,
            handlers,
            vars,
            sinks,
            ..
        } = self;
        let var = vars
            .get_mut(index)
            .ok_or(SubscribeError::UnknownIndex(index))?;
        let Some(sink) = sinks.get_mut(&var.kind()) else {
            return Err(no_sink(var.function(), var.kind()));
        };
        sink.detach(var).map_err(|reason| SubscribeError::Rejected {
            function: var.function().into(),
            reason,
        })?;
        match var.remove_subscriber() {
            None => {
                warn!(port = %port, index = %index, "interrupt cancel with no listeners");
                Err(SubscribeError::Underflow {
                    function: var.function().into(),
                })
            }
            Some(0) => {
                if let Some(hook) =
                    handlers.get_mut(var.function()).and_then(|set| set.interrupt_mut())
                {
                    hook(device, var, InterruptEdge::LastUser);
                }
                debug!(port = %port, index = %index, count = 0_u32, "interrupt listener detached");
                Ok(())
            }
            Some(count) => {
                debug!(port = %port, index = %index, count, "interrupt listener detached");
                Ok(())
            }
        }
    }

    /// Store a new `Int32` sample and alarm for a later sweep.
    pub fn post_int32(
        &mut self,
        index: ParamIndex,
        value: i32,
        alarm: Alarm,
    ) -> Result<(), DispatchError> {
        self.post_sample(index, Sample::Int32(value), alarm)
    }

    /// Store a new `Int64` sample and alarm for a later sweep.
    pub fn post_int64(
        &mut self,
        index: ParamIndex,
        value: i64,
        alarm: Alarm,
    ) -> Result<(), DispatchError> {
        self.post_sample(index, Sample::Int64(value), alarm)
    }

    /// Store a new `Float64` sample and alarm for a later sweep.
    pub fn post_float64(
        &mut self,
        index: ParamIndex,
        value: f64,
        alarm: Alarm,
    ) -> Result<(), DispatchError> {
        self.post_sample(index, Sample::Float64(value), alarm)
    }

    /// Store a new octet sample and alarm for a later sweep.
    pub fn post_octet(
        &mut self,
        index: ParamIndex,
        value: impl Into<String>,
        alarm: Alarm,
    ) -> Result<(), DispatchError> {
        self.post_sample(index, Sample::Octet(value.into()), alarm)
    }

    /// Merge bits under `mask` into a digital parameter for a later sweep.
    pub fn post_uint32_digital(
        &mut self,
        index: ParamIndex,
        value: u32,
        mask: u32,
        alarm: Alarm,
    ) -> Result<(), DispatchError> {
        let Some(var) = self.vars.get(index) else {
            return Err(DispatchError::UnknownIndex(index));
        };
        if var.kind() != ValueKind::UInt32Digital {
            return Err(DispatchError::WrongKind {
                function: var.function().into(),
                expected: var.kind(),
                requested: ValueKind::UInt32Digital,
            });
        }
        self.cache.set_digital(index, value, mask);
        self.cache.set_alarm(index, alarm);
        Ok(())
    }

    /// Deliver every dirtied cached parameter to its attached listeners and
    /// clear the pending set. Parameters without listeners are skipped but
    /// still settle their dirty flag.
    pub fn post_updates(&mut self) {
        let Self {
            port,
            vars,
            cache,
            sinks,
            ..
        } = self;
        for index in cache.take_dirty() {
            let Some(var) = vars.get(index) else { continue };
            if !var.wants_interrupts() {
                continue;
            }
            let Some(sample) = cache.sample(index) else {
                continue;
            };
            let Some(sink) = sinks.get_mut(&var.kind()) else {
                continue;
            };
            if let Err(err) = sink.deliver(var, sample) {
                warn!(port = %port, index = %index, error = %err, "interrupt delivery failed");
            }
        }
    }

    /// Deliver an `Int8Array` immediately; arrays bypass the cache.
    pub fn push_int8_array(
        &mut self,
        index: ParamIndex,
        values: &[i8],
        alarm: Alarm,
    ) -> Result<(), DispatchError> {
        self.push_array_sample(index, Sample::Int8Array(values.to_vec()), alarm)
    }

    /// Deliver an `Int16Array` immediately.
    pub fn push_int16_array(
        &mut self,
        index: ParamIndex,
        values: &[i16],
        alarm: Alarm,
    ) -> Result<(), DispatchError> {
        self.push_array_sample(index, Sample::Int16Array(values.to_vec()), alarm)
    }

    /// Deliver an `Int32Array` immediately.
    pub fn push_int32_array(
        &mut self,
        index: ParamIndex,
        values: &[i32],
        alarm: Alarm,
    ) -> Result<(), DispatchError> {
        self.push_array_sample(index, Sample::Int32Array(values.to_vec()), alarm)
    }

    /// Deliver an `Int64Array` immediately.
    pub fn push_int64_array(
        &mut self,
        index: ParamIndex,
        values: &[i64],
        alarm: Alarm,
    ) -> Result<(), DispatchError> {
        self.push_array_sample(index, Sample::Int64Array(values.to_vec()), alarm)
    }

    /// Deliver a `Float32Array` immediately.
    pub fn push_float32_array(
        &mut self,
        index: ParamIndex,
        values: &[f32],
        alarm: Alarm,
    ) -> Result<(), DispatchError> {
        self.push_array_sample(index, Sample::Float32Array(values.to_vec()), alarm)
    }

    /// Deliver a `Float64Array` immediately.
    pub fn push_float64_array(
        &mut self,
        index: ParamIndex,
        values: &[f64],
        alarm: Alarm,
    ) -> Result<(), DispatchError> {
        self.push_array_sample(index, Sample::Float64Array(values.to_vec()), alarm)
    }

    fn post_sample(
        &mut self,
        index: ParamIndex,
        sample: Sample,
        alarm: Alarm,
    ) -> Result<(), DispatchError> {
        let Some(var) = self.vars.get(index) else {
            return Err(DispatchError::UnknownIndex(index));
        };
        if var.kind() != sample.kind() {
            return Err(DispatchError::WrongKind {
                function: var.function().into(),
                expected: var.kind(),
                requested: sample.kind(),
            });
        }
        self.cache.set_sample(index, sample);
        self.cache.set_alarm(index, alarm);
        Ok(())
    }

    fn push_array_sample(
        &mut self,
        index: ParamIndex,
        sample: Sample,
        alarm: Alarm,
    ) -> Result<(), DispatchError> {
        let Some(var) = self.vars.get(index) else {
            return Err(DispatchError::UnknownIndex(index));
        };
        if var.kind() != sample.kind() {
            return Err(DispatchError::WrongKind {
                function: var.function().into(),
                expected: var.kind(),
                requested: sample.kind(),
            });
        }
        self.cache.set_alarm(index, alarm);
        self.deliver_direct(index, sample);
        Ok(())
    }

    /// Hand a sample straight to the variable's listeners, skipping the
    /// cache. No-op without listeners or a sink for the kind.
    pub(crate) fn deliver_direct(&mut self, index: ParamIndex, sample: Sample) {
        let Self {
            port, vars, sinks, ..
        } = self;
        let Some(var) = vars.get(index) else { return };
        if !var.wants_interrupts() {
            return;
        }
        let Some(sink) = sinks.get_mut(&var.kind()) else {
            return;
        };
        if let Err(err) = sink.deliver(var, &sample) {
            warn!(port = %port, index = %index, error = %err, "interrupt delivery failed");
        }
    }
}

fn no_sink(function: &str, kind: ValueKind) -> SubscribeError {
    SubscribeError::Rejected {
        function: function.into(),
        reason: SinkError::new(format!("no interrupt support for kind {kind}")),
    }
}
