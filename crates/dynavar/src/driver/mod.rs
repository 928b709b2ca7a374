//! Driver construction, binding resolution, dispatch and subscriptions.
//!
//! A [`Driver`] owns the device context, the handler registry, the live
//! variable table and the parameter cache for one named port. The host
//! runtime serializes access with one lock per port; every entry point
//! takes `&mut self` to mirror that discipline.

mod dispatch;
mod interrupts;

use rustc_hash::FxHashMap;
use smol_str::SmolStr;
use tracing::{debug, warn};

use crate::binding::Binding;
use crate::cache::ParamCache;
use crate::error::{BindingError, RegisterError, Rejection};
use crate::handlers::{
    ArrayHandlers, DigitalHandlers, HandlerSet, HandlerTable, OctetHandlers, ScalarHandlers,
};
use crate::host::InterruptSink;
use crate::registry::VarTable;
use crate::result::Alarm;
use crate::value::{Sample, ValueKind};
use crate::variable::{DeviceAddress, ParamIndex, Variable, VariableInfo};

/// Device-specific behavior plugged into a [`Driver`].
pub trait DeviceSupport: Send {
    /// Resolve a parsed binding into an address, or refuse it.
    ///
    /// Addresses returned here drive variable dedup: bindings whose
    /// addresses compare equal share one variable, however they were
    /// spelled.
    fn parse_address(
        &self,
        function: &str,
        arguments: &[SmolStr],
    ) -> Result<Box<dyn DeviceAddress>, Rejection>;

    /// Prepare a freshly created variable (attach a payload, allocate
    /// per-variable resources), or refuse it. The default accepts every
    /// variable untouched.
    fn init_variable(&mut self, variable: &mut Variable) -> Result<(), Rejection> {
        let _ = variable;
        Ok(())
    }
}

type InitHook<D> = Box<dyn FnOnce(&mut Driver<D>) + Send>;

/// Construction options for a [`Driver`].
pub struct DriverOpts<D> {
    blocking: bool,
    auto_interrupts: bool,
    sinks: Vec<(ValueKind, Box<dyn InterruptSink>)>,
    init_hook: Option<InitHook<D>>,
}

impl<D> DriverOpts<D> {
    /// Defaults: non-blocking, auto-interrupts on, no sinks, no hook.
    #[must_use]
    pub fn new() -> Self {
        Self {
            blocking: false,
            auto_interrupts: true,
            sinks: Vec::new(),
            init_hook: None,
        }
    }

    /// Declare that handlers may block on hardware. Recorded for the
    /// embedding to schedule around; not interpreted by this crate.
    #[must_use]
    pub fn blocking(mut self, blocking: bool) -> Self {
        self.blocking = blocking;
        self
    }

    /// Whether successful writes with [`Notify::Default`] propagate to
    /// interrupt listeners.
    ///
    /// [`Notify::Default`]: crate::result::Notify::Default
    #[must_use]
    pub fn auto_interrupts(mut self, enabled: bool) -> Self {
        self.auto_interrupts = enabled;
        self
    }

    /// Plug in the host's interrupt capability for one value kind.
    /// Subscriptions for kinds without a sink are rejected.
    #[must_use]
    pub fn interrupt_sink(mut self, kind: ValueKind, sink: Box<dyn InterruptSink>) -> Self {
        self.sinks.push((kind, sink));
        self
    }

    /// One-time hook run by [`Driver::complete_init`] once the embedding
    /// has finished registration and record binding.
    #[must_use]
    pub fn init_hook(mut self, hook: impl FnOnce(&mut Driver<D>) + Send + 'static) -> Self {
        self.init_hook = Some(Box::new(hook));
        self
    }
}

impl<D> Default for DriverOpts<D> {
    fn default() -> Self {
        Self::new()
    }
}

/// A named driver port owning its device context, variables and handlers.
pub struct Driver<D> {
    port: SmolStr,
    device: D,
    blocking: bool,
    auto_interrupts: bool,
    handlers: HandlerTable<D>,
    vars: VarTable,
    cache: ParamCache,
    sinks: FxHashMap<ValueKind, Box<dyn InterruptSink>>,
    init_hook: Option<InitHook<D>>,
}

impl<D: DeviceSupport> Driver<D> {
    /// Driver for `port` around the given device context.
    pub fn new(port: impl Into<SmolStr>, device: D, opts: DriverOpts<D>) -> Self {
        let mut sinks = FxHashMap::default();
        for (kind, sink) in opts.sinks {
            sinks.insert(kind, sink);
        }
        Self {
            port: port.into(),
            device,
            blocking: opts.blocking,
            auto_interrupts: opts.auto_interrupts,
            handlers: HandlerTable::new(),
            vars: VarTable::new(),
            cache: ParamCache::new(),
            sinks,
            init_hook: opts.init_hook,
        }
    }

    /// Port name this driver answers to.
    #[must_use]
    pub fn port(&self) -> &str {
        self.port.as_str()
    }

    /// Whether handlers were declared as potentially blocking.
    #[must_use]
    pub fn blocking(&self) -> bool {
        self.blocking
    }

    /// Borrow the device context.
    #[must_use]
    pub fn device(&self) -> &D {
        &self.device
    }

    /// Mutably borrow the device context.
    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    /// Run the one-time init hook, if any. Call once the embedding has
    /// finished construction, registration and record binding; later calls
    /// are no-ops.
    pub fn complete_init(&mut self) {
        if let Some(hook) = self.init_hook.take() {
            debug!(port = %self.port, "running init hook");
            hook(self);
        }
    }

    /// Register handlers for an `Int32` function.
    pub fn register_int32(
        &mut self,
        function: &str,
        handlers: ScalarHandlers<D, i32>,
    ) -> Result<(), RegisterError> {
        self.register_set(function, HandlerSet::Int32(handlers))
    }

    /// Register handlers for an `Int64` function.
    pub fn register_int64(
        &mut self,
        function: &str,
        handlers: ScalarHandlers<D, i64>,
    ) -> Result<(), RegisterError> {
        self.register_set(function, HandlerSet::Int64(handlers))
    }

    /// Register handlers for a `Float64` function.
    pub fn register_float64(
        &mut self,
        function: &str,
        handlers: ScalarHandlers<D, f64>,
    ) -> Result<(), RegisterError> {
        self.register_set(function, HandlerSet::Float64(handlers))
    }

    /// Register handlers for a masked digital function.
    pub fn register_uint32_digital(
        &mut self,
        function: &str,
        handlers: DigitalHandlers<D>,
    ) -> Result<(), RegisterError> {
        self.register_set(function, HandlerSet::UInt32Digital(handlers))
    }

    /// Register handlers for an octet-string function.
    pub fn register_octet(
        &mut self,
        function: &str,
        handlers: OctetHandlers<D>,
    ) -> Result<(), RegisterError> {
        self.register_set(function, HandlerSet::Octet(handlers))
    }

    /// Register handlers for an `Int8Array` function.
    pub fn register_int8_array(
        &mut self,
        function: &str,
        handlers: ArrayHandlers<D, i8>,
    ) -> Result<(), RegisterError> {
        self.register_set(function, HandlerSet::Int8Array(handlers))
    }

    /// Register handlers for an `Int16Array` function.
    pub fn register_int16_array(
        &mut self,
        function: &str,
        handlers: ArrayHandlers<D, i16>,
    ) -> Result<(), RegisterError> {
        self.register_set(function, HandlerSet::Int16Array(handlers))
    }

    /// Register handlers for an `Int32Array` function.
    pub fn register_int32_array(
        &mut self,
        function: &str,
        handlers: ArrayHandlers<D, i32>,
    ) -> Result<(), RegisterError> {
        self.register_set(function, HandlerSet::Int32Array(handlers))
    }

    /// Register handlers for an `Int64Array` function.
    pub fn register_int64_array(
        &mut self,
        function: &str,
        handlers: ArrayHandlers<D, i64>,
    ) -> Result<(), RegisterError> {
        self.register_set(function, HandlerSet::Int64Array(handlers))
    }

    /// Register handlers for a `Float32Array` function.
    pub fn register_float32_array(
        &mut self,
        function: &str,
        handlers: ArrayHandlers<D, f32>,
    ) -> Result<(), RegisterError> {
        self.register_set(function, HandlerSet::Float32Array(handlers))
    }

    /// Register handlers for a `Float64Array` function.
    pub fn register_float64_array(
        &mut self,
        function: &str,
        handlers: ArrayHandlers<D, f64>,
    ) -> Result<(), RegisterError> {
        self.register_set(function, HandlerSet::Float64Array(handlers))
    }

    fn register_set(&mut self, function: &str, set: HandlerSet<D>) -> Result<(), RegisterError> {
        let kind = set.kind();
        match self.handlers.register(function, set) {
            Ok(()) => {
                debug!(port = %self.port, function, kind = %kind, "handlers registered");
                Ok(())
            }
            Err(err) => {
                warn!(port = %self.port, error = %err, "handler registration discarded");
                Err(err)
            }
        }
    }

    /// Resolve a binding string to its parameter index, creating the
    /// variable on first use.
    ///
    /// Resolution normalizes the text, asks the device for an address and
    /// folds equal addresses onto one existing variable. On failure no
    /// partial state remains: a later resolve of a different binding gets
    /// the index this one would have received.
    pub fn resolve_binding(&mut self, raw: &str) -> Result<ParamIndex, BindingError> {
        match self.try_resolve(raw) {
            Ok(index) => Ok(index),
            Err(err) => {
                warn!(port = %self.port, binding = raw, error = %err, "binding rejected");
                Err(err)
            }
        }
    }

    fn try_resolve(&mut self, raw: &str) -> Result<ParamIndex, BindingError> {
        let binding = Binding::parse(raw)?;
        let kind = self
            .handlers
            .kind_of(binding.function())
            .ok_or_else(|| BindingError::UnknownFunction(SmolStr::new(binding.function())))?;
        let normalized = binding.normalized();
        if let Some(index) = self.cache.find(&normalized) {
            return Ok(index);
        }
        let address = self
            .device
            .parse_address(binding.function(), binding.arguments())
            .map_err(|reason| BindingError::AddressRejected {
                binding: SmolStr::new(&normalized),
                reason,
            })?;
        if let Some(index) = self.vars.find_by_address(address.as_ref()) {
            debug!(port = %self.port, binding = raw, index = %index, "binding folded onto existing variable");
            return Ok(index);
        }
        let index = self.cache.next_index();
        debug_assert_eq!(index, self.vars.next_index());
        let mut variable = Variable::new(index, kind, binding, address);
        self.device
            .init_variable(&mut variable)
            .map_err(|reason| BindingError::VariableRejected {
                binding: SmolStr::new(&normalized),
                reason,
            })?;
        let created = self.cache.create(&normalized, kind);
        debug_assert_eq!(created, index);
        self.vars.insert(variable);
        debug!(port = %self.port, binding = %normalized, index = %index, kind = %kind, "variable created");
        Ok(index)
    }

    /// The variable bound at `index`, if any.
    #[must_use]
    pub fn variable(&self, index: ParamIndex) -> Option<&Variable> {
        self.vars.get(index)
    }

    /// Snapshot of every live variable, in index order.
    #[must_use]
    pub fn variables(&self) -> Vec<VariableInfo> {
        self.vars.snapshot()
    }

    /// Snapshot of the variables with at least one interrupt listener.
    #[must_use]
    pub fn interrupt_variables(&self) -> Vec<VariableInfo> {
        self.vars.interrupt_snapshot()
    }

    /// Last cached sample for a parameter, if any. Array parameters are
    /// never cached.
    #[must_use]
    pub fn cached(&self, index: ParamIndex) -> Option<Sample> {
        self.cache.sample(index).cloned()
    }

    /// Current alarm recorded on a parameter.
    #[must_use]
    pub fn alarm(&self, index: ParamIndex) -> Option<Alarm> {
        self.cache.alarm(index)
    }
}
