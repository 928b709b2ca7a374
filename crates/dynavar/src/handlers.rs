//! Typed handler callbacks and registration bundles.
//!
//! Handlers are registered per function name as a bundle of optional read,
//! write and interrupt callbacks. The first registration pins the function
//! to one value kind; the driver later projects the bundle back to its
//! typed form during dispatch.

use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use crate::error::RegisterError;
use crate::result::{ReadResult, WriteResult};
use crate::value::{Sample, ValueKind};
use crate::variable::Variable;

/// Which side of the subscription transition an interrupt hook sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptEdge {
    /// The first listener attached; start producing data.
    FirstUser,
    /// The last listener detached; stop producing data.
    LastUser,
}

/// Read callback for scalar kinds.
pub type ReadFn<D, T> = Box<dyn FnMut(&mut D, &mut Variable) -> ReadResult<T> + Send>;

/// Write callback for scalar kinds.
pub type WriteFn<D, T> = Box<dyn FnMut(&mut D, &mut Variable, T) -> WriteResult + Send>;

/// Read callback for masked digital variables; only bits set in the mask
/// are meaningful.
pub type DigitalReadFn<D> = Box<dyn FnMut(&mut D, &mut Variable, u32) -> ReadResult<u32> + Send>;

/// Write callback for masked digital variables, receiving value then mask.
pub type DigitalWriteFn<D> =
    Box<dyn FnMut(&mut D, &mut Variable, u32, u32) -> WriteResult + Send>;

/// Read callback for octet strings.
pub type OctetReadFn<D> = Box<dyn FnMut(&mut D, &mut Variable) -> ReadResult<String> + Send>;

/// Write callback for octet strings.
pub type OctetWriteFn<D> = Box<dyn FnMut(&mut D, &mut Variable, &str) -> WriteResult + Send>;

/// Read callback for array kinds; receives the destination capacity as a
/// hint, though longer results are clamped by the driver anyway.
pub type ArrayReadFn<D, T> =
    Box<dyn FnMut(&mut D, &mut Variable, usize) -> ReadResult<Vec<T>> + Send>;

/// Write callback for array kinds.
pub type ArrayWriteFn<D, T> = Box<dyn FnMut(&mut D, &mut Variable, &[T]) -> WriteResult + Send>;

/// Interrupt setup/teardown hook, invoked on subscription edges only.
pub type InterruptFn<D> = Box<dyn FnMut(&mut D, &mut Variable, InterruptEdge) + Send>;

/// Handler bundle for a scalar function.
pub struct ScalarHandlers<D, T> {
    pub(crate) read: Option<ReadFn<D, T>>,
    pub(crate) write: Option<WriteFn<D, T>>,
    pub(crate) interrupt: Option<InterruptFn<D>>,
}

impl<D, T> ScalarHandlers<D, T> {
    /// Empty bundle; dispatch falls back to the parameter cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            read: None,
            write: None,
            interrupt: None,
        }
    }

    /// Set the read callback.
    #[must_use]
    pub fn read(
        mut self,
        f: impl FnMut(&mut D, &mut Variable) -> ReadResult<T> + Send + 'static,
    ) -> Self {
        self.read = Some(Box::new(f));
        self
    }

    /// Set the write callback.
    #[must_use]
    pub fn write(
        mut self,
        f: impl FnMut(&mut D, &mut Variable, T) -> WriteResult + Send + 'static,
    ) -> Self {
        self.write = Some(Box::new(f));
        self
    }

    /// Set the interrupt setup/teardown hook.
    #[must_use]
    pub fn interrupt(
        mut self,
        f: impl FnMut(&mut D, &mut Variable, InterruptEdge) + Send + 'static,
    ) -> Self {
        self.interrupt = Some(Box::new(f));
        self
    }
}

impl<D, T> Default for ScalarHandlers<D, T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Handler bundle for a masked digital function.
pub struct DigitalHandlers<D> {
    pub(crate) read: Option<DigitalReadFn<D>>,
    pub(crate) write: Option<DigitalWriteFn<D>>,
    pub(crate) interrupt: Option<InterruptFn<D>>,
}

impl<D> DigitalHandlers<D> {
    /// Empty bundle; dispatch falls back to the parameter cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            read: None,
            write: None,
            interrupt: None,
        }
    }

    /// Set the read callback.
    #[must_use]
    pub fn read(
        mut self,
        f: impl FnMut(&mut D, &mut Variable, u32) -> ReadResult<u32> + Send + 'static,
    ) -> Self {
        self.read = Some(Box::new(f));
        self
    }

    /// Set the write callback, receiving value then mask.
    #[must_use]
    pub fn write(
        mut self,
        f: impl FnMut(&mut D, &mut Variable, u32, u32) -> WriteResult + Send + 'static,
    ) -> Self {
        self.write = Some(Box::new(f));
        self
    }

    /// Set the interrupt setup/teardown hook.
    #[must_use]
    pub fn interrupt(
        mut self,
        f: impl FnMut(&mut D, &mut Variable, InterruptEdge) + Send + 'static,
    ) -> Self {
        self.interrupt = Some(Box::new(f));
        self
    }
}

impl<D> Default for DigitalHandlers<D> {
    fn default() -> Self {
        Self::new()
    }
}

/// Handler bundle for an octet-string function.
pub struct OctetHandlers<D> {
    pub(crate) read: Option<OctetReadFn<D>>,
    pub(crate) write: Option<OctetWriteFn<D>>,
    pub(crate) interrupt: Option<InterruptFn<D>>,
}

impl<D> OctetHandlers<D> {
    /// Empty bundle; dispatch falls back to the parameter cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            read: None,
            write: None,
            interrupt: None,
        }
    }

    /// Set the read callback.
    #[must_use]
    pub fn read(
        mut self,
        f: impl FnMut(&mut D, &mut Variable) -> ReadResult<String> + Send + 'static,
    ) -> Self {
        self.read = Some(Box::new(f));
        self
    }

    /// Set the write callback.
    #[must_use]
    pub fn write(
        mut self,
        f: impl FnMut(&mut D, &mut Variable, &str) -> WriteResult + Send + 'static,
    ) -> Self {
        self.write = Some(Box::new(f));
        self
    }

    /// Set the interrupt setup/teardown hook.
    #[must_use]
    pub fn interrupt(
        mut self,
        f: impl FnMut(&mut D, &mut Variable, InterruptEdge) + Send + 'static,
    ) -> Self {
        self.interrupt = Some(Box::new(f));
        self
    }
}

impl<D> Default for OctetHandlers<D> {
    fn default() -> Self {
        Self::new()
    }
}

/// Handler bundle for an array function. Arrays bypass the parameter
/// cache, so reads require a callback.
pub struct ArrayHandlers<D, T> {
    pub(crate) read: Option<ArrayReadFn<D, T>>,
    pub(crate) write: Option<ArrayWriteFn<D, T>>,
    pub(crate) interrupt: Option<InterruptFn<D>>,
}

impl<D, T> ArrayHandlers<D, T> {
    /// Empty bundle.
    #[must_use]
    pub fn new() -> Self {
        Self {
            read: None,
            write: None,
            interrupt: None,
        }
    }

    /// Set the read callback.
    #[must_use]
    pub fn read(
        mut self,
        f: impl FnMut(&mut D, &mut Variable, usize) -> ReadResult<Vec<T>> + Send + 'static,
    ) -> Self {
        self.read = Some(Box::new(f));
        self
    }

    /// Set the write callback.
    #[must_use]
    pub fn write(
        mut self,
        f: impl FnMut(&mut D, &mut Variable, &[T]) -> WriteResult + Send + 'static,
    ) -> Self {
        self.write = Some(Box::new(f));
        self
    }

    /// Set the interrupt setup/teardown hook.
    #[must_use]
    pub fn interrupt(
        mut self,
        f: impl FnMut(&mut D, &mut Variable, InterruptEdge) + Send + 'static,
    ) -> Self {
        self.interrupt = Some(Box::new(f));
        self
    }
}

impl<D, T> Default for ArrayHandlers<D, T> {
    fn default() -> Self {
        Self::new()
    }
}

/// One function's registered handlers, tagged with the pinned value kind.
pub(crate) enum HandlerSet<D> {
    Int32(ScalarHandlers<D, i32>),
    Int64(ScalarHandlers<D, i64>),
    UInt32Digital(DigitalHandlers<D>),
    Float64(ScalarHandlers<D, f64>),
    Octet(OctetHandlers<D>),
    Int8Array(ArrayHandlers<D, i8>),
    Int16Array(ArrayHandlers<D, i16>),
    Int32Array(ArrayHandlers<D, i32>),
    Int64Array(ArrayHandlers<D, i64>),
    Float32Array(ArrayHandlers<D, f32>),
    Float64Array(ArrayHandlers<D, f64>),
}

impl<D> HandlerSet<D> {
    pub(crate) fn kind(&self) -> ValueKind {
        match self {
            HandlerSet::Int32(_) => ValueKind::Int32,
            HandlerSet::Int64(_) => ValueKind::Int64,
            HandlerSet::UInt32Digital(_) => ValueKind::UInt32Digital,
            HandlerSet::Float64(_) => ValueKind::Float64,
            HandlerSet::Octet(_) => ValueKind::Octet,
            HandlerSet::Int8Array(_) => ValueKind::Int8Array,
            HandlerSet::Int16Array(_) => ValueKind::Int16Array,
            HandlerSet::Int32Array(_) => ValueKind::Int32Array,
            HandlerSet::Int64Array(_) => ValueKind::Int64Array,
            HandlerSet::Float32Array(_) => ValueKind::Float32Array,
            HandlerSet::Float64Array(_) => ValueKind::Float64Array,
        }
    }

    pub(crate) fn interrupt_mut(&mut self) -> Option<&mut InterruptFn<D>> {
        match self {
            HandlerSet::Int32(h) => h.interrupt.as_mut(),
            HandlerSet::Int64(h) => h.interrupt.as_mut(),
            HandlerSet::UInt32Digital(h) => h.interrupt.as_mut(),
            HandlerSet::Float64(h) => h.interrupt.as_mut(),
            HandlerSet::Octet(h) => h.interrupt.as_mut(),
            HandlerSet::Int8Array(h) => h.interrupt.as_mut(),
            HandlerSet::Int16Array(h) => h.interrupt.as_mut(),
            HandlerSet::Int32Array(h) => h.interrupt.as_mut(),
            HandlerSet::Int64Array(h) => h.interrupt.as_mut(),
            HandlerSet::Float32Array(h) => h.interrupt.as_mut(),
            HandlerSet::Float64Array(h) => h.interrupt.as_mut(),
        }
    }
}

/// Function-name keyed handler registry enforcing the one-kind rule.
pub(crate) struct HandlerTable<D> {
    entries: FxHashMap<SmolStr, HandlerSet<D>>,
}

impl<D> HandlerTable<D> {
    pub(crate) fn new() -> Self {
        Self {
            entries: FxHashMap::default(),
        }
    }

    /// Install a handler set. The first registration pins the function's
    /// kind; a later registration with a different kind is rejected and the
    /// existing entry stays intact. Same-kind registration replaces the
    /// whole entry.
    pub(crate) fn register(
        &mut self,
        function: &str,
        set: HandlerSet<D>,
    ) -> Result<(), RegisterError> {
        if let Some(existing) = self.entries.get(function) {
            if existing.kind() != set.kind() {
                return Err(RegisterError::KindConflict {
                    function: function.into(),
                    registered: existing.kind(),
                    requested: set.kind(),
                });
            }
        }
        self.entries.insert(SmolStr::new(function), set);
        Ok(())
    }

    pub(crate) fn kind_of(&self, function: &str) -> Option<ValueKind> {
        self.entries.get(function).map(HandlerSet::kind)
    }

    pub(crate) fn get_mut(&mut self, function: &str) -> Option<&mut HandlerSet<D>> {
        self.entries.get_mut(function)
    }
}

/// Scalar value types dispatchable through the registry.
pub(crate) trait ScalarValue: Copy + 'static {
    const KIND: ValueKind;

    fn sample(self) -> Sample;
    fn from_sample(sample: &Sample) -> Option<Self>;
    fn handlers<D>(set: &mut HandlerSet<D>) -> Option<&mut ScalarHandlers<D, Self>>;
}

impl ScalarValue for i32 {
    const KIND: ValueKind = ValueKind::Int32;

    fn sample(self) -> Sample {
        Sample::Int32(self)
    }

    fn from_sample(sample: &Sample) -> Option<Self> {
        match sample {
            Sample::Int32(v) => Some(*v),
            _ => None,
        }
    }

    fn handlers<D>(set: &mut HandlerSet<D>) -> Option<&mut ScalarHandlers<D, Self>> {
        match set {
            HandlerSet::Int32(h) => Some(h),
            _ => None,
        }
    }
}

impl ScalarValue for i64 {
    const KIND: ValueKind = ValueKind::Int64;

    fn sample(self) -> Sample {
        Sample::Int64(self)
    }

    fn from_sample(sample: &Sample) -> Option<Self> {
        match sample {
            Sample::Int64(v) => Some(*v),
            _ => None,
        }
    }

    fn handlers<D>(set: &mut HandlerSet<D>) -> Option<&mut ScalarHandlers<D, Self>> {
        match set {
            HandlerSet::Int64(h) => Some(h),
            _ => None,
        }
    }
}

impl ScalarValue for f64 {
    const KIND: ValueKind = ValueKind::Float64;

    fn sample(self) -> Sample {
        Sample::Float64(self)
    }

    fn from_sample(sample: &Sample) -> Option<Self> {
        match sample {
            Sample::Float64(v) => Some(*v),
            _ => None,
        }
    }

    fn handlers<D>(set: &mut HandlerSet<D>) -> Option<&mut ScalarHandlers<D, Self>> {
        match set {
            HandlerSet::Float64(h) => Some(h),
            _ => None,
        }
    }
}

/// Array element types dispatchable through the registry.
pub(crate) trait ArrayValue: Copy + 'static {
    const KIND: ValueKind;

    fn sample(values: Vec<Self>) -> Sample;
    fn handlers<D>(set: &mut HandlerSet<D>) -> Option<&mut ArrayHandlers<D, Self>>;
}

impl ArrayValue for i8 {
    const KIND: ValueKind = ValueKind::Int8Array;

    fn sample(values: Vec<Self>) -> Sample {
        Sample::Int8Array(values)
    }

    fn handlers<D>(set: &mut HandlerSet<D>) -> Option<&mut ArrayHandlers<D, Self>> {
        match set {
            HandlerSet::Int8Array(h) => Some(h),
            _ => None,
        }
    }
}

impl ArrayValue for i16 {
    const KIND: ValueKind = ValueKind::Int16Array;

    fn sample(values: Vec<Self>) -> Sample {
        Sample::Int16Array(values)
    }

    fn handlers<D>(set: &mut HandlerSet<D>) -> Option<&mut ArrayHandlers<D, Self>> {
        match set {
            HandlerSet::Int16Array(h) => Some(h),
            _ => None,
        }
    }
}

impl ArrayValue for i32 {
    const KIND: ValueKind = ValueKind::Int32Array;

    fn sample(values: Vec<Self>) -> Sample {
        Sample::Int32Array(values)
    }

    fn handlers<D>(set: &mut HandlerSet<D>) -> Option<&mut ArrayHandlers<D, Self>> {
        match set {
            HandlerSet::Int32Array(h) => Some(h),
            _ => None,
        }
    }
}

impl ArrayValue for i64 {
    const KIND: ValueKind = ValueKind::Int64Array;

    fn sample(values: Vec<Self>) -> Sample {
        Sample::Int64Array(values)
    }

    fn handlers<D>(set: &mut HandlerSet<D>) -> Option<&mut ArrayHandlers<D, Self>> {
        match set {
            HandlerSet::Int64Array(h) => Some(h),
            _ => None,
        }
    }
}

impl ArrayValue for f32 {
    const KIND: ValueKind = ValueKind::Float32Array;

    fn sample(values: Vec<Self>) -> Sample {
        Sample::Float32Array(values)
    }

    fn handlers<D>(set: &mut HandlerSet<D>) -> Option<&mut ArrayHandlers<D, Self>> {
        match set {
            HandlerSet::Float32Array(h) => Some(h),
            _ => None,
        }
    }
}

impl ArrayValue for f64 {
    const KIND: ValueKind = ValueKind::Float64Array;

    fn sample(values: Vec<Self>) -> Sample {
        Sample::Float64Array(values)
    }

    fn handlers<D>(set: &mut HandlerSet<D>) -> Option<&mut ArrayHandlers<D, Self>> {
        match set {
            HandlerSet::Float64Array(h) => Some(h),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::any::Any;

    use super::*;
    use crate::binding::Binding;
    use crate::variable::{DeviceAddress, ParamIndex};

    struct Anywhere;

    impl DeviceAddress for Anywhere {
        fn as_any(&self) -> &dyn Any {
            self
        }

        fn matches(&self, _other: &dyn DeviceAddress) -> bool {
            false
        }
    }

    fn variable(function: &str, kind: ValueKind) -> Variable {
        Variable::new(
            ParamIndex(0),
            kind,
            Binding::parse(function).unwrap(),
            Box::new(Anywhere),
        )
    }

    #[test]
    fn first_registration_pins_the_kind() {
        let mut table: HandlerTable<()> = HandlerTable::new();
        table
            .register("F", HandlerSet::Int32(ScalarHandlers::new()))
            .unwrap();
        let err = table
            .register("F", HandlerSet::Float64(ScalarHandlers::new()))
            .unwrap_err();
        assert_eq!(
            err,
            RegisterError::KindConflict {
                function: "F".into(),
                registered: ValueKind::Int32,
                requested: ValueKind::Float64,
            }
        );
        assert_eq!(table.kind_of("F"), Some(ValueKind::Int32));
    }

    #[test]
    fn same_kind_registration_replaces_the_bundle() {
        let mut table: HandlerTable<()> = HandlerTable::new();
        table
            .register("F", HandlerSet::Int32(ScalarHandlers::new().read(|_, _| Ok(1.into()))))
            .unwrap();
        table
            .register("F", HandlerSet::Int32(ScalarHandlers::new().read(|_, _| Ok(2.into()))))
            .unwrap();

        let mut var = variable("F", ValueKind::Int32);
        let Some(HandlerSet::Int32(bundle)) = table.get_mut("F") else {
            panic!("entry lost");
        };
        let reading = bundle.read.as_mut().unwrap()(&mut (), &mut var).unwrap();
        assert_eq!(reading.value, 2);
    }

    #[test]
    fn projection_refuses_foreign_kinds() {
        let mut set: HandlerSet<()> = HandlerSet::Int32(ScalarHandlers::new());
        assert!(<i32 as ScalarValue>::handlers(&mut set).is_some());
        assert!(<f64 as ScalarValue>::handlers(&mut set).is_none());
        let mut arrays: HandlerSet<()> = HandlerSet::Float32Array(ArrayHandlers::new());
        assert!(<f32 as ArrayValue>::handlers(&mut arrays).is_some());
        assert_eq!(arrays.kind(), ValueKind::Float32Array);
    }
}
