//! Device addresses and live variable handles.

use std::any::Any;
use std::fmt;

use crate::binding::Binding;
use crate::value::ValueKind;

/// Equality-comparable identity of one device variable.
///
/// Implementations compare equal exactly when both addresses denote the same
/// underlying device data, however the bindings were spelled. The driver
/// folds equal-address bindings into a single [`Variable`].
pub trait DeviceAddress: Send {
    /// The concrete address as [`Any`], for downcasting in [`matches`].
    ///
    /// [`matches`]: DeviceAddress::matches
    fn as_any(&self) -> &dyn Any;

    /// Whether `other` denotes the same device data as `self`.
    fn matches(&self, other: &dyn DeviceAddress) -> bool;
}

/// Host-runtime parameter index assigned to a variable at creation.
///
/// Indices are dense, start at zero, and stay stable for the driver's
/// lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParamIndex(pub u32);

impl fmt::Display for ParamIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The driver's handle for one unique device variable.
///
/// Every binding whose address compares equal shares this handle, and with
/// it the parameter index and the subscription count.
pub struct Variable {
    index: ParamIndex,
    kind: ValueKind,
    binding: Binding,
    address: Box<dyn DeviceAddress>,
    subscribers: u32,
    payload: Option<Box<dyn Any + Send>>,
}

impl Variable {
    pub(crate) fn new(
        index: ParamIndex,
        kind: ValueKind,
        binding: Binding,
        address: Box<dyn DeviceAddress>,
    ) -> Self {
        Self {
            index,
            kind,
            binding,
            address,
            subscribers: 0,
            payload: None,
        }
    }

    /// Parameter index under which the host runtime addresses this variable.
    #[must_use]
    pub fn index(&self) -> ParamIndex {
        self.index
    }

    /// Value kind fixed by the function's handler registration.
    #[must_use]
    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    /// Function name this variable dispatches through.
    #[must_use]
    pub fn function(&self) -> &str {
        self.binding.function()
    }

    /// The binding that first created this variable.
    #[must_use]
    pub fn binding(&self) -> &Binding {
        &self.binding
    }

    /// The resolved device address.
    #[must_use]
    pub fn address(&self) -> &dyn DeviceAddress {
        self.address.as_ref()
    }

    /// Downcast the address to its concrete driver type.
    #[must_use]
    pub fn address_as<A: DeviceAddress + 'static>(&self) -> Option<&A> {
        self.address.as_any().downcast_ref::<A>()
    }

    /// Number of interrupt listeners currently attached.
    #[must_use]
    pub fn subscribers(&self) -> u32 {
        self.subscribers
    }

    /// True while at least one interrupt listener is attached.
    #[must_use]
    pub fn wants_interrupts(&self) -> bool {
        self.subscribers > 0
    }

    /// Increment the listener count, returning the new count.
    pub(crate) fn add_subscriber(&mut self) -> u32 {
        self.subscribers += 1;
        self.subscribers
    }

    /// Decrement the listener count, returning the new count, or `None` when
    /// already at zero (the count stays clamped).
    pub(crate) fn remove_subscriber(&mut self) -> Option<u32> {
        let next = self.subscribers.checked_sub(1)?;
        self.subscribers = next;
        Some(next)
    }

    /// Attach driver-specific state, replacing any previous payload.
    pub fn set_payload<P: Any + Send>(&mut self, payload: P) {
        self.payload = Some(Box::new(payload));
    }

    /// Borrow the payload, if one of type `P` is attached.
    #[must_use]
    pub fn payload<P: Any>(&self) -> Option<&P> {
        self.payload.as_deref().and_then(|p| p.downcast_ref())
    }

    /// Mutably borrow the payload, if one of type `P` is attached.
    pub fn payload_mut<P: Any>(&mut self) -> Option<&mut P> {
        self.payload.as_deref_mut().and_then(|p| p.downcast_mut())
    }
}

impl fmt::Debug for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Variable")
            .field("index", &self.index)
            .field("kind", &self.kind)
            .field("binding", &self.binding)
            .field("subscribers", &self.subscribers)
            .finish_non_exhaustive()
    }
}

/// Owned snapshot of a variable's identity, safe to hold across driver calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableInfo {
    index: ParamIndex,
    kind: ValueKind,
    binding: Binding,
}

impl VariableInfo {
    pub(crate) fn of(variable: &Variable) -> Self {
        Self {
            index: variable.index,
            kind: variable.kind,
            binding: variable.binding.clone(),
        }
    }

    /// Parameter index of the variable.
    #[must_use]
    pub fn index(&self) -> ParamIndex {
        self.index
    }

    /// Value kind of the variable.
    #[must_use]
    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    /// Function name of the variable.
    #[must_use]
    pub fn function(&self) -> &str {
        self.binding.function()
    }

    /// The binding that created the variable.
    #[must_use]
    pub fn binding(&self) -> &Binding {
        &self.binding
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Eq)]
    struct Slot(u32);

    impl DeviceAddress for Slot {
        fn as_any(&self) -> &dyn Any {
            self
        }

        fn matches(&self, other: &dyn DeviceAddress) -> bool {
            other.as_any().downcast_ref::<Slot>() == Some(self)
        }
    }

    fn variable(index: u32) -> Variable {
        Variable::new(
            ParamIndex(index),
            ValueKind::Int32,
            Binding::parse("SLOT 4").unwrap(),
            Box::new(Slot(4)),
        )
    }

    #[test]
    fn address_downcast_and_matching() {
        let var = variable(0);
        assert_eq!(var.address_as::<Slot>(), Some(&Slot(4)));
        assert!(var.address().matches(&Slot(4)));
        assert!(!var.address().matches(&Slot(5)));
    }

    #[test]
    fn payload_round_trip_by_type() {
        let mut var = variable(0);
        assert_eq!(var.payload::<String>(), None);
        var.set_payload(String::from("state"));
        assert_eq!(var.payload::<String>().map(String::as_str), Some("state"));
        assert_eq!(var.payload::<u32>(), None);
        if let Some(text) = var.payload_mut::<String>() {
            text.push('!');
        }
        assert_eq!(var.payload::<String>().map(String::as_str), Some("state!"));
    }

    #[test]
    fn subscriber_count_clamps_at_zero() {
        let mut var = variable(1);
        assert!(!var.wants_interrupts());
        assert_eq!(var.add_subscriber(), 1);
        assert_eq!(var.add_subscriber(), 2);
        assert_eq!(var.remove_subscriber(), Some(1));
        assert_eq!(var.remove_subscriber(), Some(0));
        assert_eq!(var.remove_subscriber(), None);
        assert_eq!(var.subscribers(), 0);
    }
}
