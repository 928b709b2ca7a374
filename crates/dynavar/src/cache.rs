//! Parameter cache at the host-runtime boundary.
//!
//! Scalar, digital and octet parameters keep their last value and alarm
//! here. The cache is the read fallback for functions without a read
//! callback and the source for the batched interrupt sweep; array kinds
//! never pass through it. Insertion order doubles as index order.

use indexmap::IndexMap;
use smol_str::SmolStr;

use crate::result::Alarm;
use crate::value::{Sample, ValueKind};
use crate::variable::ParamIndex;

#[derive(Debug)]
pub(crate) struct ParamCache {
    names: IndexMap<SmolStr, ParamIndex>,
    slots: Vec<Slot>,
}

#[derive(Debug)]
struct Slot {
    name: SmolStr,
    kind: ValueKind,
    value: Option<Sample>,
    alarm: Alarm,
    dirty: bool,
}

impl ParamCache {
    pub(crate) fn new() -> Self {
        Self {
            names: IndexMap::new(),
            slots: Vec::new(),
        }
    }

    /// Index the next created slot will get.
    pub(crate) fn next_index(&self) -> ParamIndex {
        ParamIndex(u32::try_from(self.slots.len()).unwrap_or(u32::MAX))
    }

    /// Create the slot for a freshly normalized binding.
    pub(crate) fn create(&mut self, normalized: &str, kind: ValueKind) -> ParamIndex {
        let index = self.next_index();
        self.names.insert(SmolStr::new(normalized), index);
        self.slots.push(Slot {
            name: normalized.into(),
            kind,
            value: None,
            alarm: Alarm::NONE,
            dirty: false,
        });
        index
    }

    pub(crate) fn find(&self, normalized: &str) -> Option<ParamIndex> {
        self.names.get(normalized).copied()
    }

    pub(crate) fn name(&self, index: ParamIndex) -> Option<&str> {
        self.slot(index).map(|slot| slot.name.as_str())
    }

    /// Store a sample and mark the slot for the next interrupt sweep.
    pub(crate) fn set_sample(&mut self, index: ParamIndex, sample: Sample) {
        if let Some(slot) = self.slot_mut(index) {
            debug_assert_eq!(slot.kind, sample.kind());
            slot.value = Some(sample);
            slot.dirty = true;
        }
    }

    /// Masked digital update: only bits set in `mask` change. An empty slot
    /// starts from all-zero bits.
    pub(crate) fn set_digital(&mut self, index: ParamIndex, value: u32, mask: u32) {
        if let Some(slot) = self.slot_mut(index) {
            let current = match slot.value {
                Some(Sample::UInt32Digital(bits)) => bits,
                _ => 0,
            };
            slot.value = Some(Sample::UInt32Digital((current & !mask) | (value & mask)));
            slot.dirty = true;
        }
    }

    pub(crate) fn sample(&self, index: ParamIndex) -> Option<&Sample> {
        self.slot(index)?.value.as_ref()
    }

    pub(crate) fn set_alarm(&mut self, index: ParamIndex, alarm: Alarm) {
        if let Some(slot) = self.slot_mut(index) {
            slot.alarm = alarm;
        }
    }

    pub(crate) fn alarm(&self, index: ParamIndex) -> Option<Alarm> {
        self.slot(index).map(|slot| slot.alarm)
    }

    /// Indices dirtied since the last sweep, clearing their flags.
    pub(crate) fn take_dirty(&mut self) -> Vec<ParamIndex> {
        let mut pending = Vec::new();
        for (i, slot) in self.slots.iter_mut().enumerate() {
            if slot.dirty {
                slot.dirty = false;
                pending.push(ParamIndex(u32::try_from(i).unwrap_or(u32::MAX)));
            }
        }
        pending
    }

    fn slot(&self, index: ParamIndex) -> Option<&Slot> {
        self.slots.get(index.0 as usize)
    }

    fn slot_mut(&mut self, index: ParamIndex) -> Option<&mut Slot> {
        self.slots.get_mut(index.0 as usize)
    }
}
