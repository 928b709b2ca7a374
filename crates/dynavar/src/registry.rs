//! Live variable table: dense indices, address-equality dedup, snapshots.

use crate::variable::{DeviceAddress, ParamIndex, Variable, VariableInfo};

#[derive(Debug)]
pub(crate) struct VarTable {
    vars: Vec<Variable>,
}

impl VarTable {
    pub(crate) fn new() -> Self {
        Self { vars: Vec::new() }
    }

    pub(crate) fn next_index(&self) -> ParamIndex {
        ParamIndex(u32::try_from(self.vars.len()).unwrap_or(u32::MAX))
    }

    pub(crate) fn insert(&mut self, variable: Variable) {
        debug_assert_eq!(variable.index(), self.next_index());
        self.vars.push(variable);
    }

    pub(crate) fn get(&self, index: ParamIndex) -> Option<&Variable> {
        self.vars.get(index.0 as usize)
    }

    pub(crate) fn get_mut(&mut self, index: ParamIndex) -> Option<&mut Variable> {
        self.vars.get_mut(index.0 as usize)
    }

    /// Linear scan for a variable whose address matches. Variable counts
    /// stay in the hundreds, so no side index is kept.
    pub(crate) fn find_by_address(&self, address: &dyn DeviceAddress) -> Option<ParamIndex> {
        self.vars
            .iter()
            .find(|var| var.address().matches(address))
            .map(Variable::index)
    }

    pub(crate) fn snapshot(&self) -> Vec<VariableInfo> {
        self.vars.iter().map(VariableInfo::of).collect()
    }

    pub(crate) fn interrupt_snapshot(&self) -> Vec<VariableInfo> {
        self.vars
            .iter()
            .filter(|var| var.wants_interrupts())
            .map(VariableInfo::of)
            .collect()
    }
}
