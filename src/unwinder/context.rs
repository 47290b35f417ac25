use crate::config::ContextLayout;
use crate::error::{Result, UnwindError};
use crate::host::Target;

/// The fields of the VM's current execution context the unwinder needs,
/// read once at interpreter entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionContextView {
    pub ip: u64,
    pub bp: u64,
    pub stack_base: u64,
    pub stack_top: u64,
}

impl ExecutionContextView {
    /// `symbol` names a global holding a pointer to the context.
    pub fn read<T: Target + ?Sized>(
        target: &T,
        symbol: &str,
        layout: &ContextLayout,
    ) -> Result<Self> {
        let global = target
            .lookup_global_symbol(symbol)
            .ok_or_else(|| UnwindError::SymbolNotFound(symbol.to_string()))?;
        let context = target.read_u64(global)?;

        Ok(Self {
            ip: target.read_u64(context.wrapping_add(layout.ip))?,
            bp: target.read_u64(context.wrapping_add(layout.bp))?,
            stack_base: target.read_u64(context.wrapping_add(layout.stack_base))?,
            stack_top: target.read_u64(context.wrapping_add(layout.stack_top))?,
        })
    }
}
