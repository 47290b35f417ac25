use crate::host::{CodeBlock, Target};
use tracing::trace;

/// Finds, and remembers, the code block of the interpreter's dispatch loop.
#[derive(Debug)]
pub struct InterpreterRegion {
    symbol: String,
    block: Option<CodeBlock>,
}

impl InterpreterRegion {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            block: None,
        }
    }

    /// The dispatch loop's block, resolving it again if the cached one went
    /// stale. `None` while the symbol is not loaded; nothing negative is
    /// cached, so the next call retries.
    pub fn resolve<T: Target + ?Sized>(&mut self, target: &T) -> Option<&CodeBlock> {
        let stale = match &self.block {
            Some(block) => !target.is_block_valid(block),
            None => true,
        };

        if stale {
            self.block = None;
            let Some(addr) = target.lookup_global_symbol(&self.symbol) else {
                trace!(symbol = %self.symbol, "interpreter symbol not loaded yet");
                return None;
            };
            let block = target.block_for_pc(addr)?;
            trace!(
                symbol = %self.symbol,
                start = format_args!("{:#x}", block.start),
                end = format_args!("{:#x}", block.end),
                "resolved interpreter region"
            );
            self.block = Some(block);
        }

        self.block.as_ref()
    }

    pub fn contains<T: Target + ?Sized>(&mut self, target: &T, pc: u64) -> bool {
        self.resolve(target).is_some_and(|block| block.contains(pc))
    }

    pub fn cached(&self) -> Option<&CodeBlock> {
        self.block.as_ref()
    }
}
