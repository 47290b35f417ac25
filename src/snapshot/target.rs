use super::model::{MemoryRegion, Snapshot, Stop, SymbolDef, ThreadState};
use crate::host::{CodeBlock, HostError, PendingFrame, Register, Target, ThreadId};
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug, Clone)]
struct Region {
    start: u64,
    bytes: Vec<u8>,
}

impl Region {
    fn from_words(region: &MemoryRegion) -> Self {
        let bytes = region
            .words
            .iter()
            .flat_map(|word| word.0.to_le_bytes())
            .collect();
        Self {
            start: region.address.0,
            bytes,
        }
    }

    fn read(&self, addr: u64, buf: &mut [u8]) -> bool {
        let Some(offset) = addr.checked_sub(self.start) else {
            return false;
        };
        let Ok(offset) = usize::try_from(offset) else {
            return false;
        };
        match offset.checked_add(buf.len()) {
            Some(end) if end <= self.bytes.len() => {
                buf.copy_from_slice(&self.bytes[offset..end]);
                true
            }
            _ => false,
        }
    }
}

/// A halted debuggee replayed from a [`Snapshot`].
#[derive(Debug)]
pub struct SnapshotTarget {
    symbols: Vec<SymbolDef>,
    statics: Vec<Region>,
    stops: Vec<(Vec<ThreadState>, Vec<Region>)>,
    current: Option<usize>,
    generation: u64,
}

impl SnapshotTarget {
    pub fn new(snapshot: Snapshot) -> Self {
        let statics = snapshot.memory.iter().map(Region::from_words).collect();
        let stops: Vec<(Vec<ThreadState>, Vec<Region>)> = snapshot
            .stops
            .into_iter()
            .map(|Stop { threads, memory }| {
                (threads, memory.iter().map(Region::from_words).collect())
            })
            .collect();
        let current = if stops.is_empty() { None } else { Some(0) };

        Self {
            symbols: snapshot.symbols,
            statics,
            stops,
            current,
            generation: 0,
        }
    }

    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        Ok(Self::new(serde_json::from_str(text)?))
    }

    /// Index of the stop the debuggee is halted at, `None` once it exited.
    pub fn current_stop(&self) -> Option<usize> {
        self.current
    }

    pub fn stop_count(&self) -> usize {
        self.stops.len()
    }

    /// Lets the debuggee run to its next stop. Returns whether it halted
    /// again.
    pub fn resume(&mut self) -> bool {
        self.current = match self.current {
            Some(index) if index + 1 < self.stops.len() => Some(index + 1),
            _ => None,
        };
        debug!(stop = ?self.current, "target resumed");
        self.current.is_some()
    }

    /// Simulates code being unloaded and loaded again: every block handed out
    /// so far becomes invalid.
    pub fn reload(&mut self) {
        self.generation += 1;
        debug!(generation = self.generation, "code layout reloaded");
    }

    /// Reload with a different set of symbols, e.g. a module loaded at a new
    /// base address or not loaded at all.
    pub fn reload_with(&mut self, symbols: Vec<SymbolDef>) {
        self.symbols = symbols;
        self.reload();
    }

    pub fn threads(&self) -> &[ThreadState] {
        match self.current {
            Some(index) => &self.stops[index].0,
            None => &[],
        }
    }

    pub fn thread(&self, id: ThreadId) -> Option<&ThreadState> {
        self.threads().iter().find(|thread| thread.id == id)
    }

    /// The register state a backtrace of `id` starts from.
    pub fn innermost_frame(&self, id: ThreadId) -> Option<SnapshotFrame> {
        self.thread(id).map(|state| {
            let mut registers = BTreeMap::new();
            registers.insert(Register::Rip, state.rip.0);
            registers.insert(Register::Rsp, state.rsp.0);
            registers.insert(Register::Rbp, state.rbp.0);
            SnapshotFrame::new(id, registers)
        })
    }

    /// Name of the function whose code contains `pc`.
    pub fn function_for_pc(&self, pc: u64) -> Option<&str> {
        self.function_symbol(pc).map(|symbol| symbol.name.as_str())
    }

    fn function_symbol(&self, pc: u64) -> Option<&SymbolDef> {
        self.symbols.iter().find(|symbol| {
            symbol.size > 0 && pc >= symbol.address.0 && pc - symbol.address.0 < symbol.size
        })
    }
}

impl Target for SnapshotTarget {
    fn lookup_global_symbol(&self, name: &str) -> Option<u64> {
        self.symbols
            .iter()
            .find(|symbol| symbol.name == name)
            .map(|symbol| symbol.address.0)
    }

    fn read_memory(&self, addr: u64, buf: &mut [u8]) -> Result<(), HostError> {
        let Some(index) = self.current else {
            return Err(HostError::TargetRunning);
        };
        let found = self.stops[index]
            .1
            .iter()
            .chain(self.statics.iter())
            .any(|region| region.read(addr, buf));
        if found {
            Ok(())
        } else {
            Err(HostError::UnmappedMemory {
                addr,
                len: buf.len(),
            })
        }
    }

    fn block_for_pc(&self, pc: u64) -> Option<CodeBlock> {
        self.function_symbol(pc).map(|symbol| CodeBlock {
            start: symbol.address.0,
            end: symbol.address.0 + symbol.size - 1,
            generation: self.generation,
        })
    }

    fn is_block_valid(&self, block: &CodeBlock) -> bool {
        block.generation == self.generation
    }
}

/// One frame's registers as the snapshot host knows them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotFrame {
    thread: ThreadId,
    registers: BTreeMap<Register, u64>,
}

impl SnapshotFrame {
    pub fn new(thread: ThreadId, registers: BTreeMap<Register, u64>) -> Self {
        Self { thread, registers }
    }

    pub fn registers(&self) -> &BTreeMap<Register, u64> {
        &self.registers
    }

    pub fn register(&self, reg: Register) -> Option<u64> {
        self.registers.get(&reg).copied()
    }
}

impl PendingFrame for SnapshotFrame {
    fn thread(&self) -> ThreadId {
        self.thread
    }

    fn read_register(&self, reg: Register) -> Result<u64, HostError> {
        self.register(reg).ok_or(HostError::UnknownRegister(reg))
    }
}
