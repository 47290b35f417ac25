#![allow(dead_code)]

use b9_unwind::host::{CodeBlock, HostError, Register, Target, ThreadId};
use b9_unwind::snapshot::{Snapshot, SnapshotFrame, SnapshotTarget};
use std::cell::Cell;
use std::collections::BTreeMap;

pub const NESTED_CALL: &str = include_str!("../../demos/nested_call.json");

pub const INTERPRET: u64 = 0x403000;
pub const INTERPRET_PC: u64 = 0x403123;
pub const NATIVE_SP: u64 = 0x7fffffffd000;
pub const NATIVE_FP: u64 = 0x7fffffffd040;

pub const STACK_BASE: u64 = 0x7ffed000;
pub const OUTER_BP: u64 = 0x7ffed040;
pub const INNER_BP: u64 = 0x7ffee000;
pub const INNER_TOP: u64 = 0x7ffee100;

pub fn nested_call_snapshot() -> Snapshot {
    serde_json::from_str(NESTED_CALL).expect("demo snapshot parses")
}

pub fn nested_call_target() -> SnapshotTarget {
    SnapshotTarget::new(nested_call_snapshot())
}

pub fn frame(thread: u64, rip: u64, rsp: u64, rbp: u64) -> SnapshotFrame {
    let mut registers = BTreeMap::new();
    registers.insert(Register::Rip, rip);
    registers.insert(Register::Rsp, rsp);
    registers.insert(Register::Rbp, rbp);
    SnapshotFrame::new(ThreadId(thread), registers)
}

pub fn registers(rip: u64, rsp: u64, rbp: u64) -> BTreeMap<Register, u64> {
    frame(0, rip, rsp, rbp).registers().clone()
}

/// Counts how often the symbol tables are consulted.
pub struct CountingTarget<'a> {
    pub inner: &'a SnapshotTarget,
    pub lookups: Cell<usize>,
    pub reads: Cell<usize>,
}

impl<'a> CountingTarget<'a> {
    pub fn new(inner: &'a SnapshotTarget) -> Self {
        Self {
            inner,
            lookups: Cell::new(0),
            reads: Cell::new(0),
        }
    }
}

impl Target for CountingTarget<'_> {
    fn lookup_global_symbol(&self, name: &str) -> Option<u64> {
        self.lookups.set(self.lookups.get() + 1);
        self.inner.lookup_global_symbol(name)
    }

    fn read_memory(&self, addr: u64, buf: &mut [u8]) -> Result<(), HostError> {
        self.reads.set(self.reads.get() + 1);
        self.inner.read_memory(addr, buf)
    }

    fn block_for_pc(&self, pc: u64) -> Option<CodeBlock> {
        self.inner.block_for_pc(pc)
    }

    fn is_block_valid(&self, block: &CodeBlock) -> bool {
        self.inner.is_block_valid(block)
    }
}
