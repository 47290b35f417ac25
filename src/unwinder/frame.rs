use super::context::ExecutionContextView;
use crate::host::{FrameId, HostError, PendingFrame, Register, UnwindInfo};
use crate::value::CallRecord;
use std::collections::BTreeMap;

/// Native registers of a real frame, kept so the walk can hand control back
/// to the native unwinder once the interpreted frames run out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeSnapshot {
    pub rip: u64,
    pub rsp: u64,
    pub rbp: u64,
}

impl NativeSnapshot {
    pub fn capture<P: PendingFrame + ?Sized>(pending: &P) -> Result<Self, HostError> {
        Ok(Self {
            rip: pending.read_register(Register::Rip)?,
            rsp: pending.read_register(Register::Rsp)?,
            rbp: pending.read_register(Register::Rbp)?,
        })
    }
}

/// A frame the unwinder made up: its identity plus the caller registers the
/// host continues with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyntheticFrame {
    pub id: FrameId,
    pub rip: u64,
    pub rsp: u64,
    pub rbp: u64,
}

impl SyntheticFrame {
    /// Bridges the dispatch loop's native frame to the VM's current logical
    /// frame.
    pub fn boundary(context: &ExecutionContextView) -> Self {
        Self {
            id: FrameId::new(context.stack_top, context.ip),
            rip: context.ip,
            rsp: context.stack_top,
            rbp: context.bp,
        }
    }

    /// A logical frame whose caller is another logical frame.
    pub fn interior(id: FrameId, cursor: u64, record: &CallRecord) -> Self {
        Self {
            id,
            rip: record.caller_ip,
            rsp: CallRecord::caller_sp(cursor),
            rbp: record.caller_bp,
        }
    }

    /// The outermost logical frame; its caller is the native frame captured
    /// at entry.
    pub fn returning_to(id: FrameId, native: &NativeSnapshot) -> Self {
        Self {
            id,
            rip: native.rip,
            rsp: native.rsp,
            rbp: native.rbp,
        }
    }

    pub fn to_unwind_info<P: PendingFrame + ?Sized>(&self, pending: &P) -> UnwindInfo {
        let mut info = pending.create_unwind_info(self.id);
        info.add_saved_register(Register::Rip, self.rip);
        info.add_saved_register(Register::Rsp, self.rsp);
        info.add_saved_register(Register::Rbp, self.rbp);
        info
    }
}

/// Stack pointer to frame pointer, one entry per synthesized frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameChain {
    frames: BTreeMap<u64, u64>,
}

impl FrameChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_frame(&mut self, sp: u64, bp: u64) {
        self.frames.insert(sp, bp);
    }

    pub fn contains(&self, sp: u64) -> bool {
        self.frames.contains_key(&sp)
    }

    pub fn frame_pointer(&self, sp: u64) -> Option<u64> {
        self.frames.get(&sp).copied()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u64, u64)> + '_ {
        self.frames.iter().map(|(sp, bp)| (*sp, *bp))
    }
}
