use super::target::{SnapshotFrame, SnapshotTarget};
use crate::host::{FrameDecorator, FrameId, Register, Target, ThreadId};
use crate::unwinder::InterpUnwinder;
use std::collections::BTreeMap;
use tracing::trace;

pub const MAX_FRAMES: usize = 256;

/// One frame of a resolved backtrace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BacktraceFrame {
    pub level: usize,
    pub pc: u64,
    pub sp: u64,
    pub fp: Option<u64>,
    pub id: FrameId,
    pub function: Option<String>,
}

impl FrameDecorator for BacktraceFrame {
    fn level(&self) -> usize {
        self.level
    }

    fn pc(&self) -> u64 {
        self.pc
    }

    fn sp(&self) -> u64 {
        self.sp
    }

    fn function(&self) -> Option<String> {
        self.function.clone()
    }
}

/// Walks `thread`'s stack: the interpreter unwinder gets the first say on
/// every frame, frame-pointer unwinding covers the rest. `None` if the
/// thread does not exist at the current stop.
pub fn backtrace(
    target: &SnapshotTarget,
    unwinder: &mut InterpUnwinder,
    thread: ThreadId,
) -> Option<Vec<BacktraceFrame>> {
    let mut pending = target.innermost_frame(thread)?;
    let mut frames = Vec::new();

    for level in 0..MAX_FRAMES {
        let (Some(pc), Some(sp)) = (
            pending.register(Register::Rip),
            pending.register(Register::Rsp),
        ) else {
            break;
        };
        if pc == 0 {
            break;
        }

        let (id, caller) = match unwinder.unwind(target, &pending) {
            Some(info) => {
                let caller = if info.is_outermost() {
                    None
                } else {
                    Some(info.saved.clone())
                };
                (info.id, caller)
            }
            None => (FrameId::new(sp, pc), frame_pointer_caller(target, &pending)),
        };

        frames.push(BacktraceFrame {
            level,
            pc,
            sp,
            fp: pending.register(Register::Rbp),
            id,
            function: target.function_for_pc(pc).map(str::to_string),
        });

        match caller {
            Some(registers) => pending = SnapshotFrame::new(thread, registers),
            None => break,
        }
    }

    Some(frames)
}

/// Standard `rbp` chain: the saved frame pointer at `[rbp]`, the return
/// address above it.
fn frame_pointer_caller(
    target: &SnapshotTarget,
    frame: &SnapshotFrame,
) -> Option<BTreeMap<Register, u64>> {
    let sp = frame.register(Register::Rsp)?;
    let fp = frame.register(Register::Rbp)?;
    if fp == 0 {
        return None;
    }

    let caller_fp = target.read_u64(fp).ok()?;
    let caller_pc = target.read_u64(fp.checked_add(8)?).ok()?;
    let caller_sp = fp.checked_add(16)?;
    if caller_sp <= sp {
        trace!(
            sp = format_args!("{:#x}", sp),
            fp = format_args!("{:#x}", fp),
            "frame pointer chain goes backwards"
        );
        return None;
    }

    let mut registers = BTreeMap::new();
    registers.insert(Register::Rip, caller_pc);
    registers.insert(Register::Rsp, caller_sp);
    registers.insert(Register::Rbp, caller_fp);
    Some(registers)
}
