use super::context::ExecutionContextView;
use super::frame::{FrameChain, NativeSnapshot, SyntheticFrame};
use crate::config::UnwinderConfig;
use crate::error::{Result, UnwindError};
use crate::host::{FrameId, PendingFrame, Register, Target, UnwindInfo};
use crate::value::CallRecord;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// The boundary frame has been produced; the next query is the VM's
    /// current logical frame.
    Boundary,
    /// Walking frames that only exist on the VM's managed stack.
    Interior,
    /// Handed back to native unwinding, or the chain ended early.
    Complete,
}

enum Caller {
    Native,
    Interpreted(CallRecord),
}

/// State of one unwind traversal of one thread through the interpreter.
#[derive(Debug)]
pub struct UnwindSession {
    state: SessionState,
    entry: NativeSnapshot,
    stack_base: u64,
    cursor: u64,
    chain: FrameChain,
    interior_frames: usize,
    max_interior_frames: usize,
}

impl UnwindSession {
    /// Enters the interpreter: `pending` is the dispatch loop's native frame.
    pub fn begin<T, P>(
        target: &T,
        pending: &P,
        config: &UnwinderConfig,
    ) -> Result<(Self, UnwindInfo)>
    where
        T: Target + ?Sized,
        P: PendingFrame + ?Sized,
    {
        let entry = NativeSnapshot::capture(pending)?;
        let context =
            ExecutionContextView::read(target, &config.context_symbol, &config.context_layout)?;
        let frame = SyntheticFrame::boundary(&context);

        let mut chain = FrameChain::new();
        chain.add_frame(context.stack_top, context.bp);

        debug!(
            thread = %pending.thread(),
            id = %frame.id,
            bp = format_args!("{:#x}", context.bp),
            base = format_args!("{:#x}", context.stack_base),
            "entered interpreter"
        );

        let session = Self {
            state: SessionState::Boundary,
            entry,
            stack_base: context.stack_base,
            cursor: context.bp,
            chain,
            interior_frames: 0,
            max_interior_frames: config.max_interior_frames,
        };
        Ok((session, frame.to_unwind_info(pending)))
    }

    /// Unwinds the next logical frame. `None` once the session has handed
    /// control back, so the host's default unwinder takes over.
    pub fn step<T, P>(&mut self, target: &T, pending: &P) -> Option<UnwindInfo>
    where
        T: Target + ?Sized,
        P: PendingFrame + ?Sized,
    {
        if self.state == SessionState::Complete {
            return None;
        }

        let (Ok(pc), Ok(sp)) = (
            pending.read_register(Register::Rip),
            pending.read_register(Register::Rsp),
        ) else {
            warn!(
                thread = %pending.thread(),
                "pending frame has no pc/sp, ending interpreter chain"
            );
            self.state = SessionState::Complete;
            return None;
        };
        let id = FrameId::with_special(sp, pc, self.cursor);

        let frame = match self.next_caller(target) {
            Ok(Caller::Native) => {
                debug!(id = %id, "reached the managed stack base, returning to native frames");
                self.state = SessionState::Complete;
                SyntheticFrame::returning_to(id, &self.entry)
            }
            Ok(Caller::Interpreted(record)) => {
                let frame = SyntheticFrame::interior(id, self.cursor, &record);
                debug!(
                    id = %id,
                    function = record.function,
                    call_type = record.call_type,
                    caller_ip = format_args!("{:#x}", record.caller_ip),
                    "interpreted frame"
                );
                self.chain.add_frame(frame.rsp, frame.rbp);
                self.cursor = record.caller_bp;
                self.interior_frames += 1;
                self.state = SessionState::Interior;
                frame
            }
            Err(err) => {
                warn!(
                    id = %id,
                    error = %err,
                    "truncating interpreter chain, returning to native frames"
                );
                self.state = SessionState::Complete;
                SyntheticFrame::returning_to(id, &self.entry)
            }
        };

        Some(frame.to_unwind_info(pending))
    }

    fn next_caller<T: Target + ?Sized>(&self, target: &T) -> Result<Caller> {
        if self.interior_frames >= self.max_interior_frames {
            return Err(UnwindError::CorruptFrameChain {
                cursor: self.cursor,
                caller: self.cursor,
            });
        }

        // no call record below the first frame on the managed stack
        if self.cursor == self.stack_base {
            return Ok(Caller::Native);
        }

        let record = CallRecord::read_below(target, self.cursor)?;
        if record.caller_bp == self.stack_base {
            return Ok(Caller::Native);
        }
        // the managed stack grows up, so callers sit strictly lower
        if record.caller_bp < self.stack_base || record.caller_bp >= self.cursor {
            return Err(UnwindError::CorruptFrameChain {
                cursor: self.cursor,
                caller: record.caller_bp,
            });
        }
        Ok(Caller::Interpreted(record))
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn entry(&self) -> &NativeSnapshot {
        &self.entry
    }

    pub fn stack_base(&self) -> u64 {
        self.stack_base
    }

    pub fn chain(&self) -> &FrameChain {
        &self.chain
    }
}
