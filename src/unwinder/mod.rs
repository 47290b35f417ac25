//! Unwinding through the B9 interpreter's dispatch loop.
//!
//! The host calls [`InterpUnwinder::unwind`] once per frame. Frames outside
//! the interpreter are left to the host (`None`). The first frame whose pc
//! lies in the dispatch loop starts an [`UnwindSession`] for its thread; the
//! session then synthesizes the logical frames found on the VM's managed
//! stack until it reaches the stack base and hands control back to native
//! unwinding.

mod context;
mod frame;
mod region;
mod session;

pub use context::ExecutionContextView;
pub use frame::{FrameChain, NativeSnapshot, SyntheticFrame};
pub use region::InterpreterRegion;
pub use session::{SessionState, UnwindSession};

use crate::config::UnwinderConfig;
use crate::host::{PendingFrame, Register, Target, ThreadId, UnwindInfo};
use std::collections::HashMap;
use tracing::{info, warn};

/// Owns the interpreter region cache and one session per unwound thread.
#[derive(Debug)]
pub struct InterpUnwinder {
    config: UnwinderConfig,
    region: InterpreterRegion,
    sessions: HashMap<ThreadId, UnwindSession>,
}

impl InterpUnwinder {
    pub fn new(config: UnwinderConfig) -> Self {
        Self {
            region: InterpreterRegion::new(config.interpreter_symbol.clone()),
            config,
            sessions: HashMap::new(),
        }
    }

    pub fn config(&self) -> &UnwinderConfig {
        &self.config
    }

    pub fn unwind<T, P>(&mut self, target: &T, pending: &P) -> Option<UnwindInfo>
    where
        T: Target + ?Sized,
        P: PendingFrame + ?Sized,
    {
        let thread = pending.thread();
        if let Some(session) = self.sessions.get_mut(&thread) {
            return session.step(target, pending);
        }

        let pc = pending.read_register(Register::Rip).ok()?;
        if !self.is_interpreter_address(target, pc) {
            return None;
        }

        match UnwindSession::begin(target, pending, &self.config) {
            Ok((session, info)) => {
                self.sessions.insert(thread, session);
                Some(info)
            }
            Err(err) => {
                warn!(thread = %thread, error = %err, "cannot unwind interpreter frame");
                None
            }
        }
    }

    /// Whether `pc` lies in the dispatch loop as the target is laid out now.
    pub fn is_interpreter_address<T: Target + ?Sized>(&mut self, target: &T, pc: u64) -> bool {
        self.region.contains(target, pc)
    }

    pub fn session(&self, thread: ThreadId) -> Option<&UnwindSession> {
        self.sessions.get(&thread)
    }

    pub fn frame_chain(&self, thread: ThreadId) -> Option<&FrameChain> {
        self.sessions.get(&thread).map(UnwindSession::chain)
    }

    /// Every session describes one halted snapshot; once the debuggee runs,
    /// all of them are stale.
    pub fn on_target_resumed(&mut self) {
        if !self.sessions.is_empty() {
            info!(sessions = self.sessions.len(), "target resumed, dropping unwind sessions");
        }
        self.sessions.clear();
    }
}

impl Default for InterpUnwinder {
    fn default() -> Self {
        Self::new(UnwinderConfig::default())
    }
}
