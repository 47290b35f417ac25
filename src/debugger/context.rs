use crate::decorate::{Decorated, InterpFrameFilter};
use crate::host::ThreadId;
use crate::snapshot::{self, BacktraceFrame, SnapshotTarget};
use crate::unwinder::{FrameChain, InterpUnwinder};
use std::collections::HashMap;

/// Debugger-side state for one snapshot: the unwinder registry, the frame
/// filter and a per-thread cache of resolved frames.
pub struct DebugContext {
    target: SnapshotTarget,
    unwinder: InterpUnwinder,
    filter: InterpFrameFilter,
    current_thread: Option<ThreadId>,
    frame_cache: HashMap<ThreadId, Vec<BacktraceFrame>>,
}

impl DebugContext {
    pub fn new(target: SnapshotTarget, unwinder: InterpUnwinder) -> Self {
        let filter = InterpFrameFilter::new(unwinder.config().frame_label.clone());
        let mut ctx = Self {
            target,
            unwinder,
            filter,
            current_thread: None,
            frame_cache: HashMap::new(),
        };
        ctx.select_first_thread();
        ctx
    }

    pub fn target(&self) -> &SnapshotTarget {
        &self.target
    }

    pub fn unwinder(&self) -> &InterpUnwinder {
        &self.unwinder
    }

    pub fn current_thread(&self) -> Option<ThreadId> {
        self.current_thread
    }

    pub fn is_running(&self) -> bool {
        self.target.current_stop().is_none()
    }

    pub fn select_thread(&mut self, thread: ThreadId) -> bool {
        if self.target.thread(thread).is_some() {
            self.current_thread = Some(thread);
            true
        } else {
            false
        }
    }

    fn select_first_thread(&mut self) {
        self.current_thread = self.target.threads().first().map(|state| state.id);
    }

    /// Resolved frames of `thread`, unwound at most once per stop.
    pub fn backtrace(&mut self, thread: ThreadId) -> Option<&[BacktraceFrame]> {
        if !self.frame_cache.contains_key(&thread) {
            let frames = snapshot::backtrace(&self.target, &mut self.unwinder, thread)?;
            self.frame_cache.insert(thread, frames);
        }
        self.frame_cache.get(&thread).map(Vec::as_slice)
    }

    pub fn decorated_backtrace(
        &mut self,
        thread: ThreadId,
    ) -> Option<Vec<Decorated<BacktraceFrame>>> {
        let frames = self.backtrace(thread)?.to_vec();
        let chain = self.unwinder.frame_chain(thread);
        Some(self.filter.filter(frames, chain).collect())
    }

    pub fn frame_chain(&self, thread: ThreadId) -> Option<&FrameChain> {
        self.unwinder.frame_chain(thread)
    }

    /// Runs the target to its next stop. Sessions and cached frames describe
    /// the old stop and are dropped first. Returns whether the target halted
    /// again.
    pub fn resume(&mut self) -> bool {
        self.unwinder.on_target_resumed();
        self.frame_cache.clear();
        let halted = self.target.resume();
        let keep = self
            .current_thread
            .filter(|thread| self.target.thread(*thread).is_some());
        match keep {
            Some(thread) => self.current_thread = Some(thread),
            None => self.select_first_thread(),
        }
        halted
    }

    pub fn reload(&mut self) {
        self.target.reload();
    }
}
