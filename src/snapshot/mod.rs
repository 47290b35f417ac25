//! A host adapter that replays a recorded, halted debuggee from JSON.

mod backtrace;
mod model;
mod target;

pub use backtrace::{backtrace, BacktraceFrame, MAX_FRAMES};
pub use model::{Address, MemoryRegion, Snapshot, Stop, SymbolDef, ThreadState};
pub use target::{SnapshotFrame, SnapshotTarget};
