//! The narrow capability interface the unwinder needs from a host debugger.
//!
//! Nothing in the engine touches host-specific object shapes; an adapter
//! implements [`Target`] over the halted debuggee and [`PendingFrame`] over
//! the frame the host is currently unwinding.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Native registers of the one supported ABI (x86-64 System V).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Register {
    Rip,
    Rsp,
    Rbp,
}

impl Register {
    pub fn name(self) -> &'static str {
        match self {
            Register::Rip => "rip",
            Register::Rsp => "rsp",
            Register::Rbp => "rbp",
        }
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Identifies a debuggee thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ThreadId(pub u64);

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    #[error("cannot access memory at {addr:#x} ({len} bytes)")]
    UnmappedMemory { addr: u64, len: usize },

    #[error("register {0} is not available in this frame")]
    UnknownRegister(Register),

    #[error("target is running")]
    TargetRunning,
}

/// A lexical code block as reported by the host's symbol tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    pub start: u64,
    pub end: u64,
    /// Layout generation the block was resolved under; the host bumps it
    /// whenever code is unloaded or reloaded.
    pub generation: u64,
}

impl CodeBlock {
    /// Inclusive on both ends, like the host's block bounds.
    pub fn contains(&self, pc: u64) -> bool {
        pc >= self.start && pc <= self.end
    }
}

/// The halted debuggee's symbol and memory interface.
pub trait Target {
    /// Address of a named global symbol, or `None` if it is not (yet) loaded.
    fn lookup_global_symbol(&self, name: &str) -> Option<u64>;

    fn read_memory(&self, addr: u64, buf: &mut [u8]) -> Result<(), HostError>;

    /// The lexical code block containing `pc`.
    fn block_for_pc(&self, pc: u64) -> Option<CodeBlock>;

    fn is_block_valid(&self, block: &CodeBlock) -> bool;

    fn read_u64(&self, addr: u64) -> Result<u64, HostError> {
        let mut buf = [0u8; 8];
        self.read_memory(addr, &mut buf)?;
        Ok(u64::from_le_bytes(buf))
    }
}

/// Unique enough for the host to tell adjacent frames apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId {
    pub sp: u64,
    pub pc: u64,
    pub special: Option<u64>,
}

impl FrameId {
    pub fn new(sp: u64, pc: u64) -> Self {
        Self {
            sp,
            pc,
            special: None,
        }
    }

    pub fn with_special(sp: u64, pc: u64, special: u64) -> Self {
        Self {
            sp,
            pc,
            special: Some(special),
        }
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.special {
            Some(special) => write!(
                f,
                "{{sp={:#x}, pc={:#x}, special={:#x}}}",
                self.sp, self.pc, special
            ),
            None => write!(f, "{{sp={:#x}, pc={:#x}}}", self.sp, self.pc),
        }
    }
}

/// What the unwinder hands back for one frame: who the frame is, and the
/// caller's registers as saved by it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnwindInfo {
    pub id: FrameId,
    pub saved: BTreeMap<Register, u64>,
}

impl UnwindInfo {
    pub fn new(id: FrameId) -> Self {
        Self {
            id,
            saved: BTreeMap::new(),
        }
    }

    pub fn add_saved_register(&mut self, reg: Register, value: u64) {
        self.saved.insert(reg, value);
    }

    pub fn saved_register(&self, reg: Register) -> Option<u64> {
        self.saved.get(&reg).copied()
    }

    /// A frame with no saved return address has no caller.
    pub fn is_outermost(&self) -> bool {
        !self.saved.contains_key(&Register::Rip)
    }
}

/// The frame the host is about to unwind.
pub trait PendingFrame {
    fn thread(&self) -> ThreadId;

    fn read_register(&self, reg: Register) -> Result<u64, HostError>;

    fn create_unwind_info(&self, id: FrameId) -> UnwindInfo {
        UnwindInfo::new(id)
    }
}

/// A resolved frame as the host renders it in a backtrace.
pub trait FrameDecorator {
    fn level(&self) -> usize;

    fn pc(&self) -> u64;

    fn sp(&self) -> u64;

    fn function(&self) -> Option<String>;

    fn describe(&self) -> String {
        format!(
            "#{:<3} {:#018x} in {} (sp={:#x})",
            self.level(),
            self.pc(),
            self.function().unwrap_or_else(|| "??".to_string()),
            self.sp()
        )
    }
}
