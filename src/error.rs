use crate::host::HostError;
use crate::value::Tag;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UnwindError {
    #[error(transparent)]
    Host(#[from] HostError),

    #[error("tagged slot at {addr:#x}: expected {expected:?}, found {found:?}")]
    TagMismatch { addr: u64, expected: Tag, found: Tag },

    #[error("symbol '{0}' not found")]
    SymbolNotFound(String),

    #[error("corrupt frame chain: caller {caller:#x} is not below {cursor:#x}")]
    CorruptFrameChain { cursor: u64, caller: u64 },
}

pub type Result<T> = std::result::Result<T, UnwindError>;
