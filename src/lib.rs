//! Backtraces through the B9 interpreter for a native debugger.
//!
//! [`unwinder::InterpUnwinder`] recognizes the bytecode dispatch loop and
//! rebuilds the VM's logical call chain from its tagged value stack, frame by
//! frame, for a host that speaks the [`host`] traits. [`decorate`] labels the
//! resulting frames for display. [`snapshot`] and [`debugger`] provide a
//! replay host and a small shell on top of it.

pub mod config;
pub mod debugger;
pub mod decorate;
pub mod error;
pub mod host;
pub mod snapshot;
pub mod unwinder;
pub mod value;

pub use config::UnwinderConfig;
pub use error::{Result, UnwindError};
pub use unwinder::InterpUnwinder;
