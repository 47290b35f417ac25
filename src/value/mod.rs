//! Decoding of the VM's NaN-boxed stack slots.

mod decoder;
mod tag;

pub use decoder::{read_slot, read_tagged, CallRecord, Slot, SLOT_SIZE};
pub use tag::{Tag, PAYLOAD_MASK, TAG_MASK, TAG_SHIFT};
