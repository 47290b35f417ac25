use super::tag::{Tag, PAYLOAD_MASK};
use crate::error::{Result, UnwindError};
use crate::host::{HostError, Target};

pub const SLOT_SIZE: u64 = 8;

/// One raw word of the VM's managed value stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot(pub u64);

impl Slot {
    pub fn boxed(tag: Tag, payload: u64) -> Self {
        match tag.bits() {
            Some(bits) => Slot(bits | (payload & PAYLOAD_MASK)),
            None => Slot(payload),
        }
    }

    pub fn tag(self) -> Tag {
        Tag::from_bits(self.0)
    }

    pub fn payload(self) -> u64 {
        self.0 & PAYLOAD_MASK
    }

    /// The masked payload, if the slot carries `expected`; otherwise the tag
    /// actually found.
    pub fn expect(self, expected: Tag) -> std::result::Result<u64, Tag> {
        let found = self.tag();
        if found == expected && expected != Tag::Double {
            Ok(self.payload())
        } else {
            Err(found)
        }
    }

    pub fn as_ptr(self) -> Option<u64> {
        self.expect(Tag::Ptr).ok()
    }

    pub fn as_uint48(self) -> Option<u64> {
        self.expect(Tag::Uint48).ok()
    }

    pub fn as_int48(self) -> Option<i64> {
        // sign-extend from bit 47
        self.expect(Tag::Int48)
            .ok()
            .map(|payload| ((payload << 16) as i64) >> 16)
    }
}

pub fn read_slot<T: Target + ?Sized>(target: &T, addr: u64) -> Result<Slot> {
    Ok(Slot(target.read_u64(addr)?))
}

pub fn read_tagged<T: Target + ?Sized>(target: &T, addr: u64, expected: Tag) -> Result<u64> {
    read_slot(target, addr)?
        .expect(expected)
        .map_err(|found| UnwindError::TagMismatch {
            addr,
            expected,
            found,
        })
}

/// The four slots a caller pushes below the callee's frame pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallRecord {
    pub function: u64,
    pub caller_ip: u64,
    pub caller_bp: u64,
    pub call_type: u64,
}

impl CallRecord {
    pub const SLOTS: u64 = 4;

    /// Decodes `bp[-4..-1]`: function, caller ip, caller bp, call type.
    pub fn read_below<T: Target + ?Sized>(target: &T, bp: u64) -> Result<Self> {
        let slot = |index: u64| -> Result<u64> {
            bp.checked_sub(index * SLOT_SIZE).ok_or_else(|| {
                UnwindError::Host(HostError::UnmappedMemory {
                    addr: bp,
                    len: (index * SLOT_SIZE) as usize,
                })
            })
        };

        Ok(Self {
            call_type: read_tagged(target, slot(1)?, Tag::Uint48)?,
            caller_bp: read_tagged(target, slot(2)?, Tag::Ptr)?,
            caller_ip: read_tagged(target, slot(3)?, Tag::Ptr)?,
            function: read_tagged(target, slot(4)?, Tag::Uint48)?,
        })
    }

    /// The caller's stack top at the call: the lowest slot of the record.
    pub fn caller_sp(bp: u64) -> u64 {
        bp.wrapping_sub(Self::SLOTS * SLOT_SIZE)
    }
}
