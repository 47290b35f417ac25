use std::fmt;

pub const TAG_SHIFT: u32 = 48;
pub const TAG_MASK: u64 = 0xffff_0000_0000_0000;
pub const PAYLOAD_MASK: u64 = !TAG_MASK;

/// Smallest boxed tag; everything below it is an unboxed double.
const FIRST_BOX_TAG: u16 = 0xfff9;

const UINT48_TAG: u16 = 0xfff9;
const PTR_TAG: u16 = 0xfffa;
const INT48_TAG: u16 = 0xfffb;
const REF_TAG: u16 = 0xfffc;

/// Type tag of a NaN-boxed VM stack slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    Double,
    Uint48,
    Ptr,
    Int48,
    Ref,
    Unknown(u16),
}

impl Tag {
    pub fn from_bits(bits: u64) -> Self {
        let tag = (bits >> TAG_SHIFT) as u16;
        if tag < FIRST_BOX_TAG {
            return Tag::Double;
        }
        match tag {
            UINT48_TAG => Tag::Uint48,
            PTR_TAG => Tag::Ptr,
            INT48_TAG => Tag::Int48,
            REF_TAG => Tag::Ref,
            other => Tag::Unknown(other),
        }
    }

    /// The tag bits as they sit in a boxed slot; `None` for doubles.
    pub fn bits(self) -> Option<u64> {
        let tag = match self {
            Tag::Double => return None,
            Tag::Uint48 => UINT48_TAG,
            Tag::Ptr => PTR_TAG,
            Tag::Int48 => INT48_TAG,
            Tag::Ref => REF_TAG,
            Tag::Unknown(tag) => tag,
        };
        Some(u64::from(tag) << TAG_SHIFT)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tag::Double => f.write_str("double"),
            Tag::Uint48 => f.write_str("AS_UINT48"),
            Tag::Ptr => f.write_str("AS_PTR"),
            Tag::Int48 => f.write_str("AS_INT48"),
            Tag::Ref => f.write_str("AS_REF"),
            Tag::Unknown(tag) => write!(f, "unknown({:#06x})", tag),
        }
    }
}
