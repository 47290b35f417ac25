use crate::host::ThreadId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A 64-bit address or word. Accepts a JSON number or a `"0x..."` string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawAddress", into = "String")]
pub struct Address(pub u64);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawAddress {
    Number(u64),
    Text(String),
}

impl TryFrom<RawAddress> for Address {
    type Error = String;

    fn try_from(raw: RawAddress) -> Result<Self, Self::Error> {
        match raw {
            RawAddress::Number(value) => Ok(Address(value)),
            RawAddress::Text(text) => {
                let trimmed = text.trim();
                let parsed = match trimmed
                    .strip_prefix("0x")
                    .or_else(|| trimmed.strip_prefix("0X"))
                {
                    Some(hex) => u64::from_str_radix(&hex.replace('_', ""), 16),
                    None => trimmed.replace('_', "").parse::<u64>(),
                };
                parsed
                    .map(Address)
                    .map_err(|_| format!("invalid address '{}'", text))
            }
        }
    }
}

impl From<Address> for String {
    fn from(addr: Address) -> Self {
        format!("{:#x}", addr.0)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// A recorded debuggee: its symbols, static data and a sequence of halts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Snapshot {
    #[serde(default)]
    pub symbols: Vec<SymbolDef>,
    /// Memory that stays the same across stops (globals).
    #[serde(default)]
    pub memory: Vec<MemoryRegion>,
    pub stops: Vec<Stop>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SymbolDef {
    pub name: String,
    pub address: Address,
    /// Functions have a size; their code forms one lexical block.
    #[serde(default)]
    pub size: u64,
}

/// The debuggee halted: thread registers and the memory that changed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Stop {
    pub threads: Vec<ThreadState>,
    #[serde(default)]
    pub memory: Vec<MemoryRegion>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ThreadState {
    pub id: ThreadId,
    pub rip: Address,
    pub rsp: Address,
    pub rbp: Address,
}

/// Little-endian 64-bit words starting at `address`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MemoryRegion {
    pub address: Address,
    pub words: Vec<Address>,
}
