use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file")]
    Io(#[from] std::io::Error),

    #[error("invalid config")]
    Json(#[from] serde_json::Error),
}

/// Byte offsets of the fields the unwinder reads from `b9::ExecutionContext`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContextLayout {
    pub ip: u64,
    pub bp: u64,
    pub stack_base: u64,
    pub stack_top: u64,
}

impl Default for ContextLayout {
    fn default() -> Self {
        Self {
            ip: 0x00,
            bp: 0x08,
            stack_base: 0x10,
            stack_top: 0x18,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UnwinderConfig {
    /// Entry point of the bytecode dispatch loop.
    pub interpreter_symbol: String,
    /// Global holding a pointer to the current execution context.
    pub context_symbol: String,
    pub context_layout: ContextLayout,
    pub frame_label: String,
    pub max_interior_frames: usize,
}

impl Default for UnwinderConfig {
    fn default() -> Self {
        Self {
            interpreter_symbol: "b9::ExecutionContext::interpret".to_string(),
            context_symbol: "b9::currentExecutionContext".to_string(),
            context_layout: ContextLayout::default(),
            frame_label: "B9 interpreted function".to_string(),
            max_interior_frames: 4096,
        }
    }
}

impl UnwinderConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }
}
