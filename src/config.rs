//! Machine configuration.
//!
//! Read from a JSON document; every field is optional and falls back to the
//! standard machine (256 bytes of memory, eight general-purpose registers).

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cpu::registers::STANDARD_GENERAL_PURPOSE;
use crate::cpu::{Cpu, Memory, MemoryError, RegisterLayout};

/// Largest memory the 16-bit instruction pointer can address.
pub const MAX_MEMORY_SIZE: usize = 0x1_0000;

/// Keeps every register index within a one-byte operand.
pub const MAX_GENERAL_PURPOSE: usize = 254;

/// Machine shape and harness limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MachineConfig {
    /// Program memory size in bytes.
    pub memory_size: usize,
    /// Number of `rN` registers after `ip` and `acc`.
    pub general_purpose_registers: usize,
    /// Step limit used when running a program to completion.
    pub max_steps: u64,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            memory_size: 256,
            general_purpose_registers: STANDARD_GENERAL_PURPOSE,
            max_steps: 10_000,
        }
    }
}

impl MachineConfig {
    /// Parse and validate a JSON configuration.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        let config = Self::from_json_str(&json)?;
        log::info!("loaded config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_MEMORY_SIZE).contains(&self.memory_size) {
            return Err(ConfigError::Invalid(format!(
                "memory_size {} must be between 1 and {}",
                self.memory_size, MAX_MEMORY_SIZE
            )));
        }

        // r1 and r2 are hardwired into the MOV_LIT opcodes; indices are one byte
        if !(2..=MAX_GENERAL_PURPOSE).contains(&self.general_purpose_registers) {
            return Err(ConfigError::Invalid(format!(
                "general_purpose_registers {} must be between 2 and {}",
                self.general_purpose_registers, MAX_GENERAL_PURPOSE
            )));
        }

        Ok(())
    }

    /// The register layout described by this config.
    ///
    /// The standard shape reuses the process-wide table.
    pub fn layout(&self) -> Arc<RegisterLayout> {
        if self.general_purpose_registers == STANDARD_GENERAL_PURPOSE {
            RegisterLayout::standard()
        } else {
            Arc::new(RegisterLayout::new(self.general_purpose_registers))
        }
    }

    /// A zeroed program memory of the configured size.
    pub fn memory(&self) -> Memory {
        Memory::new(self.memory_size)
    }

    /// Build a CPU over `program` loaded at address 0.
    pub fn build(&self, program: &[u8]) -> Result<Cpu, ConfigError> {
        self.validate()?;
        let mut mem = self.memory();
        mem.load_program(0, program)?;
        log::debug!(
            "machine: {} bytes memory, {} registers, {} byte program",
            self.memory_size,
            self.general_purpose_registers + 2,
            program.len()
        );
        Ok(Cpu::with_layout(mem, self.layout()))
    }
}

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("program does not fit: {0}")]
    Program(#[from] MemoryError),
}
