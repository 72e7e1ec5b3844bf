//! The register file.
//!
//! Registers are 16-bit cells stored in their own [`Memory`], two bytes per
//! register. The layout is fixed: the instruction pointer, the accumulator,
//! then `r1..rN` general-purpose registers. Names resolve to byte offsets
//! through a [`RegisterLayout`] table built once and shared by reference.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use serde::Serialize;
use thiserror::Error;

use crate::cpu::memory::{Memory, MemoryError};

/// Instruction pointer.
pub const IP: &str = "ip";
/// Accumulator.
pub const ACC: &str = "acc";
/// First general-purpose register.
pub const R1: &str = "r1";
/// Second general-purpose register.
pub const R2: &str = "r2";

/// Bytes occupied by every register.
pub const REGISTER_WIDTH: usize = 2;

/// General-purpose register count of the standard machine.
pub const STANDARD_GENERAL_PURPOSE: usize = 8;

/// Immutable register name table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterLayout {
    names: Vec<String>,
    offsets: HashMap<String, usize>,
}

impl RegisterLayout {
    /// Build the layout `ip, acc, r1..r{general_purpose}`.
    pub fn new(general_purpose: usize) -> Self {
        let names: Vec<String> = [IP.to_string(), ACC.to_string()]
            .into_iter()
            .chain((1..=general_purpose).map(|n| format!("r{}", n)))
            .collect();

        let offsets = names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i * REGISTER_WIDTH))
            .collect();

        Self { names, offsets }
    }

    /// The standard ten-register layout, shared process-wide.
    pub fn standard() -> Arc<Self> {
        static STANDARD: OnceLock<Arc<RegisterLayout>> = OnceLock::new();
        STANDARD
            .get_or_init(|| Arc::new(Self::new(STANDARD_GENERAL_PURPOSE)))
            .clone()
    }

    /// Register names in declaration order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Number of registers.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Byte offset of `name` in the backing memory.
    pub fn offset(&self, name: &str) -> Option<usize> {
        self.offsets.get(name).copied()
    }

    /// Declaration index of `name`, as used in register operands.
    pub fn index_of(&self, name: &str) -> Option<u8> {
        self.offset(name)
            .and_then(|offset| u8::try_from(offset / REGISTER_WIDTH).ok())
    }

    /// Bytes needed to back every register.
    pub fn backing_size(&self) -> usize {
        self.len() * REGISTER_WIDTH
    }
}

/// A register name and its value, as reported by [`Registers::snapshot`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegisterValue {
    pub name: String,
    pub value: u16,
}

/// The register file.
#[derive(Clone)]
pub struct Registers {
    layout: Arc<RegisterLayout>,
    cells: Memory,
}

impl Registers {
    /// Create a zeroed register file over `layout`.
    pub fn new(layout: Arc<RegisterLayout>) -> Self {
        let cells = Memory::new(layout.backing_size());
        Self { layout, cells }
    }

    /// The shared layout table.
    pub fn layout(&self) -> &Arc<RegisterLayout> {
        &self.layout
    }

    /// Read a register by name.
    pub fn get(&self, name: &str) -> Result<u16, RegisterError> {
        let offset = self.resolve(name)?;
        Ok(self.cells.read16(offset)?)
    }

    /// Write a register by name.
    pub fn set(&mut self, name: &str, value: u16) -> Result<(), RegisterError> {
        let offset = self.resolve(name)?;
        self.cells.write16(offset, value)?;
        Ok(())
    }

    /// Read a register by its raw operand index, bypassing the name table.
    pub fn get_by_index(&self, index: u8) -> Result<u16, RegisterError> {
        let index = usize::from(index);
        if index >= self.layout.len() {
            return Err(RegisterError::IndexOutOfRange {
                index,
                count: self.layout.len(),
            });
        }
        Ok(self.cells.read16(index * REGISTER_WIDTH)?)
    }

    /// Every register in declaration order.
    pub fn snapshot(&self) -> Vec<RegisterValue> {
        self.layout
            .names()
            .iter()
            .enumerate()
            .map(|(i, name)| RegisterValue {
                name: name.clone(),
                value: self.cells.read16(i * REGISTER_WIDTH).unwrap_or_default(),
            })
            .collect()
    }

    /// Zero every register.
    pub fn reset(&mut self) {
        self.cells.clear();
    }

    fn resolve(&self, name: &str) -> Result<usize, RegisterError> {
        self.layout
            .offset(name)
            .ok_or_else(|| RegisterError::UnknownName(name.to_string()))
    }
}

impl Default for Registers {
    fn default() -> Self {
        Self::new(RegisterLayout::standard())
    }
}

/// One `name: 0xhhhh` line per register, then a blank line.
impl fmt::Display for Registers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for RegisterValue { name, value } in self.snapshot() {
            writeln!(f, "{}: 0x{:04x}", name, value)?;
        }
        writeln!(f)
    }
}

impl fmt::Debug for Registers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for RegisterValue { name, value } in self.snapshot() {
            map.entry(&name, &format_args!("0x{:04x}", value));
        }
        map.finish()
    }
}

/// Errors that can occur during register access.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegisterError {
    #[error("no such register '{0}'")]
    UnknownName(String),

    #[error("register index {index} out of range (machine has {count} registers)")]
    IndexOutOfRange { index: usize, count: usize },

    #[error("register storage: {0}")]
    Storage(#[from] MemoryError),
}
