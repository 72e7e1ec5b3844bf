//! CPU emulation for the 16-bit virtual machine.
//!
//! This module implements the complete machine:
//! - a flat byte-addressable memory with big-endian 16-bit access
//! - a register file (`ip`, `acc`, `r1..rN`) backed by its own memory
//! - a byte-encoded instruction set with fixed-length instructions
//! - the fetch/execute engine driven one `step` at a time

pub mod memory;
pub mod registers;
pub mod decode;
pub mod execute;

pub use memory::{Memory, MemoryError};
pub use registers::{RegisterError, RegisterLayout, RegisterValue, Registers};
pub use decode::{DecodeError, Instruction, Opcode, OperandShape};
pub use execute::{Cpu, CpuError, CpuState};
