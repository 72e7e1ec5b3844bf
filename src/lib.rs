//! # vcpu
//!
//! A minimal virtual CPU: a 16-bit register machine that fetches, decodes
//! and executes instructions encoded as bytes in a flat memory buffer.
//!
//! ```
//! use vcpu::{Cpu, Memory};
//!
//! let mut mem = Memory::new(256);
//! mem.load_program(0, &[0x10, 0x12, 0x34, 0x11, 0xab, 0xcd, 0x12, 0x02, 0x03]).unwrap();
//!
//! let mut cpu = Cpu::new(mem);
//! for _ in 0..3 {
//!     cpu.step().unwrap();
//! }
//! assert_eq!(cpu.registers().get("acc").unwrap(), 0xbe01);
//! ```

pub mod cpu;
pub mod config;
pub mod image;

// Re-export commonly used types
pub use cpu::{Cpu, CpuError, CpuState, Instruction, Memory, Opcode, RegisterLayout, Registers};
pub use config::{ConfigError, MachineConfig};
pub use image::{disassemble, load_image, parse_hex, ImageError};
