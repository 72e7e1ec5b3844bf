//! Instruction set definition.
//!
//! Each instruction is one opcode byte followed by a fixed number of operand
//! bytes determined by the opcode alone. The `MOV_LIT_*` instructions bake
//! their destination register into the opcode to save an operand byte;
//! adding a register means adding opcodes, not widening the encoding.
//!
//! | Opcode | Mnemonic      | Operands                   |
//! |--------|---------------|----------------------------|
//! | `0x10` | `MOV_LIT_R1`  | 16-bit literal             |
//! | `0x11` | `MOV_LIT_R2`  | 16-bit literal             |
//! | `0x12` | `ADD_REG_REG` | two 1-byte register indices |

use std::fmt;

use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A recognized opcode byte.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(TryFromPrimitive, IntoPrimitive)]
pub enum Opcode {
    /// Move a 16-bit literal into `r1`.
    MovLitR1 = 0x10,
    /// Move a 16-bit literal into `r2`.
    MovLitR2 = 0x11,
    /// `acc := reg[a] + reg[b]`, wrapping.
    AddRegReg = 0x12,
}

impl Opcode {
    pub const ALL: &'static [Self] = &[Self::MovLitR1, Self::MovLitR2, Self::AddRegReg];

    /// Decode an opcode byte.
    pub fn decode(byte: u8) -> Result<Self, DecodeError> {
        Self::try_from(byte).map_err(|_| DecodeError::IllegalOpcode(byte))
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            Self::MovLitR1 => "MOV_LIT_R1",
            Self::MovLitR2 => "MOV_LIT_R2",
            Self::AddRegReg => "ADD_REG_REG",
        }
    }

    /// Shape of the operand bytes following this opcode.
    pub fn operands(self) -> OperandShape {
        match self {
            Self::MovLitR1 | Self::MovLitR2 => OperandShape::Literal16,
            Self::AddRegReg => OperandShape::RegisterPair,
        }
    }

    /// Total encoded length, opcode byte included.
    pub fn encoded_len(self) -> usize {
        1 + self.operands().width()
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// Operand layout of an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperandShape {
    /// A big-endian 16-bit literal; the destination is implied by the opcode.
    Literal16,
    /// Two 1-byte register indices.
    RegisterPair,
}

impl OperandShape {
    /// Operand bytes.
    pub fn width(self) -> usize {
        match self {
            Self::Literal16 | Self::RegisterPair => 2,
        }
    }
}

/// A fully decoded instruction with its operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instruction {
    /// `r1 := literal`
    MovLitR1 { literal: u16 },
    /// `r2 := literal`
    MovLitR2 { literal: u16 },
    /// `acc := reg[lhs] + reg[rhs]` (mod 2^16)
    AddRegReg { lhs: u8, rhs: u8 },
}

impl Instruction {
    pub fn opcode(&self) -> Opcode {
        match self {
            Self::MovLitR1 { .. } => Opcode::MovLitR1,
            Self::MovLitR2 { .. } => Opcode::MovLitR2,
            Self::AddRegReg { .. } => Opcode::AddRegReg,
        }
    }

    /// Encoded length in bytes.
    pub fn encoded_len(&self) -> usize {
        self.opcode().encoded_len()
    }

    /// Encode to program bytes.
    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.encoded_len());
        bytes.push(self.opcode().into());
        match *self {
            Self::MovLitR1 { literal } | Self::MovLitR2 { literal } => {
                bytes.extend_from_slice(&literal.to_be_bytes());
            }
            Self::AddRegReg { lhs, rhs } => {
                bytes.push(lhs);
                bytes.push(rhs);
            }
        }
        bytes
    }

    /// Decode the instruction at the start of `bytes`.
    ///
    /// Returns the instruction and the number of bytes it occupies.
    pub fn decode(bytes: &[u8]) -> Result<(Self, usize), DecodeError> {
        let (&first, operands) = bytes.split_first().ok_or(DecodeError::Empty)?;
        let opcode = Opcode::decode(first)?;
        let needed = opcode.operands().width();

        if operands.len() < needed {
            return Err(DecodeError::Truncated {
                opcode,
                needed,
                available: operands.len(),
            });
        }

        let instruction = match opcode {
            Opcode::MovLitR1 => Self::MovLitR1 {
                literal: u16::from_be_bytes([operands[0], operands[1]]),
            },
            Opcode::MovLitR2 => Self::MovLitR2 {
                literal: u16::from_be_bytes([operands[0], operands[1]]),
            },
            Opcode::AddRegReg => Self::AddRegReg {
                lhs: operands[0],
                rhs: operands[1],
            },
        };

        Ok((instruction, opcode.encoded_len()))
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MovLitR1 { literal } | Self::MovLitR2 { literal } => {
                write!(f, "{} 0x{:04x}", self.opcode(), literal)
            }
            Self::AddRegReg { lhs, rhs } => write!(f, "{} #{}, #{}", self.opcode(), lhs, rhs),
        }
    }
}

/// Errors that can occur during instruction decoding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("illegal opcode 0x{0:02x}")]
    IllegalOpcode(u8),

    #[error("{opcode} needs {needed} operand bytes, only {available} left")]
    Truncated {
        opcode: Opcode,
        needed: usize,
        available: usize,
    },

    #[error("no bytes to decode")]
    Empty,
}
