//! Disassembler for program images.
//!
//! Converts program bytes back to readable text, one instruction per line.

use crate::cpu::decode::{DecodeError, Instruction};

/// Disassemble the instruction at the start of `bytes`.
///
/// Returns the text and the number of bytes consumed. Undecodable bytes
/// render as `???` and consume a single byte.
pub fn disassemble_instruction(bytes: &[u8]) -> (String, usize) {
    match Instruction::decode(bytes) {
        Ok((instr, len)) => (instr.to_string(), len),
        Err(DecodeError::Truncated { opcode, .. }) => (format!("{} ???", opcode), bytes.len()),
        Err(_) => ("???".to_string(), bytes.len().min(1)),
    }
}

/// Disassemble a whole program image.
pub fn disassemble(bytes: &[u8]) -> String {
    let mut output = String::new();
    let mut addr = 0;

    while addr < bytes.len() {
        let (text, len) = disassemble_instruction(&bytes[addr..]);
        let raw: Vec<String> = bytes[addr..addr + len]
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect();

        output.push_str(&format!("{:04x}: {:<9} {}\n", addr, raw.join(" "), text));
        addr += len;
    }

    output
}
