//! Program images and disassembly.
//!
//! This module provides:
//! - Program image loading (raw binary or `.hex` text)
//! - A disassembler (bytes → readable text)

pub mod disasm;
pub mod hex;

use std::path::Path;

use thiserror::Error;

pub use disasm::{disassemble, disassemble_instruction};
pub use hex::parse_hex;

/// Load a program image from disk.
///
/// Files ending in `.hex` are parsed as hex text; anything else is taken as
/// raw program bytes.
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<Vec<u8>, ImageError> {
    let path = path.as_ref();
    let is_hex = path
        .extension()
        .map_or(false, |ext| ext.eq_ignore_ascii_case("hex"));

    let bytes = if is_hex {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ImageError::IoError(format!("{}: {}", path.display(), e)))?;
        parse_hex(&text)?
    } else {
        std::fs::read(path).map_err(|e| ImageError::IoError(format!("{}: {}", path.display(), e)))?
    };

    log::info!("loaded {} byte image from {}", bytes.len(), path.display());
    Ok(bytes)
}

/// Errors that can occur while loading a program image.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImageError {
    #[error("I/O error: {0}")]
    IoError(String),

    #[error("parse error on line {line}: {message}")]
    ParseError { line: usize, message: String },

    #[error("image is empty")]
    Empty,
}
