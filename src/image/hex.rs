//! Hex text program images.
//!
//! A simple text format:
//! - Whitespace-separated bytes written as two hex digits (`10 12 34`)
//! - Everything after `;` on a line is a comment
//! - Blank lines are ignored

use super::ImageError;

/// Parse a hex text image into program bytes.
pub fn parse_hex(text: &str) -> Result<Vec<u8>, ImageError> {
    let mut bytes = Vec::new();

    for (line_num, line) in text.lines().enumerate() {
        let code = line.split(';').next().unwrap_or_default();

        for token in code.split_whitespace() {
            if token.len() != 2 || !token.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(ImageError::ParseError {
                    line: line_num + 1,
                    message: format!("expected two hex digits, found '{}'", token),
                });
            }

            let byte = u8::from_str_radix(token, 16).map_err(|e| ImageError::ParseError {
                line: line_num + 1,
                message: format!("'{}': {}", token, e),
            })?;
            bytes.push(byte);
        }
    }

    if bytes.is_empty() {
        return Err(ImageError::Empty);
    }

    Ok(bytes)
}
