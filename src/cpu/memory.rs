//! Flat byte-addressable memory.
//!
//! The same type backs both program memory and the register file. Every
//! access is bounds-checked; 16-bit accesses are big-endian (high byte first).

use thiserror::Error;

/// A fixed-size, zero-initialized byte buffer.
#[derive(Clone, PartialEq, Eq)]
pub struct Memory {
    bytes: Box<[u8]>,
}

impl Memory {
    /// Create a new memory of `capacity` bytes, all zeroed.
    pub fn new(capacity: usize) -> Self {
        Self {
            bytes: vec![0; capacity].into_boxed_slice(),
        }
    }

    /// Number of addressable bytes.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.bytes.len()
    }

    /// Read a single byte.
    #[inline]
    pub fn read8(&self, address: usize) -> Result<u8, MemoryError> {
        let index = self.check(address, 1)?;
        Ok(self.bytes[index])
    }

    /// Write a single byte.
    #[inline]
    pub fn write8(&mut self, address: usize, value: u8) -> Result<(), MemoryError> {
        let index = self.check(address, 1)?;
        self.bytes[index] = value;
        Ok(())
    }

    /// Read a big-endian word spanning `address` and `address + 1`.
    #[inline]
    pub fn read16(&self, address: usize) -> Result<u16, MemoryError> {
        let index = self.check(address, 2)?;
        Ok(u16::from_be_bytes([self.bytes[index], self.bytes[index + 1]]))
    }

    /// Write a big-endian word spanning `address` and `address + 1`.
    #[inline]
    pub fn write16(&mut self, address: usize, value: u16) -> Result<(), MemoryError> {
        let index = self.check(address, 2)?;
        self.bytes[index..index + 2].copy_from_slice(&value.to_be_bytes());
        Ok(())
    }

    /// Raw view of the whole buffer.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Raw writable view of the whole buffer.
    ///
    /// Bypasses the checked accessors; the caller is trusted to author a
    /// valid program.
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    /// Copy `program` into memory starting at `start`.
    pub fn load_program(&mut self, start: usize, program: &[u8]) -> Result<(), MemoryError> {
        if start > self.capacity() {
            return Err(MemoryError::OutOfBounds {
                address: start,
                width: program.len(),
                capacity: self.capacity(),
            });
        }

        let available = self.capacity() - start;
        if program.len() > available {
            return Err(MemoryError::ProgramTooLarge {
                size: program.len(),
                available,
            });
        }

        self.bytes[start..start + program.len()].copy_from_slice(program);
        Ok(())
    }

    /// Zero every byte.
    pub fn clear(&mut self) {
        self.bytes.fill(0);
    }

    /// Dump memory contents (for debugging).
    pub fn dump(&self, start: usize, count: usize) -> Vec<(usize, u8)> {
        let end = start.saturating_add(count).min(self.capacity());
        (start.min(end)..end).map(|i| (i, self.bytes[i])).collect()
    }

    /// Resolve an access of `width` bytes at `address` to a buffer index.
    fn check(&self, address: usize, width: usize) -> Result<usize, MemoryError> {
        match address.checked_add(width) {
            Some(end) if end <= self.capacity() => Ok(address),
            _ => Err(MemoryError::OutOfBounds {
                address,
                width,
                capacity: self.capacity(),
            }),
        }
    }
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Only count non-zero bytes
        let non_zero = self.bytes.iter().filter(|b| **b != 0).count();

        f.debug_struct("Memory")
            .field("non_zero_bytes", &non_zero)
            .field("capacity", &self.capacity())
            .finish()
    }
}

/// Errors that can occur during memory operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryError {
    /// The accessed range is not fully inside `[0, capacity)`.
    #[error("{width}-byte access at 0x{address:04x} is out of bounds (capacity {capacity})")]
    OutOfBounds {
        address: usize,
        width: usize,
        capacity: usize,
    },

    /// Program is too large to fit in memory.
    #[error("program size {size} exceeds available space {available}")]
    ProgramTooLarge { size: usize, available: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_zeroed() {
        let mem = Memory::new(64);
        assert_eq!(mem.capacity(), 64);
        assert!(mem.as_bytes().iter().all(|b| *b == 0));
    }

    #[test]
    fn test_read_write_byte() {
        let mut mem = Memory::new(16);
        mem.write8(0x0a, 0x42).unwrap();
        assert_eq!(mem.read8(0x0a).unwrap(), 0x42);
        assert_eq!(mem.as_bytes()[0x0a], 0x42);
    }

    #[test]
    fn test_word_is_big_endian() {
        let mut mem = Memory::new(16);
        mem.write16(4, 0x1234).unwrap();
        assert_eq!(mem.as_bytes()[4], 0x12);
        assert_eq!(mem.as_bytes()[5], 0x34);

        mem.as_bytes_mut()[8] = 0xab;
        mem.as_bytes_mut()[9] = 0xcd;
        assert_eq!(mem.read16(8).unwrap(), 0xabcd);
    }

    #[test]
    fn test_unaligned_word() {
        let mut mem = Memory::new(8);
        mem.write16(3, 0xbeef).unwrap();
        assert_eq!(mem.read16(3).unwrap(), 0xbeef);
        assert_eq!(mem.read8(3).unwrap(), 0xbe);
        assert_eq!(mem.read8(4).unwrap(), 0xef);
    }

    #[test]
    fn test_bounds() {
        let mut mem = Memory::new(4);

        assert!(mem.read8(3).is_ok());
        assert!(mem.read8(4).is_err());
        assert!(mem.read16(2).is_ok());
        assert_eq!(
            mem.read16(3),
            Err(MemoryError::OutOfBounds {
                address: 3,
                width: 2,
                capacity: 4
            })
        );
        assert!(mem.read16(usize::MAX).is_err());

        // A failed word write leaves the in-range byte untouched
        assert!(mem.write16(3, 0xffff).is_err());
        assert_eq!(mem.as_bytes(), &[0, 0, 0, 0]);
    }

    #[test]
    fn test_load_program() {
        let mut mem = Memory::new(8);
        mem.load_program(2, &[1, 2, 3]).unwrap();
        assert_eq!(mem.as_bytes(), &[0, 0, 1, 2, 3, 0, 0, 0]);

        assert_eq!(
            mem.load_program(6, &[1, 2, 3]),
            Err(MemoryError::ProgramTooLarge { size: 3, available: 2 })
        );
        assert!(mem.load_program(100, &[1]).is_err());
    }

    #[test]
    fn test_load_empty_program_past_end() {
        let mut mem = Memory::new(8);
        assert_eq!(
            mem.load_program(100, &[]),
            Err(MemoryError::OutOfBounds {
                address: 100,
                width: 0,
                capacity: 8
            })
        );
        // Loading nothing right at the end is still in range
        assert!(mem.load_program(8, &[]).is_ok());
        assert_eq!(mem, Memory::new(8));
    }

    #[test]
    fn test_dump_clamps_to_capacity() {
        let mut mem = Memory::new(4);
        mem.write8(3, 9).unwrap();
        assert_eq!(mem.dump(2, 10), vec![(2, 0), (3, 9)]);
        assert!(mem.dump(10, 2).is_empty());
    }

    #[test]
    fn test_clear() {
        let mut mem = Memory::new(4);
        mem.load_program(0, &[1, 2, 3, 4]).unwrap();
        mem.clear();
        assert_eq!(mem, Memory::new(4));
    }
}
