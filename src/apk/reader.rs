//! Bounds-checked little endian reads over a byte buffer.

use crate::error::ErrorKind;
use anyhow::Result;

/// Read-only view over a binary buffer.
///
/// Every read checks its bounds and reports a parse error instead of panicking, since package
/// contents are untrusted.
#[derive(Debug, Clone, Copy)]
pub struct Reader<'a> {
    data: &'a [u8],
}

impl<'a> Reader<'a> {
    /// Creates a new reader for the given buffer.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    /// Gets the length of the underlying buffer.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Gets `len` bytes starting at `offset`.
    pub fn slice(&self, offset: usize, len: usize) -> Result<&'a [u8]> {
        offset
            .checked_add(len)
            .filter(|end| *end <= self.data.len())
            .map(|end| &self.data[offset..end])
            .ok_or_else(|| {
                ErrorKind::parse(format!(
                    "tried to read {} bytes at offset {}, but the buffer is only {} bytes long",
                    len,
                    offset,
                    self.data.len()
                ))
                .into()
            })
    }

    /// Reads a byte.
    pub fn u8_at(&self, offset: usize) -> Result<u8> {
        Ok(self.slice(offset, 1)?[0])
    }

    /// Reads a little endian `u16`.
    pub fn u16_at(&self, offset: usize) -> Result<u16> {
        let bytes = self.slice(offset, 2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    /// Reads a little endian `u32`.
    pub fn u32_at(&self, offset: usize) -> Result<u32> {
        let bytes = self.slice(offset, 4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Reads a little endian `u32` and converts it to an offset or size.
    pub fn usize_at(&self, offset: usize) -> Result<usize> {
        Ok(self.u32_at(offset)? as usize)
    }

    /// Reads an unsigned LEB128 value, returning it along with the number of bytes it used.
    pub fn uleb128_at(&self, offset: usize) -> Result<(u32, usize)> {
        let mut result = 0_u32;
        for i in 0..5 {
            let byte = self.u8_at(offset + i)?;
            result |= u32::from(byte & 0x7f) << (7 * i);
            if byte & 0x80 == 0 {
                return Ok((result, i + 1));
            }
        }

        Err(ErrorKind::parse(format!("LEB128 value at offset {} is too long", offset)).into())
    }

    /// Gets the bytes from `offset` up to, but not including, the next NUL byte.
    pub fn nul_terminated_at(&self, offset: usize) -> Result<&'a [u8]> {
        let rest = self.slice(offset, self.data.len().saturating_sub(offset))?;
        rest.iter()
            .position(|b| *b == 0)
            .map(|end| &rest[..end])
            .ok_or_else(|| {
                ErrorKind::parse(format!("unterminated string at offset {}", offset)).into()
            })
    }
}
