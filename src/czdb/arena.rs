//! Bounds-checked access to the in-memory database image

use byteorder::{ByteOrder, LittleEndian};

use super::error::{CzdbError, Result};

/// Owns the complete database file image.
///
/// Every read is bounds-checked: an overrun means the image is truncated or
/// a pointer is corrupt, and surfaces as `InvalidDatabase` instead of a
/// panic. Callers pass image-relative offsets; translation from the
/// format's super-part-relative pointers happens at the call site.
#[derive(Debug, Default)]
pub(crate) struct Arena {
    data: Vec<u8>,
}

impl Arena {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Borrow `len` bytes starting at `offset`.
    pub fn slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        offset
            .checked_add(len)
            .and_then(|end| self.data.get(offset..end))
            .ok_or_else(|| {
                CzdbError::InvalidDatabase(format!(
                    "read of {} bytes at offset {} exceeds image size {}",
                    len,
                    offset,
                    self.data.len()
                ))
            })
    }

    pub fn read_u32_le(&self, offset: usize) -> Result<u32> {
        Ok(LittleEndian::read_u32(self.slice(offset, 4)?))
    }

    /// Release the image.
    pub fn clear(&mut self) {
        self.data = Vec::new();
    }
}
