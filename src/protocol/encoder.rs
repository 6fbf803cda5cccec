//! XInput2 request encoder
//!
//! A cursor over a pre-sized request buffer. Every write is checked against
//! the length computed before the buffer was allocated, so a sizing mistake
//! surfaces as an error instead of a malformed request on the wire.

use super::*;
use byteorder::{BigEndian, ByteOrder as _, LittleEndian};

/// Byte-order aware writer over a fixed-length buffer
pub struct WireWriter {
    buffer: Vec<u8>,
    offset: usize,
    byte_order: ByteOrder,
}

impl WireWriter {
    /// Allocate a zeroed buffer of exactly `len` bytes.
    pub fn with_len(len: usize, byte_order: ByteOrder) -> XiResult<Self> {
        let mut buffer = Vec::new();
        buffer
            .try_reserve_exact(len)
            .map_err(|_| Error::OutOfMemory)?;
        buffer.resize(len, 0);

        Ok(WireWriter {
            buffer,
            offset: 0,
            byte_order,
        })
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn remaining(&self) -> usize {
        self.buffer.len() - self.offset
    }

    fn reserve(&mut self, n: usize) -> XiResult<&mut [u8]> {
        if n > self.remaining() {
            return Err(Error::invalid_argument(format!(
                "write of {} bytes at offset {} overruns {} byte buffer",
                n,
                self.offset,
                self.buffer.len()
            )));
        }
        let start = self.offset;
        self.offset += n;
        Ok(&mut self.buffer[start..start + n])
    }

    pub fn write_u8(&mut self, value: u8) -> XiResult<()> {
        self.reserve(1)?[0] = value;
        Ok(())
    }

    pub fn write_bool(&mut self, value: bool) -> XiResult<()> {
        self.write_u8(if value { 1 } else { 0 })
    }

    pub fn write_u16(&mut self, value: u16) -> XiResult<()> {
        let byte_order = self.byte_order;
        let dst = self.reserve(2)?;
        match byte_order {
            ByteOrder::MSBFirst => BigEndian::write_u16(dst, value),
            ByteOrder::LSBFirst => LittleEndian::write_u16(dst, value),
        }
        Ok(())
    }

    /// Overwrite a 16-bit field already written at `offset`.
    pub fn write_u16_at(&mut self, offset: usize, value: u16) -> XiResult<()> {
        if offset + 2 > self.offset {
            return Err(Error::invalid_argument(format!(
                "patch at offset {} is past the written data",
                offset
            )));
        }
        let dst = &mut self.buffer[offset..offset + 2];
        match self.byte_order {
            ByteOrder::MSBFirst => BigEndian::write_u16(dst, value),
            ByteOrder::LSBFirst => LittleEndian::write_u16(dst, value),
        }
        Ok(())
    }

    pub fn write_u32(&mut self, value: u32) -> XiResult<()> {
        let byte_order = self.byte_order;
        let dst = self.reserve(4)?;
        match byte_order {
            ByteOrder::MSBFirst => BigEndian::write_u32(dst, value),
            ByteOrder::LSBFirst => LittleEndian::write_u32(dst, value),
        }
        Ok(())
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> XiResult<()> {
        self.reserve(bytes.len())?.copy_from_slice(bytes);
        Ok(())
    }

    /// Skip `n` bytes, leaving them zero.
    pub fn skip(&mut self, n: usize) -> XiResult<()> {
        self.reserve(n)?;
        Ok(())
    }

    /// Skip to the next 4-byte boundary.
    pub fn align(&mut self) -> XiResult<()> {
        self.skip(pad(self.offset))
    }

    /// Return the buffer, which must have been written to its end.
    pub fn finish(self) -> XiResult<Vec<u8>> {
        if self.offset != self.buffer.len() {
            return Err(Error::invalid_argument(format!(
                "encoded {} bytes into a {} byte buffer",
                self.offset,
                self.buffer.len()
            )));
        }
        Ok(self.buffer)
    }
}
