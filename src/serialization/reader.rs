//! Bounds-checked cursor over fixed-layout preimage bytes

use super::varint::decode_varint;
use crate::error::{CovenantError, Result};
use std::borrow::Cow;

pub struct ByteReader<'a> {
    data: &'a [u8],
    offset: usize,
    what: &'static str,
}

impl<'a> ByteReader<'a> {
    /// `what` names the structure being parsed in error messages
    pub fn new(data: &'a [u8], what: &'static str) -> Self {
        Self {
            data,
            offset: 0,
            what,
        }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    pub fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self.offset.checked_add(len).filter(|end| *end <= self.data.len());
        match end {
            Some(end) => {
                let slice = &self.data[self.offset..end];
                self.offset = end;
                Ok(slice)
            }
            None => Err(CovenantError::MalformedEncoding(Cow::Owned(format!(
                "{}: needs {len} bytes at offset {}, {} available",
                self.what,
                self.offset,
                self.remaining()
            )))),
        }
    }

    pub fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn u32_le(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.array::<4>()?))
    }

    pub fn u64_le(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.array::<8>()?))
    }

    pub fn varint(&mut self) -> Result<u64> {
        let (value, consumed) = decode_varint(&self.data[self.offset..])?;
        self.offset += consumed;
        Ok(value)
    }

    /// Fails unless every byte has been consumed
    pub fn finish(self) -> Result<()> {
        if self.remaining() != 0 {
            return Err(CovenantError::MalformedEncoding(Cow::Owned(format!(
                "{}: {} trailing bytes",
                self.what,
                self.remaining()
            ))));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reader_reads_in_order() {
        let data = [1, 0, 0, 0, 2, 0, 0, 0, 0, 0, 0, 0, 0xfd, 0xfd, 0x00];
        let mut reader = ByteReader::new(&data, "test");
        assert_eq!(reader.u32_le().unwrap(), 1);
        assert_eq!(reader.u64_le().unwrap(), 2);
        assert_eq!(reader.varint().unwrap(), 0xfd);
        reader.finish().unwrap();
    }

    #[test]
    fn test_reader_rejects_overrun_and_trailing() {
        let data = [1, 2, 3];
        let mut reader = ByteReader::new(&data, "test");
        assert!(reader.u32_le().is_err());
        let mut reader = ByteReader::new(&data, "test");
        reader.take(2).unwrap();
        assert!(reader.finish().is_err());
    }
}
