// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use arrayvec::ArrayString;
use byteorder::{ByteOrder, LittleEndian, ReadBytesExt};
use std::io::Read;

use crate::{Error, Result, ToUsize};

/// Forward-only reader over a fully loaded GIF stream.
///
/// Every read either consumes exactly the requested bytes or fails with
/// [`Error::UnexpectedEndOfStream`] without moving.
pub(crate) struct ByteCursor<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> ByteCursor<'a> {
    pub(crate) const fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    /// Bytes consumed so far.
    pub(crate) const fn offset(&self) -> usize {
        self.offset
    }

    pub(crate) fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    pub(crate) fn read_byte(&mut self) -> Result<u8> {
        self.read_u8().map_err(From::from)
    }

    pub(crate) fn read_u16_le(&mut self) -> Result<u16> {
        self.take(2).map(LittleEndian::read_u16)
    }

    pub(crate) fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut buf = [0u8; N];
        buf.copy_from_slice(self.take(N)?);
        Ok(buf)
    }

    /// Fixed-length ASCII string, e.g. the `GIF89a` signature.
    pub(crate) fn read_ascii<const N: usize>(&mut self) -> Result<ArrayString<N>> {
        let bytes = self.take(N)?;
        if !bytes.is_ascii() {
            return Err(Error::InvalidFormat("non-ascii identifier"));
        }
        let text = std::str::from_utf8(bytes).map_err(|_| Error::InvalidFormat("non-ascii identifier"))?;
        ArrayString::from(text).map_err(|_| Error::InvalidFormat("identifier too long"))
    }

    /// Borrow the next `len` bytes.
    pub(crate) fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        if len > self.remaining() {
            return Err(Error::UnexpectedEndOfStream);
        }
        let data: &'a [u8] = self.data;
        let slice = &data[self.offset..self.offset + len];
        self.offset += len;
        Ok(slice)
    }

    pub(crate) fn skip(&mut self, len: usize) -> Result<()> {
        self.take(len).map(drop)
    }

    /// Walk a zero-terminated sequence of length-prefixed sub-blocks,
    /// handing each block's data (without its length byte) to `sink`.
    pub(crate) fn for_each_sub_block<F>(&mut self, mut sink: F) -> Result<()>
    where
        F: FnMut(&'a [u8]) -> Result<()>,
    {
        loop {
            let len = self.read_byte()?.to_usize();
            if len == 0 {
                return Ok(());
            }
            sink(self.take(len)?)?;
        }
    }

    pub(crate) fn skip_sub_blocks(&mut self) -> Result<()> {
        self.for_each_sub_block(|_| Ok(()))
    }
}

impl Read for ByteCursor<'_> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let len = buf.len().min(self.remaining());
        buf[..len].copy_from_slice(&self.data[self.offset..self.offset + len]);
        self.offset += len;
        Ok(len)
    }
}

#[test]
fn little_endian_reads() {
    let mut src = ByteCursor::new(&[0x0a, 0x00, 0x34, 0x12, 0xff]);
    assert_eq!(src.read_u16_le().unwrap(), 10);
    assert_eq!(src.read_u16_le().unwrap(), 0x1234);
    assert_eq!(src.read_byte().unwrap(), 0xff);
    assert_eq!(src.offset(), 5);
    assert!(matches!(src.read_byte(), Err(Error::UnexpectedEndOfStream)));
}

#[test]
fn short_read_does_not_advance() {
    let mut src = ByteCursor::new(b"GIF");
    assert!(matches!(src.read_ascii::<6>(), Err(Error::UnexpectedEndOfStream)));
    assert_eq!(src.offset(), 0);
    assert!(matches!(src.skip(4), Err(Error::UnexpectedEndOfStream)));
    src.skip(3).unwrap();
    assert_eq!(src.remaining(), 0);
}

#[test]
fn sub_blocks_are_concatenated_without_prefixes() {
    let mut src = ByteCursor::new(&[2, b'a', b'b', 1, b'c', 0, 0x3b]);
    let mut joined = Vec::new();
    src.for_each_sub_block(|block| {
        joined.extend_from_slice(block);
        Ok(())
    })
    .unwrap();
    assert_eq!(joined, b"abc");
    assert_eq!(src.read_byte().unwrap(), 0x3b);
}

#[test]
fn truncated_sub_block() {
    let mut src = ByteCursor::new(&[5, 1, 2]);
    assert!(matches!(src.skip_sub_blocks(), Err(Error::UnexpectedEndOfStream)));
}
