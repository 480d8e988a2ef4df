use crate::error::Error;
use crate::reader::{fold_bytes, BitAccumulator, BitRead};
use crate::types::ByteOrder;
use std::io::{self, Read};

/// Cursor reading directly from a byte stream.
///
/// Only moves forward. The byte holding the current bit position is kept
/// around while a bitfield is partially consumed.
#[derive(Debug)]
pub struct StreamReader<R> {
    inner: R,
    pos: u64,
    current: u8,
    order: ByteOrder,
}

impl<R: Read> StreamReader<R> {
    pub fn new(inner: R, order: ByteOrder) -> Self {
        Self {
            inner,
            pos: 0,
            current: 0,
            order,
        }
    }

    /// Number of bytes pulled from the underlying stream so far
    pub fn consumed_bytes(&self) -> u64 {
        self.pos.div_ceil(8)
    }

    fn eof(&self, needed: u64) -> Error {
        Error::UnexpectedEof {
            offset: self.pos,
            needed,
        }
    }

    fn next_byte(&mut self, needed: u64) -> Result<u8, Error> {
        let mut b = [0u8; 1];
        match self.inner.read_exact(&mut b) {
            Ok(()) => Ok(b[0]),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Err(self.eof(needed)),
            Err(e) => Err(e.into()),
        }
    }
}

impl<R: Read> BitRead for StreamReader<R> {
    fn position(&self) -> u64 {
        self.pos
    }

    fn native_byte_order(&self) -> ByteOrder {
        self.order
    }

    fn skip_bits(&mut self, count: u64) -> Result<(), Error> {
        let mut left = count;
        // Finish the partially consumed byte first
        let in_byte = self.pos % 8;
        if in_byte != 0 {
            let n = (8 - in_byte).min(left);
            self.pos += n;
            left -= n;
        }
        let whole = left / 8;
        if whole > 0 {
            let copied = io::copy(&mut (&mut self.inner).take(whole), &mut io::sink())?;
            if copied < whole {
                self.pos += copied * 8;
                return Err(self.eof((whole - copied) * 8));
            }
            self.pos += whole * 8;
            left -= whole * 8;
        }
        if left > 0 {
            self.current = self.next_byte(left)?;
            self.pos += left;
        }
        Ok(())
    }

    fn read_bits(&mut self, count: u32, order: ByteOrder) -> Result<u64, Error> {
        debug_assert!((1..=64).contains(&count));
        let mut acc = BitAccumulator::new(order);
        let mut left = count;
        while left > 0 {
            let in_byte = (self.pos % 8) as u32;
            if in_byte == 0 {
                self.current = self.next_byte(u64::from(left))?;
            }
            let taken = acc.push(self.current, in_byte, left);
            self.pos += u64::from(taken);
            left -= taken;
        }
        Ok(acc.value())
    }

    fn read_aligned(&mut self, size: u32, order: ByteOrder) -> Result<u64, Error> {
        debug_assert_eq!(self.pos % 8, 0);
        let len = (size / 8) as usize;
        let mut buf = [0u8; 8];
        match self.inner.read_exact(&mut buf[..len]) {
            Ok(()) => (),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                return Err(self.eof(u64::from(size)))
            }
            Err(e) => return Err(e.into()),
        }
        self.pos += u64::from(size);
        Ok(fold_bytes(&buf[..len], order))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn mixes_bitfields_and_aligned_reads() {
        let mut data = vec![0b000_10110u8];
        data.extend_from_slice(&0xdead_beef_u32.to_le_bytes());
        data.extend_from_slice(&[0xaa, 0xbb]);
        let mut r = StreamReader::new(data.as_slice(), ByteOrder::LittleEndian);

        assert_eq!(r.read_bits(5, ByteOrder::LittleEndian).unwrap(), 0b10110);
        r.align(8).unwrap();
        assert_eq!(r.position(), 8);
        assert_eq!(
            r.read_aligned(32, ByteOrder::LittleEndian).unwrap(),
            0xdead_beef
        );
        r.skip_bits(4).unwrap();
        assert_eq!(r.read_bits(4, ByteOrder::LittleEndian).unwrap(), 0xa);
        assert_eq!(r.consumed_bytes(), 6);
        assert_eq!(r.read_u8().unwrap(), 0xbb);
        assert!(matches!(r.read_u8(), Err(Error::UnexpectedEof { .. })));
    }

    #[test]
    fn skip_past_end_fails() {
        let data = [0u8; 3];
        let mut r = StreamReader::new(&data[..], ByteOrder::LittleEndian);
        assert!(matches!(
            r.skip_bits(64),
            Err(Error::UnexpectedEof { needed: 40, .. })
        ));
    }
}
