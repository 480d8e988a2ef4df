//! Bit-level cursors over CTF packet data.
//!
//! CTF fields are not necessarily byte-aligned: integers may be any width from
//! 1 to 64 bits and pack against each other. Both cursors here track their
//! position in bits relative to the start of the current packet, since that's
//! what CTF alignment is defined against.
//!
//! * [`StreamReader`] reads straight from a byte stream, used for packet headers
//! * [`MemReader`] reads from a buffered packet payload, used for events

use crate::error::Error;
use crate::types::ByteOrder;

pub use packet::{Packet, PacketInfo, PacketReader};
pub use stream::StreamReader;

pub mod packet;
pub mod stream;

pub trait BitRead {
    /// Current position in bits, relative to the start of the packet
    fn position(&self) -> u64;

    /// The trace's byte order, used by declarations that don't specify one
    fn native_byte_order(&self) -> ByteOrder;

    fn skip_bits(&mut self, count: u64) -> Result<(), Error>;

    /// Read `count` (1..=64) bits starting at the current bit position
    fn read_bits(&mut self, count: u32, order: ByteOrder) -> Result<u64, Error>;

    /// Read a byte-aligned 8, 16, 32 or 64-bit unsigned value
    fn read_aligned(&mut self, size: u32, order: ByteOrder) -> Result<u64, Error>;

    /// Round the position up to a multiple of `bits`, sub-byte alignment is a no-op
    fn align(&mut self, bits: u32) -> Result<(), Error> {
        if bits < 8 {
            return Ok(());
        }
        let bits = u64::from(bits);
        let rem = self.position() % bits;
        if rem != 0 {
            self.skip_bits(bits - rem)?;
        }
        Ok(())
    }

    fn read_u8(&mut self) -> Result<u8, Error> {
        self.align(8)?;
        Ok(self.read_aligned(8, ByteOrder::LittleEndian)? as u8)
    }
}

/// Combine whole bytes into an integer
pub(crate) fn fold_bytes(bytes: &[u8], order: ByteOrder) -> u64 {
    match order {
        ByteOrder::LittleEndian => bytes
            .iter()
            .rev()
            .fold(0, |acc, b| (acc << 8) | u64::from(*b)),
        ByteOrder::BigEndian => bytes.iter().fold(0, |acc, b| (acc << 8) | u64::from(*b)),
    }
}

/// Accumulates a bitfield one byte-sized chunk at a time
#[derive(Debug)]
pub(crate) struct BitAccumulator {
    order: ByteOrder,
    value: u64,
    filled: u32,
}

impl BitAccumulator {
    pub(crate) fn new(order: ByteOrder) -> Self {
        Self {
            order,
            value: 0,
            filled: 0,
        }
    }

    /// Take up to `want` bits out of `byte`, starting at `bit_offset`.
    /// Returns how many were taken.
    pub(crate) fn push(&mut self, byte: u8, bit_offset: u32, want: u32) -> u32 {
        let avail = 8 - bit_offset;
        let take = avail.min(want);
        let mask = (1u16 << take) as u64 - 1;
        match self.order {
            ByteOrder::LittleEndian => {
                let chunk = (u64::from(byte) >> bit_offset) & mask;
                self.value |= chunk << self.filled;
            }
            ByteOrder::BigEndian => {
                let chunk = (u64::from(byte) >> (avail - take)) & mask;
                self.value = (self.value << take) | chunk;
            }
        }
        self.filled += take;
        take
    }

    pub(crate) fn value(&self) -> u64 {
        self.value
    }
}

/// Cursor over a packet payload held in memory.
///
/// `base` is the packet-relative bit offset of the first buffered byte, so the
/// payload can be read after its header was consumed elsewhere while alignment
/// stays relative to the packet start. Skipping past the end is allowed,
/// reading past it is not.
#[derive(Clone, Debug)]
pub struct MemReader {
    data: Vec<u8>,
    base: u64,
    pos: u64,
    order: ByteOrder,
}

impl MemReader {
    pub fn new(data: Vec<u8>, order: ByteOrder) -> Self {
        Self::with_base(data, 0, order)
    }

    pub fn with_base(data: Vec<u8>, base_bits: u64, order: ByteOrder) -> Self {
        Self {
            data,
            base: base_bits,
            pos: 0,
            order,
        }
    }

    pub fn len_bits(&self) -> u64 {
        self.data.len() as u64 * 8
    }

    pub fn remaining_bits(&self) -> u64 {
        self.len_bits().saturating_sub(self.pos)
    }

    fn eof(&self, needed: u64) -> Error {
        Error::UnexpectedEof {
            offset: self.position(),
            needed,
        }
    }
}

impl BitRead for MemReader {
    fn position(&self) -> u64 {
        self.base + self.pos
    }

    fn native_byte_order(&self) -> ByteOrder {
        self.order
    }

    fn skip_bits(&mut self, count: u64) -> Result<(), Error> {
        self.pos += count;
        Ok(())
    }

    fn read_bits(&mut self, count: u32, order: ByteOrder) -> Result<u64, Error> {
        debug_assert!((1..=64).contains(&count));
        if self.remaining_bits() < u64::from(count) {
            return Err(self.eof(u64::from(count)));
        }
        let mut acc = BitAccumulator::new(order);
        let mut left = count;
        while left > 0 {
            let byte = self.data[(self.pos / 8) as usize];
            let taken = acc.push(byte, (self.pos % 8) as u32, left);
            self.pos += u64::from(taken);
            left -= taken;
        }
        Ok(acc.value())
    }

    fn read_aligned(&mut self, size: u32, order: ByteOrder) -> Result<u64, Error> {
        debug_assert_eq!(self.pos % 8, 0);
        let start = (self.pos / 8) as usize;
        let len = (size / 8) as usize;
        let bytes = self
            .data
            .get(start..start + len)
            .ok_or_else(|| self.eof(u64::from(size)))?;
        let v = fold_bytes(bytes, order);
        self.pos += u64::from(size);
        Ok(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn aligned_reads_both_orders() {
        let mut r = MemReader::new(vec![0x01, 0x02, 0x03, 0x04], ByteOrder::LittleEndian);
        assert_eq!(r.read_aligned(16, ByteOrder::LittleEndian).unwrap(), 0x0201);
        assert_eq!(r.read_aligned(16, ByteOrder::BigEndian).unwrap(), 0x0304);
        assert_eq!(r.position(), 32);
        assert!(matches!(
            r.read_aligned(8, ByteOrder::LittleEndian),
            Err(Error::UnexpectedEof { offset: 32, .. })
        ));
    }

    #[test]
    fn little_endian_bitfields_cross_bytes() {
        // 5-bit value 0b10110 followed by a 27-bit value 0x5a5a5a5
        let word: u32 = 0b10110 | (0x5a5_a5a5 << 5);
        let mut r = MemReader::new(word.to_le_bytes().to_vec(), ByteOrder::LittleEndian);
        assert_eq!(r.read_bits(5, ByteOrder::LittleEndian).unwrap(), 0b10110);
        assert_eq!(r.read_bits(27, ByteOrder::LittleEndian).unwrap(), 0x5a5_a5a5);
        assert_eq!(r.position(), 32);
    }

    #[test]
    fn big_endian_bitfields_fill_from_msb() {
        let mut r = MemReader::new(vec![0b1010_1100, 0b0111_0000], ByteOrder::BigEndian);
        assert_eq!(r.read_bits(3, ByteOrder::BigEndian).unwrap(), 0b101);
        assert_eq!(r.read_bits(9, ByteOrder::BigEndian).unwrap(), 0b0_1100_0111);
        assert_eq!(r.position(), 12);
    }

    #[test]
    fn align_is_relative_to_base() {
        let mut r = MemReader::with_base(vec![0; 16], 24, ByteOrder::LittleEndian);
        r.align(32).unwrap();
        assert_eq!(r.position(), 32);
        r.align(4).unwrap();
        assert_eq!(r.position(), 32);
        r.skip_bits(1).unwrap();
        r.align(8).unwrap();
        assert_eq!(r.position(), 40);
        r.align(64).unwrap();
        assert_eq!(r.position(), 64);
    }
}
