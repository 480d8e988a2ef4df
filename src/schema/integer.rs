use crate::error::Error;
use crate::reader::BitRead;
use crate::schema::{Encoding, Value};
use crate::types::ByteOrder;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct IntType {
    size: u32,
    align: u32,
    signed: bool,
    byte_order: Option<ByteOrder>,
    base: u32,
    encoding: Encoding,
    map: Option<String>,
}

impl IntType {
    /// `align` defaults to 8 bits for whole-byte sizes and 1 bit otherwise.
    ///
    /// Signed integers are only supported when they can be read with the
    /// byte-aligned fast path.
    pub fn new(size: u32, align: Option<u32>, signed: bool) -> Result<Self, Error> {
        if size == 0 || size > 64 {
            return Err(Error::InvalidIntegerSize(size));
        }
        let align = align.unwrap_or(if size % 8 == 0 { 8 } else { 1 });
        if !align.is_power_of_two() {
            return Err(Error::InvalidAlignment(align.into()));
        }
        let t = Self {
            size,
            align,
            signed,
            byte_order: None,
            base: 10,
            encoding: Encoding::None,
            map: None,
        };
        if signed && !t.is_standard() {
            return Err(Error::UnsupportedSignedBitfield { size, align });
        }
        Ok(t)
    }

    pub fn with_byte_order(mut self, byte_order: Option<ByteOrder>) -> Self {
        self.byte_order = byte_order;
        self
    }

    pub fn with_base(mut self, base: u32) -> Self {
        self.base = base;
        self
    }

    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Clock this integer maps to, e.g. `clock.monotonic.value`
    pub fn with_map(mut self, map: Option<String>) -> Self {
        self.map = map;
        self
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn align(&self) -> u32 {
        self.align
    }

    pub fn signed(&self) -> bool {
        self.signed
    }

    pub fn byte_order(&self) -> Option<ByteOrder> {
        self.byte_order
    }

    pub fn base(&self) -> u32 {
        self.base
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    pub fn map(&self) -> Option<&str> {
        self.map.as_deref()
    }

    /// Byte-aligned 8/16/32/64-bit integers take the fast path
    pub fn is_standard(&self) -> bool {
        self.align % 8 == 0 && matches!(self.size, 8 | 16 | 32 | 64)
    }

    pub fn decode<R: BitRead + ?Sized>(&self, r: &mut R) -> Result<Value, Error> {
        r.align(self.align)?;
        let order = self.byte_order.unwrap_or_else(|| r.native_byte_order());
        if self.is_standard() {
            let raw = r.read_aligned(self.size, order)?;
            if self.signed {
                Ok(Value::SInt(sign_extend(raw, self.size)))
            } else {
                Ok(Value::UInt(raw))
            }
        } else if self.signed {
            // Rejected by the constructor, kept for types built by hand
            Err(Error::UnsupportedSignedBitfield {
                size: self.size,
                align: self.align,
            })
        } else {
            Ok(Value::UInt(r.read_bits(self.size, order)?))
        }
    }
}

fn sign_extend(raw: u64, size: u32) -> i64 {
    let shift = 64 - size;
    ((raw << shift) as i64) >> shift
}
