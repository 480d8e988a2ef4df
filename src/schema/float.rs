use crate::error::Error;
use crate::reader::BitRead;
use crate::types::{ByteOrder, FloatPolicy};
use tracing::debug;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FloatType {
    exp_dig: u32,
    mant_dig: u32,
    align: u32,
    byte_order: Option<ByteOrder>,
    policy: FloatPolicy,
}

impl FloatType {
    pub fn new(exp_dig: u32, mant_dig: u32, align: Option<u32>) -> Result<Self, Error> {
        let size = exp_dig
            .checked_add(mant_dig)
            .ok_or(Error::InvalidIntegerSize(u32::MAX))?;
        if size == 0 || size > 64 {
            return Err(Error::InvalidIntegerSize(size));
        }
        let align = align.unwrap_or(8);
        if !align.is_power_of_two() {
            return Err(Error::InvalidAlignment(align.into()));
        }
        Ok(Self {
            exp_dig,
            mant_dig,
            align,
            byte_order: None,
            policy: FloatPolicy::default(),
        })
    }

    pub fn with_byte_order(mut self, byte_order: Option<ByteOrder>) -> Self {
        self.byte_order = byte_order;
        self
    }

    pub fn with_policy(mut self, policy: FloatPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn exp_dig(&self) -> u32 {
        self.exp_dig
    }

    pub fn mant_dig(&self) -> u32 {
        self.mant_dig
    }

    /// Width in bits; the mantissa digit count includes the sign bit
    pub fn size(&self) -> u32 {
        self.exp_dig + self.mant_dig
    }

    pub fn align(&self) -> u32 {
        self.align
    }

    pub fn decode<R: BitRead + ?Sized>(&self, r: &mut R) -> Result<f64, Error> {
        r.align(self.align)?;
        let order = self.byte_order.unwrap_or_else(|| r.native_byte_order());
        let size = self.size();
        let raw = if self.align % 8 == 0 && matches!(size, 32 | 64) {
            r.read_aligned(size, order)?
        } else {
            r.read_bits(size, order)?
        };
        match (self.policy, self.exp_dig, self.mant_dig) {
            (FloatPolicy::Ieee754, 8, 24) => Ok(f64::from(f32::from_bits(raw as u32))),
            (FloatPolicy::Ieee754, 11, 53) => Ok(f64::from_bits(raw)),
            (FloatPolicy::Ieee754, exp_dig, mant_dig) => {
                debug!(exp_dig, mant_dig, "Unsupported floating point layout, reporting 0.0");
                Ok(0.0)
            }
            (FloatPolicy::Zero, ..) => Ok(0.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::MemReader;
    use pretty_assertions::assert_eq;

    fn data() -> Vec<u8> {
        let mut data = 1.5f32.to_le_bytes().to_vec();
        data.extend_from_slice(&(-0.25f64).to_le_bytes());
        data
    }

    #[test]
    fn ieee754_single_and_double() {
        let f32_t = FloatType::new(8, 24, None).unwrap();
        let f64_t = FloatType::new(11, 53, None).unwrap();
        let mut r = MemReader::new(data(), ByteOrder::LittleEndian);
        assert_eq!(f32_t.decode(&mut r).unwrap(), 1.5);
        assert_eq!(f64_t.decode(&mut r).unwrap(), -0.25);
        assert_eq!(r.position(), 96);
    }

    #[test]
    fn invalid_sizes() {
        assert!(matches!(
            FloatType::new(u32::MAX, 2, None),
            Err(Error::InvalidIntegerSize(u32::MAX))
        ));
        assert!(matches!(
            FloatType::new(40, 40, None),
            Err(Error::InvalidIntegerSize(80))
        ));
        assert!(matches!(
            FloatType::new(8, 24, Some(3)),
            Err(Error::InvalidAlignment(3))
        ));
    }

    #[test]
    fn zero_policy_still_consumes_the_field() {
        let f32_t = FloatType::new(8, 24, None)
            .unwrap()
            .with_policy(FloatPolicy::Zero);
        let f64_t = FloatType::new(11, 53, None)
            .unwrap()
            .with_policy(FloatPolicy::Zero);
        let mut r = MemReader::new(data(), ByteOrder::LittleEndian);
        assert_eq!(f32_t.decode(&mut r).unwrap(), 0.0);
        assert_eq!(f64_t.decode(&mut r).unwrap(), 0.0);
        assert_eq!(r.position(), 96);
    }
}
