use crate::error::Error;
use crate::reader::BitRead;
use crate::schema::Encoding;

/// NUL-terminated string
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct StringType {
    encoding: Encoding,
}

/// Strings are UTF-8 unless declared otherwise
impl Default for StringType {
    fn default() -> Self {
        Self::new(Encoding::Utf8)
    }
}

impl StringType {
    pub fn new(encoding: Encoding) -> Self {
        Self { encoding }
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    pub fn align(&self) -> u32 {
        8
    }

    pub fn decode<R: BitRead + ?Sized>(&self, r: &mut R) -> Result<String, Error> {
        let mut bytes = Vec::new();
        loop {
            match r.read_u8()? {
                0 => break,
                b => bytes.push(b),
            }
        }
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}
