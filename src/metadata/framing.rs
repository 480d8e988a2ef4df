//! LTTng writes its metadata as a sequence of packets, each holding a chunk of
//! the TSDL text behind a fixed header:
//!
//! ```text
//! u32 magic (0x75d11d57)   u8[16] uuid   u32 checksum
//! u32 content_size (bits)  u32 packet_size (bits)
//! u8 compression_scheme  u8 encryption_scheme  u8 checksum_scheme
//! u8 major  u8 minor
//! ```

use crate::types::ByteOrder;
use tracing::debug;

pub const METADATA_MAGIC: u32 = 0x75d1_1d57;

/// Size of the metadata packet header in bytes
pub const METADATA_HEADER_LEN: usize = 37;

const CONTENT_SIZE_OFFSET: usize = 24;
const PACKET_SIZE_OFFSET: usize = 28;

fn read_u32(bytes: &[u8], offset: usize, order: ByteOrder) -> Option<u32> {
    let b: [u8; 4] = bytes.get(offset..offset + 4)?.try_into().ok()?;
    Some(match order {
        ByteOrder::LittleEndian => u32::from_le_bytes(b),
        ByteOrder::BigEndian => u32::from_be_bytes(b),
    })
}

/// Byte order of a packetized metadata file, `None` for plain text metadata
pub fn detect_packetized(bytes: &[u8]) -> Option<ByteOrder> {
    [ByteOrder::LittleEndian, ByteOrder::BigEndian]
        .into_iter()
        .find(|order| read_u32(bytes, 0, *order) == Some(METADATA_MAGIC))
}

/// Strip the packet framing, yielding the concatenated metadata text bytes.
///
/// Plain text metadata is returned unchanged. A packet with the wrong magic or
/// an impossible size ends the metadata.
pub fn deframe(bytes: &[u8]) -> Vec<u8> {
    let order = match detect_packetized(bytes) {
        Some(order) => order,
        None => return bytes.to_vec(),
    };

    let mut text = Vec::with_capacity(bytes.len());
    let mut pos = 0;
    while pos < bytes.len() {
        let packet = &bytes[pos..];
        if read_u32(packet, 0, order) != Some(METADATA_MAGIC) {
            debug!(offset = pos, "Metadata packet magic mismatch, stopping");
            break;
        }
        let (content, size) = match (
            read_u32(packet, CONTENT_SIZE_OFFSET, order),
            read_u32(packet, PACKET_SIZE_OFFSET, order),
        ) {
            (Some(c), Some(p)) => ((c / 8) as usize, (p / 8) as usize),
            _ => break,
        };
        if size <= METADATA_HEADER_LEN || content < METADATA_HEADER_LEN || content > size {
            debug!(offset = pos, content, size, "Invalid metadata packet size, stopping");
            break;
        }
        let end = content.min(packet.len());
        text.extend_from_slice(&packet[METADATA_HEADER_LEN..end]);
        pos += size;
    }
    text
}

/// Wrap metadata text into packets of `packet_len` bytes, the inverse of [`deframe`]
#[cfg(test)]
pub(crate) fn frame(text: &str, packet_len: usize) -> Vec<u8> {
    let room = packet_len - METADATA_HEADER_LEN;
    let mut out = Vec::new();
    for chunk in text.as_bytes().chunks(room) {
        let content_bits = ((METADATA_HEADER_LEN + chunk.len()) * 8) as u32;
        out.extend_from_slice(&METADATA_MAGIC.to_le_bytes());
        out.extend_from_slice(&[0xab; 16]);
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&content_bits.to_le_bytes());
        out.extend_from_slice(&((packet_len * 8) as u32).to_le_bytes());
        out.extend_from_slice(&[0, 0, 0, 1, 8]);
        out.extend_from_slice(chunk);
        out.resize(out.len() + room - chunk.len(), 0);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const TEXT: &str = "/* CTF 1.8 */\ntrace { major = 1; minor = 8; byte_order = le; };\n";

    #[test]
    fn plain_text_passes_through() {
        assert_eq!(detect_packetized(TEXT.as_bytes()), None);
        assert_eq!(deframe(TEXT.as_bytes()), TEXT.as_bytes());
    }

    #[test]
    fn strips_packet_headers_and_padding() {
        let framed = frame(TEXT, 64);
        assert_eq!(framed.len() % 64, 0);
        assert!(framed.len() > 64);
        assert_eq!(detect_packetized(&framed), Some(ByteOrder::LittleEndian));
        assert_eq!(deframe(&framed), TEXT.as_bytes());
    }

    #[test]
    fn magic_mismatch_ends_silently() {
        let mut framed = frame(TEXT, 64);
        framed[64] ^= 0xff;
        assert_eq!(deframe(&framed), &TEXT.as_bytes()[..64 - METADATA_HEADER_LEN]);
    }

    #[test]
    fn big_endian_framing() {
        let mut framed = METADATA_MAGIC.to_be_bytes().to_vec();
        framed.extend_from_slice(&[0; 20]);
        let body = b"env { };";
        framed.extend_from_slice(&(((METADATA_HEADER_LEN + body.len()) * 8) as u32).to_be_bytes());
        framed.extend_from_slice(&((128 * 8) as u32).to_be_bytes());
        framed.extend_from_slice(&[0; 5]);
        framed.extend_from_slice(body);
        framed.resize(128, 0);
        assert_eq!(detect_packetized(&framed), Some(ByteOrder::BigEndian));
        assert_eq!(deframe(&framed), body);
    }
}
