use crate::error::Error;
use crate::metadata::Metadata;
use crate::reader::{BitRead, MemReader, StreamReader};
use crate::schema::{Record, Value};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::{debug, warn};
use uuid::Uuid;

pub const PACKET_MAGIC: u64 = 0xc1fc_1fc1;

/// A channel file ends when fewer than two 64-bit words are left in it
const MIN_PACKET_BYTES: u64 = 16;

/// What the packet header and packet context say about a packet
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PacketInfo {
    /// Byte offset of the packet in its file
    pub offset: u64,
    pub stream_id: u64,
    /// Bits taken by the packet header and packet context
    pub header_bits: u64,
    pub content_bits: u64,
    pub packet_bits: u64,
    pub events_discarded: u64,
    /// Width of the `events_discarded` counter, for wrap-around
    pub events_discarded_bits: u32,
    pub timestamp_begin: Option<u64>,
    pub timestamp_end: Option<u64>,
    pub cpu_id: Option<u64>,
}

/// A loaded packet: its description, the decoded header and context, and a
/// cursor over the event data
#[derive(Debug)]
pub struct Packet {
    info: PacketInfo,
    header: Option<Record>,
    context: Option<Record>,
    cursor: MemReader,
}

impl Packet {
    pub fn info(&self) -> &PacketInfo {
        &self.info
    }

    pub fn header(&self) -> Option<&Record> {
        self.header.as_ref()
    }

    pub fn context(&self) -> Option<&Record> {
        self.context.as_ref()
    }

    pub fn cursor(&mut self) -> &mut MemReader {
        &mut self.cursor
    }

    /// No event starts at or after the end of the content
    pub fn is_exhausted(&self) -> bool {
        self.cursor.position() >= self.info.content_bits
    }
}

/// Reads the packets of one channel file in order
pub struct PacketReader<'m, R> {
    metadata: &'m Metadata,
    inner: R,
    file_len: u64,
    offset: u64,
    current: Option<Packet>,
}

impl<'m> PacketReader<'m, BufReader<File>> {
    pub fn open<P: AsRef<Path>>(metadata: &'m Metadata, path: P) -> Result<Self, Error> {
        let f = File::open(path.as_ref())?;
        let len = f.metadata()?.len();
        Ok(Self::new(metadata, BufReader::new(f), len))
    }
}

impl<'m, R: Read> PacketReader<'m, R> {
    /// `len` is the number of bytes `inner` holds
    pub fn new(metadata: &'m Metadata, inner: R, len: u64) -> Self {
        Self {
            metadata,
            inner,
            file_len: len,
            offset: 0,
            current: None,
        }
    }

    pub fn metadata(&self) -> &'m Metadata {
        self.metadata
    }

    pub fn packet(&self) -> Option<&Packet> {
        self.current.as_ref()
    }

    pub fn packet_mut(&mut self) -> Option<&mut Packet> {
        self.current.as_mut()
    }

    fn remaining(&self) -> u64 {
        self.file_len.saturating_sub(self.offset)
    }

    /// The current packet is used up and no further packet fits in the file
    pub fn is_empty(&self) -> bool {
        self.current.as_ref().map_or(true, Packet::is_exhausted)
            && self.remaining() < MIN_PACKET_BYTES
    }

    /// Discarded event counter of the current packet
    pub fn events_discarded(&self) -> u64 {
        self.current
            .as_ref()
            .map_or(0, |p| p.info.events_discarded)
    }

    /// Load the next packet that has room for events.
    ///
    /// Returns `false` at the end of the file.
    pub fn load_next(&mut self) -> Result<bool, Error> {
        self.current = None;
        loop {
            if self.remaining() < MIN_PACKET_BYTES {
                if self.remaining() > 0 {
                    debug!(offset = self.offset, bytes = self.remaining(), "Ignoring trailing bytes");
                }
                return Ok(false);
            }
            let packet = self.read_packet()?;
            if packet.info.content_bits <= packet.info.header_bits {
                debug!(offset = packet.info.offset, "Skipping packet without events");
                continue;
            }
            self.current = Some(packet);
            return Ok(true);
        }
    }

    fn read_packet(&mut self) -> Result<Packet, Error> {
        let md = self.metadata;
        let order = md.trace.byte_order;
        let offset = self.offset;
        let remaining = self.remaining();
        let mut sr = StreamReader::new(&mut self.inner, order);

        let header = md
            .trace
            .packet_header
            .as_ref()
            .map(|h| h.decode(&mut sr))
            .transpose()?;
        if let Some(magic) = header.as_ref().and_then(|h| h.uint("magic")) {
            if magic != PACKET_MAGIC {
                return Err(Error::BadPacketMagic { offset, magic });
            }
        }
        if let (Some(expected), Some(found)) = (
            md.trace.uuid,
            header.as_ref().and_then(|h| h.get("uuid")).and_then(uuid_of),
        ) {
            if expected != found {
                warn!(offset, %expected, %found, "Packet UUID doesn't match the trace UUID");
            }
        }
        let stream_id = header
            .as_ref()
            .and_then(|h| h.uint("stream_id"))
            .unwrap_or(0);

        let stream = md.stream(stream_id)?;
        let context = stream
            .packet_context
            .as_ref()
            .map(|c| c.decode(&mut sr))
            .transpose()?;
        let header_bits = sr.position();
        let consumed = sr.consumed_bytes();

        let ctx = |name: &str| context.as_ref().and_then(|c| c.uint(name));
        let packet_bits = ctx("packet_size").unwrap_or(remaining * 8);
        let content_bits = ctx("content_size").unwrap_or(packet_bits);
        // A zero content size marks a packet without events
        if packet_bits % 8 != 0
            || packet_bits < consumed * 8
            || content_bits > packet_bits
            || (content_bits != 0 && content_bits < header_bits)
        {
            return Err(Error::InvalidPacketSize {
                offset,
                packet_bits,
                header_bits,
            });
        }
        let packet_bytes = packet_bits / 8;
        if packet_bytes > remaining {
            return Err(Error::UnexpectedEof {
                offset: offset * 8 + remaining * 8,
                needed: (packet_bytes - remaining) * 8,
            });
        }

        let mut body = vec![0; (packet_bytes - consumed) as usize];
        self.inner.read_exact(&mut body)?;
        self.offset += packet_bytes;

        let events_discarded_bits = context
            .as_ref()
            .and_then(|c| c.get_field("events_discarded"))
            .and_then(|(f, _)| f.element_type())
            .and_then(|t| t.as_int())
            .map_or(64, |i| i.size());
        let info = PacketInfo {
            offset,
            stream_id,
            header_bits,
            content_bits,
            packet_bits,
            events_discarded: ctx("events_discarded").unwrap_or(0),
            events_discarded_bits,
            timestamp_begin: ctx("timestamp_begin"),
            timestamp_end: ctx("timestamp_end"),
            cpu_id: ctx("cpu_id"),
        };
        debug!(
            offset,
            stream_id,
            content_bits,
            packet_bits,
            events_discarded = info.events_discarded,
            "Loaded packet"
        );
        Ok(Packet {
            info,
            header,
            context,
            cursor: MemReader::with_base(body, consumed * 8, order),
        })
    }
}

/// The trace UUID as found in a packet header's `uuid` byte array
fn uuid_of(v: &Value) -> Option<Uuid> {
    let bytes = v
        .as_array()?
        .iter()
        .map(|b| b.as_u64().and_then(|b| u8::try_from(b).ok()))
        .collect::<Option<Vec<u8>>>()?;
    Uuid::from_slice(&bytes).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{channel, PacketBuilder, Payload, METADATA, PACKET_HEADER_LEN};
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    fn reader<'m>(md: &'m Metadata, data: Vec<u8>) -> PacketReader<'m, Cursor<Vec<u8>>> {
        let len = data.len() as u64;
        PacketReader::new(md, Cursor::new(data), len)
    }

    #[test]
    fn reads_header_and_context() {
        let md = Metadata::parse(METADATA).unwrap();
        let data = channel(&[PacketBuilder::new(100, 200)
            .discarded(3)
            .cpu(2)
            .event(100, 1, 1, Payload::start(7, "x"))]);
        let mut packets = reader(&md, data.clone());
        assert!(packets.load_next().unwrap());

        let info = *packets.packet().unwrap().info();
        assert_eq!(info.offset, 0);
        assert_eq!(info.stream_id, 0);
        assert_eq!(info.header_bits, PACKET_HEADER_LEN as u64 * 8);
        assert_eq!(info.packet_bits, data.len() as u64 * 8);
        assert_eq!(info.timestamp_begin, Some(100));
        assert_eq!(info.timestamp_end, Some(200));
        assert_eq!(info.cpu_id, Some(2));
        assert_eq!(info.events_discarded_bits, 64);
        assert_eq!(packets.events_discarded(), 3);
        assert!(!packets.is_empty());

        let p = packets.packet_mut().unwrap();
        let header = p.header().unwrap();
        assert_eq!(header.uint("magic"), Some(PACKET_MAGIC));
        assert_eq!(header.uint("stream_id"), Some(0));
        assert_eq!(p.context().and_then(|c| c.uint("events_discarded")), Some(3));
        assert_eq!(p.cursor().position(), info.header_bits);
        assert!(!p.is_exhausted());
        p.cursor().skip_bits(info.content_bits - info.header_bits).unwrap();
        assert!(p.is_exhausted());
        assert!(packets.is_empty());
        assert!(!packets.load_next().unwrap());
    }

    #[test]
    fn skips_packets_without_events() {
        let md = Metadata::parse(METADATA).unwrap();
        let data = channel(&[
            PacketBuilder::new(0, 10),
            PacketBuilder::new(10, 20).event(15, 1, 1, Payload::start(0, "")),
        ]);
        let mut packets = reader(&md, data);
        assert!(packets.load_next().unwrap());
        assert_eq!(packets.packet().unwrap().info().timestamp_begin, Some(10));
    }

    #[test]
    fn skips_packets_with_zero_content_size() {
        let md = Metadata::parse(METADATA).unwrap();
        let mut data = channel(&[
            PacketBuilder::new(0, 10).event(5, 1, 1, Payload::start(0, "")),
            PacketBuilder::new(10, 20).event(15, 1, 1, Payload::start(1, "")),
        ]);
        // packet_context.content_size of the first packet
        data[40..48].copy_from_slice(&0u64.to_le_bytes());
        let mut packets = reader(&md, data);
        assert!(packets.load_next().unwrap());
        let info = packets.packet().unwrap().info();
        assert_eq!(info.timestamp_begin, Some(10));
        assert_ne!(info.offset, 0);
    }

    #[test]
    fn contradictory_content_size_is_an_error() {
        let md = Metadata::parse(METADATA).unwrap();
        let mut data = channel(&[PacketBuilder::new(0, 10).event(5, 1, 1, Payload::start(0, ""))]);
        // Nonzero but smaller than the header and context
        data[40..48].copy_from_slice(&8u64.to_le_bytes());
        let mut packets = reader(&md, data);
        assert!(matches!(
            packets.load_next(),
            Err(Error::InvalidPacketSize { offset: 0, .. })
        ));
    }

    #[test]
    fn rejects_bad_magic() {
        let md = Metadata::parse(METADATA).unwrap();
        let mut builder = PacketBuilder::new(0, 10).event(1, 1, 1, Payload::start(0, ""));
        builder.magic = 0xdeadbeef;
        let mut packets = reader(&md, builder.build());
        assert!(matches!(
            packets.load_next(),
            Err(Error::BadPacketMagic { offset: 0, magic: 0xdeadbeef })
        ));
    }

    #[test]
    fn uuid_mismatch_is_not_fatal() {
        let md = Metadata::parse(METADATA).unwrap();
        let mut builder = PacketBuilder::new(0, 10).event(1, 1, 1, Payload::start(0, ""));
        builder.uuid = Uuid::nil();
        let mut packets = reader(&md, builder.build());
        assert!(packets.load_next().unwrap());
    }

    #[test]
    fn truncated_packet() {
        let md = Metadata::parse(METADATA).unwrap();
        let mut data = channel(&[PacketBuilder::new(0, 10).event(1, 1, 1, Payload::start(0, "abc"))]);
        data.truncate(data.len() - 20);
        let mut packets = reader(&md, data);
        assert!(matches!(
            packets.load_next(),
            Err(Error::UnexpectedEof { .. })
        ));
    }

    #[test]
    fn trailing_bytes_end_the_stream() {
        let md = Metadata::parse(METADATA).unwrap();
        let mut data = channel(&[PacketBuilder::new(0, 10).event(1, 1, 1, Payload::start(0, ""))]);
        data.extend_from_slice(&[0; 15]);
        let mut packets = reader(&md, data);
        assert!(packets.load_next().unwrap());
        assert!(!packets.load_next().unwrap());
    }
}
