use crate::error::Error;
use crate::metadata::{EventClass, Metadata};
use crate::reader::{BitRead, PacketReader};
use crate::schema::{Record, Value};
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::sync::Arc;
use tracing::trace;

/// A decoded event
#[derive(Clone, Debug)]
pub struct EventRecord {
    pub class: Arc<EventClass>,
    /// Clock value after compressed timestamps are expanded
    pub timestamp: u64,
    /// CPU of the packet the event was read from
    pub cpu_id: Option<u64>,
    pub header: Option<Record>,
    pub stream_context: Option<Record>,
    pub context: Option<Record>,
    pub fields: Option<Record>,
}

impl EventRecord {
    pub fn name(&self) -> &str {
        &self.class.name
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.as_ref().and_then(|f| f.get(name))
    }

    /// Looks in the per-event context, then in the stream event context
    pub fn context_field(&self, name: &str) -> Option<&Value> {
        self.context
            .as_ref()
            .and_then(|c| c.get(name))
            .or_else(|| self.stream_context.as_ref().and_then(|c| c.get(name)))
    }
}

impl PartialEq for EventRecord {
    fn eq(&self, other: &Self) -> bool {
        (Arc::ptr_eq(&self.class, &other.class)
            || (self.class.stream_id, self.class.id, &self.class.name)
                == (other.class.stream_id, other.class.id, &other.class.name))
            && self.timestamp == other.timestamp
            && self.cpu_id == other.cpu_id
            && self.header == other.header
            && self.stream_context == other.stream_context
            && self.context == other.context
            && self.fields == other.fields
    }
}

/// Events the tracer had to drop, noticed through the packet context's
/// `events_discarded` counter
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LostEvents {
    /// Events dropped since the previous packet
    pub count: u64,
    /// The counter value
    pub total: u64,
    /// Time range of the packet where the loss was noticed
    pub begin: Option<u64>,
    pub end: Option<u64>,
}

/// Expand a timestamp that only holds its `bits` low bits, relative to the
/// previous full timestamp. A smaller low part means the counter wrapped once.
pub fn reconstruct_timestamp(prev: u64, low: u64, bits: u32) -> u64 {
    if bits >= 64 {
        return low;
    }
    let mask = (1u64 << bits) - 1;
    let low = low & mask;
    let mut ts = (prev & !mask) | low;
    if low < (prev & mask) {
        ts = ts.wrapping_add(1 << bits);
    }
    ts
}

/// Decodes the events of one channel file in order
pub struct EventReader<'m, R> {
    packets: PacketReader<'m, R>,
    prev: u64,
    ev_disc: u64,
}

impl<'m> EventReader<'m, BufReader<File>> {
    pub fn open<P: AsRef<Path>>(metadata: &'m Metadata, path: P) -> Result<Self, Error> {
        Ok(Self::new(PacketReader::open(metadata, path)?))
    }
}

impl<'m, R: Read> EventReader<'m, R> {
    pub fn new(packets: PacketReader<'m, R>) -> Self {
        Self {
            packets,
            prev: 0,
            ev_disc: 0,
        }
    }

    pub fn packets(&self) -> &PacketReader<'m, R> {
        &self.packets
    }

    /// Last full timestamp
    pub fn prev_timestamp(&self) -> u64 {
        self.prev
    }

    /// Align the current packet's cursor on the next event header, moving on
    /// to the next packet when this one is used up. `false` at end of file.
    fn ready(&mut self) -> Result<bool, Error> {
        let md = self.packets.metadata();
        loop {
            if let Some(packet) = self.packets.packet_mut() {
                let align = md
                    .stream(packet.info().stream_id)?
                    .event_header
                    .as_ref()
                    .map_or(8, |h| h.align());
                packet.cursor().align(align)?;
                if !packet.is_exhausted() {
                    return Ok(true);
                }
            }
            if !self.packets.load_next()? {
                return Ok(false);
            }
            if let Some(begin) = self
                .packets
                .packet()
                .and_then(|p| p.info().timestamp_begin)
            {
                self.prev = begin;
            }
        }
    }

    /// The next event, along with a record of the events lost before it
    /// when the discarded counter moved
    pub fn next_event(&mut self) -> Result<Option<(EventRecord, Option<LostEvents>)>, Error> {
        if !self.ready()? {
            return Ok(None);
        }
        let md = self.packets.metadata();
        let packet = match self.packets.packet_mut() {
            Some(p) => p,
            None => return Ok(None),
        };
        let info = *packet.info();
        let stream = md.stream(info.stream_id)?;
        let cursor = packet.cursor();

        let header = stream
            .event_header
            .as_ref()
            .map(|h| h.decode(&mut *cursor))
            .transpose()?;
        let stream_context = stream
            .event_context
            .as_ref()
            .map(|c| c.decode(&mut *cursor))
            .transpose()?;
        let id = header.as_ref().and_then(|h| h.uint("id")).unwrap_or(0);
        let class = Arc::clone(md.event(info.stream_id, id)?);
        let context = class
            .context
            .as_ref()
            .map(|c| c.decode(&mut *cursor))
            .transpose()?;
        let fields = class
            .fields
            .as_ref()
            .map(|f| f.decode(&mut *cursor))
            .transpose()?;

        let timestamp = match header.as_ref().and_then(|h| h.get_field("timestamp")) {
            Some((field, value)) => {
                let raw = value.as_u64().unwrap_or(0);
                let bits = field
                    .element_type()
                    .and_then(|t| t.as_int())
                    .map_or(64, |i| i.size());
                reconstruct_timestamp(self.prev, raw, bits)
            }
            None => self.prev,
        };
        self.prev = timestamp;

        let lost = if info.events_discarded != self.ev_disc {
            let mask = match info.events_discarded_bits {
                64.. => u64::MAX,
                bits => (1u64 << bits) - 1,
            };
            let lost = LostEvents {
                count: info.events_discarded.wrapping_sub(self.ev_disc) & mask,
                total: info.events_discarded,
                begin: info.timestamp_begin,
                end: info.timestamp_end,
            };
            self.ev_disc = info.events_discarded;
            Some(lost)
        } else {
            None
        };

        trace!(name = %class.name, timestamp, "Decoded event");
        Ok(Some((
            EventRecord {
                class,
                timestamp,
                cpu_id: info.cpu_id,
                header,
                stream_context,
                context,
                fields,
            },
            lost,
        )))
    }
}
