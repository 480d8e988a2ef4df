//! The trace description: everything the TSDL metadata declares.
//!
//! [`Metadata::from_file`] handles both packetized and plain text metadata
//! files. The parsed types are immutable and shared by every reader of the
//! trace.

use crate::error::Error;
use crate::schema::StructType;
use crate::types::{ByteOrder, FloatPolicy};
use derive_more::Display;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;
use std::fs;
use tracing::debug;
use uuid::Uuid;

pub mod framing;
pub mod lexer;
pub mod parser;
pub mod scope;

pub use parser::Parser;

/// Knobs for the parts of the metadata that can be interpreted more than one way
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct MetadataOptions {
    pub float_policy: FloatPolicy,
}

#[derive(Clone, Debug)]
pub struct TraceDesc {
    pub major: u64,
    pub minor: u64,
    pub uuid: Option<Uuid>,
    pub byte_order: ByteOrder,
    pub packet_header: Option<Arc<StructType>>,
}

impl Default for TraceDesc {
    fn default() -> Self {
        Self {
            major: 1,
            minor: 8,
            uuid: None,
            byte_order: ByteOrder::default(),
            packet_header: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ClockDesc {
    pub name: String,
    pub uuid: Option<Uuid>,
    pub description: Option<String>,
    /// Cycles per second
    pub freq: u64,
    /// Offset from the origin in cycles, added to `offset_s`
    pub offset: i64,
    pub offset_s: i64,
    pub precision: u64,
    pub absolute: bool,
}

impl Default for ClockDesc {
    fn default() -> Self {
        Self {
            name: String::new(),
            uuid: None,
            description: None,
            freq: 1_000_000_000,
            offset: 0,
            offset_s: 0,
            precision: 0,
            absolute: false,
        }
    }
}

impl ClockDesc {
    pub fn cycles_to_ns(&self, cycles: u64) -> u64 {
        if self.freq == 1_000_000_000 || self.freq == 0 {
            cycles
        } else {
            (u128::from(cycles) * 1_000_000_000 / u128::from(self.freq)) as u64
        }
    }

    /// Nanoseconds since the clock origin (the Unix epoch when `absolute`)
    /// for a raw clock value
    pub fn to_origin_ns(&self, cycles: u64) -> i128 {
        let offset_ns = if self.offset >= 0 {
            i128::from(self.cycles_to_ns(self.offset.unsigned_abs()))
        } else {
            -i128::from(self.cycles_to_ns(self.offset.unsigned_abs()))
        };
        i128::from(self.offset_s) * 1_000_000_000 + offset_ns + i128::from(self.cycles_to_ns(cycles))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Display, Serialize)]
#[serde(untagged)]
pub enum EnvValue {
    Int(i64),
    Str(String),
}

#[derive(Clone, Debug, Default)]
pub struct StreamDesc {
    pub id: u64,
    pub packet_context: Option<Arc<StructType>>,
    pub event_header: Option<Arc<StructType>>,
    pub event_context: Option<Arc<StructType>>,
}

/// An event declaration
#[derive(Clone, Debug, Default)]
pub struct EventClass {
    pub id: u64,
    pub name: String,
    pub stream_id: u64,
    pub loglevel: Option<i64>,
    pub model_emf_uri: Option<String>,
    pub context: Option<Arc<StructType>>,
    pub fields: Option<Arc<StructType>>,
}

#[derive(Clone, Debug, Default)]
pub struct Metadata {
    pub trace: TraceDesc,
    pub clocks: Vec<ClockDesc>,
    pub env: BTreeMap<String, EnvValue>,
    pub streams: BTreeMap<u64, StreamDesc>,
    pub(crate) events: HashMap<(u64, u64), Arc<EventClass>>,
}

impl Metadata {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        Self::from_file_with(path, MetadataOptions::default())
    }

    pub fn from_file_with<P: AsRef<Path>>(
        path: P,
        options: MetadataOptions,
    ) -> Result<Self, Error> {
        let path = path.as_ref();
        debug!(path = %path.display(), "Reading metadata");
        let raw = fs::read(path)?;
        let text = framing::deframe(&raw);
        let text = String::from_utf8_lossy(&text);
        Self::parse_with(&text, options)
    }

    pub fn parse(text: &str) -> Result<Self, Error> {
        Self::parse_with(text, MetadataOptions::default())
    }

    pub fn parse_with(text: &str, options: MetadataOptions) -> Result<Self, Error> {
        Parser::new(text, options).parse()
    }

    pub fn stream(&self, id: u64) -> Result<&StreamDesc, Error> {
        self.streams.get(&id).ok_or(Error::UnknownStream(id))
    }

    pub fn event(&self, stream_id: u64, id: u64) -> Result<&Arc<EventClass>, Error> {
        self.events
            .get(&(stream_id, id))
            .ok_or(Error::UnknownEvent { stream_id, id })
    }

    /// Event classes ordered by stream then event ID
    pub fn events(&self) -> Vec<&Arc<EventClass>> {
        let mut events: Vec<_> = self.events.values().collect();
        events.sort_by_key(|e| (e.stream_id, e.id));
        events
    }

    pub fn clock(&self, name: &str) -> Option<&ClockDesc> {
        self.clocks.iter().find(|c| c.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{self, METADATA};
    use pretty_assertions::assert_eq;

    #[test]
    fn reads_packetized_and_plain_files() {
        let dir = tempfile::tempdir().unwrap();
        let plain = dir.path().join("plain");
        fs::write(&plain, METADATA).unwrap();
        let framed = dir.path().join("metadata");
        fs::write(&framed, framing::frame(METADATA, 4096)).unwrap();

        for path in [plain, framed] {
            let md = Metadata::from_file(&path).unwrap();
            assert_eq!(md.trace.uuid, Some(test_support::trace_uuid()));
            assert_eq!(md.event(0, 1).unwrap().name, "app:samples");
        }
    }

    #[test]
    fn invalid_utf8_in_strings_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metadata");
        let raw = METADATA
            .replace("\"testhost\"", "\"test@host\"")
            .into_bytes()
            .into_iter()
            .map(|b| if b == b'@' { 0xff } else { b })
            .collect::<Vec<u8>>();
        fs::write(&path, raw).unwrap();

        let md = Metadata::from_file(&path).unwrap();
        assert_eq!(
            md.env.get("hostname"),
            Some(&EnvValue::Str("test\u{fffd}host".to_owned()))
        );
    }

    #[test]
    fn unknown_ids() {
        let md = Metadata::parse(METADATA).unwrap();
        assert!(matches!(md.stream(3), Err(Error::UnknownStream(3))));
        assert!(matches!(
            md.event(0, 99),
            Err(Error::UnknownEvent { stream_id: 0, id: 99 })
        ));
        let names: Vec<_> = md.events().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["app:start", "app:samples"]);
    }

    #[test]
    fn clock_conversion() {
        let clock = ClockDesc {
            freq: 1_000,
            offset_s: 2,
            offset: -500,
            ..Default::default()
        };
        assert_eq!(clock.cycles_to_ns(3), 3_000_000);
        assert_eq!(clock.to_origin_ns(1_000), 2_500_000_000);
        assert_eq!(ClockDesc::default().cycles_to_ns(42), 42);
    }
}
