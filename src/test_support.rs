//! Builders for small LTTng-like traces written to disk by the tests.

use crate::metadata::framing;
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub(crate) const TRACE_UUID: &str = "2a6422d0-6cee-11e0-8c08-cb07d7b3a564";

pub(crate) const PACKET_MAGIC: u32 = 0xc1fc_1fc1;

/// Bytes taken by the packet header (24) and packet context (44)
pub(crate) const PACKET_HEADER_LEN: usize = 68;

pub(crate) const METADATA: &str = r#"/* CTF 1.8 */

typealias integer { size = 8; align = 8; signed = false; } := uint8_t;
typealias integer { size = 16; align = 8; signed = false; } := uint16_t;
typealias integer { size = 32; align = 8; signed = false; } := uint32_t;
typealias integer { size = 64; align = 8; signed = false; } := uint64_t;
typealias integer { size = 64; align = 8; signed = false; } := unsigned long;
typealias integer { size = 5; align = 1; signed = false; } := uint5_t;
typealias integer { size = 27; align = 1; signed = false; } := uint27_t;

trace {
	major = 1;
	minor = 8;
	uuid = "2a6422d0-6cee-11e0-8c08-cb07d7b3a564";
	byte_order = le;
	packet.header := struct {
		uint32_t magic;
		uint8_t  uuid[16];
		uint32_t stream_id;
	};
};

env {
	hostname = "testhost";
	domain = "ust";
	tracer_name = "lttng-ust";
	tracer_major = 2;
	tracer_minor = 13;
};

clock {
	name = "monotonic";
	uuid = "e8a9f0ac-4cbe-4e24-9d5e-0f0e7b1b7c2d";
	description = "Monotonic Clock";
	freq = 1000000000; /* Frequency, in Hz */
	/* clock value offset from Epoch is: offset * (1/freq) */
	offset_s = 1700000000;
	offset = 0;
	precision = 1;
	absolute = TRUE;
};

typealias integer {
	size = 27; align = 1; signed = false;
	map = clock.monotonic.value;
} := uint27_clock_monotonic_t;

typealias integer {
	size = 64; align = 8; signed = false;
	map = clock.monotonic.value;
} := uint64_clock_monotonic_t;

struct packet_context {
	uint64_clock_monotonic_t timestamp_begin;
	uint64_clock_monotonic_t timestamp_end;
	uint64_t content_size;
	uint64_t packet_size;
	unsigned long events_discarded;
	uint32_t cpu_id;
};

struct event_header_compact {
	enum : uint5_t { compact = 0 ... 30, extended = 31 } id;
	variant <id> {
		struct {
			uint27_clock_monotonic_t timestamp;
		} compact;
		struct {
			uint32_t id;
			uint64_clock_monotonic_t timestamp;
		} extended;
	} v;
} align(8);

stream {
	id = 0;
	event.header := struct event_header_compact;
	packet.context := struct packet_context;
	event.context := struct {
		integer { size = 32; align = 8; signed = 1; encoding = none; base = 10; } _vpid;
		integer { size = 32; align = 8; signed = 1; encoding = none; base = 10; } _vtid;
	};
};

event {
	name = "app:start";
	id = 0;
	stream_id = 0;
	loglevel = 6;
	context := struct {
		uint8_t _prio;
	};
	fields := struct {
		integer { size = 32; align = 8; signed = 1; encoding = none; base = 10; } _value;
		string _msg;
	};
};

event {
	name = "app:samples";
	id = 1;
	stream_id = 0;
	loglevel = 13;
	model.emf.uri = "http://example.com/samples";
	fields := struct {
		integer { size = 8; align = 8; signed = 0; encoding = UTF8; base = 10; } _tag[3];
		unsigned long _len;
		integer { size = 16; align = 8; signed = 0; encoding = none; base = 16; } _samples[_len];
	};
};
"#;

pub(crate) fn trace_uuid() -> Uuid {
    Uuid::parse_str(TRACE_UUID).unwrap()
}

/// Event payloads of the test metadata
#[derive(Clone, Debug)]
pub(crate) enum Payload {
    Start { prio: u8, value: i32, msg: String },
    Samples { tag: [u8; 3], samples: Vec<u16> },
}

impl Payload {
    pub(crate) fn start(value: i32, msg: &str) -> Self {
        Payload::Start {
            prio: 1,
            value,
            msg: msg.to_owned(),
        }
    }

    pub(crate) fn samples(tag: &[u8; 3], samples: &[u16]) -> Self {
        Payload::Samples {
            tag: *tag,
            samples: samples.to_vec(),
        }
    }

    fn id(&self) -> u32 {
        match self {
            Payload::Start { .. } => 0,
            Payload::Samples { .. } => 1,
        }
    }
}

/// One channel packet in the layout of the test metadata
#[derive(Clone, Debug)]
pub(crate) struct PacketBuilder {
    pub(crate) magic: u32,
    pub(crate) uuid: Uuid,
    pub(crate) timestamp_begin: u64,
    pub(crate) timestamp_end: u64,
    pub(crate) events_discarded: u64,
    pub(crate) cpu_id: u32,
    pub(crate) padding: usize,
    body: Vec<u8>,
}

impl PacketBuilder {
    pub(crate) fn new(timestamp_begin: u64, timestamp_end: u64) -> Self {
        Self {
            magic: PACKET_MAGIC,
            uuid: trace_uuid(),
            timestamp_begin,
            timestamp_end,
            events_discarded: 0,
            cpu_id: 0,
            padding: 16,
            body: Vec::new(),
        }
    }

    pub(crate) fn discarded(mut self, events_discarded: u64) -> Self {
        self.events_discarded = events_discarded;
        self
    }

    pub(crate) fn cpu(mut self, cpu_id: u32) -> Self {
        self.cpu_id = cpu_id;
        self
    }

    /// Event with a compact header, `timestamp` is truncated to 27 bits
    pub(crate) fn event(mut self, timestamp: u64, pid: i32, tid: i32, payload: Payload) -> Self {
        let word = payload.id() | (((timestamp & ((1 << 27) - 1)) as u32) << 5);
        self.body.extend_from_slice(&word.to_le_bytes());
        self.payload(pid, tid, payload)
    }

    /// Event with an extended header holding the full timestamp
    pub(crate) fn extended_event(
        mut self,
        timestamp: u64,
        pid: i32,
        tid: i32,
        payload: Payload,
    ) -> Self {
        self.body.push(31);
        self.body.extend_from_slice(&payload.id().to_le_bytes());
        self.body.extend_from_slice(&timestamp.to_le_bytes());
        self.payload(pid, tid, payload)
    }

    fn payload(mut self, pid: i32, tid: i32, payload: Payload) -> Self {
        self.body.extend_from_slice(&pid.to_le_bytes());
        self.body.extend_from_slice(&tid.to_le_bytes());
        match payload {
            Payload::Start { prio, value, msg } => {
                self.body.push(prio);
                self.body.extend_from_slice(&value.to_le_bytes());
                self.body.extend_from_slice(msg.as_bytes());
                self.body.push(0);
            }
            Payload::Samples { tag, samples } => {
                self.body.extend_from_slice(&tag);
                self.body
                    .extend_from_slice(&(samples.len() as u64).to_le_bytes());
                for s in samples {
                    self.body.extend_from_slice(&s.to_le_bytes());
                }
            }
        }
        self
    }

    pub(crate) fn build(&self) -> Vec<u8> {
        let content = PACKET_HEADER_LEN + self.body.len();
        let packet = content + self.padding;
        let mut out = Vec::with_capacity(packet);
        out.extend_from_slice(&self.magic.to_le_bytes());
        out.extend_from_slice(self.uuid.as_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&self.timestamp_begin.to_le_bytes());
        out.extend_from_slice(&self.timestamp_end.to_le_bytes());
        out.extend_from_slice(&((content * 8) as u64).to_le_bytes());
        out.extend_from_slice(&((packet * 8) as u64).to_le_bytes());
        out.extend_from_slice(&self.events_discarded.to_le_bytes());
        out.extend_from_slice(&self.cpu_id.to_le_bytes());
        debug_assert_eq!(out.len(), PACKET_HEADER_LEN);
        out.extend_from_slice(&self.body);
        out.resize(packet, 0);
        out
    }
}

/// Concatenate packets into one channel file image
pub(crate) fn channel(packets: &[PacketBuilder]) -> Vec<u8> {
    packets.iter().flat_map(PacketBuilder::build).collect()
}

/// Write packetized metadata and the given channel files into `dir`,
/// returning the metadata path
pub(crate) fn write_trace(dir: &Path, channels: &[(&str, Vec<u8>)]) -> PathBuf {
    let metadata = dir.join("metadata");
    fs::write(&metadata, framing::frame(METADATA, 1024)).unwrap();
    for (name, data) in channels {
        fs::write(dir.join(name), data).unwrap();
    }
    metadata
}
