//! # Overview
//!
//! A reader for LTTng traces recorded in the Common Trace Format (CTF 1.8).
//!
//! Conceptually CTF data is organized as followed:
//! * Trace: a `metadata` file written in TSDL, describing every type used by
//!   the binary data
//!   - One or more channel files (streams), each a sequence of packets
//!     * Each packet: header, context, then a series of events
//!
//! [`Metadata`] parses the description, [`EventReader`] decodes the events of
//! a channel file and [`TraceReader`] reads a whole trace, grouping its events
//! by (pid, tid).
//!
//! # Attrs Mappings
//!
//! [`flatten::event_attrs`] gives each event a flat set of attributes:
//! * event.name
//! * event.id
//! * event.stream_id
//! * event.timestamp
//! * event.loglevel
//! * event.cpu_id
//! * event.stream_context.<possibly.nested.fields>
//! * event.context.<possibly.nested.fields>
//! * event.<possibly.nested.fields>
//!
//! # Mapping Conventions
//!
//! ## Enumerations
//!
//! Enumerations are given an attr for the integer value and one for the label
//! of the range it falls in.
//!
//! Example: `my_enum` is an enumeration with value 5 in range "RUNNING"
//! * event.my_enum = 5
//! * event.my_enum.label = "RUNNING"
//!
//! ## Arrays and sequences
//!
//! Each element gets its index as a key component, `event.my_array.0`.
//! Arrays of 8-bit integers declared with a text encoding are a single string.

pub mod config;
pub mod error;
pub mod event;
pub mod flatten;
pub mod metadata;
pub mod opts;
pub mod prelude;
pub mod reader;
pub mod schema;
pub mod trace;
pub mod tracing;
pub mod types;

#[cfg(test)]
mod test_support;

pub use crate::config::ReaderConfig;
pub use crate::error::Error;
pub use crate::event::{EventReader, EventRecord, LostEvents};
pub use crate::flatten::{AttrVal, EventAttrKey};
pub use crate::metadata::{Metadata, MetadataOptions};
pub use crate::opts::ReaderOpts;
pub use crate::trace::{read_trace, ReadStatus, Thread, TraceReadOutcome, TraceReader};
pub use crate::types::{ByteOrder, FloatPolicy, Interruptor, ThreadKey};
