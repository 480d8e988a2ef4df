//! Flattening of decoded events into dotted attribute keys.
//!
//! Nested structures add a key component per level and arrays add the element
//! index. Enumerations yield the integer value and an extra `.label` key.
//! Integer arrays declared with a text encoding (C `char` arrays) are joined
//! into a single string.

use crate::event::EventRecord;
use crate::schema::{Encoding, Record, Type, Value};
use derive_more::Display;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display)]
pub enum EventAttrKey {
    #[display(fmt = "event.name")]
    Name,
    #[display(fmt = "event.id")]
    Id,
    #[display(fmt = "event.stream_id")]
    StreamId,
    #[display(fmt = "event.timestamp")]
    Timestamp,
    #[display(fmt = "event.loglevel")]
    LogLevel,
    #[display(fmt = "event.cpu_id")]
    CpuId,
    #[display(fmt = "event.stream_context.{_0}")]
    StreamContext(String),
    #[display(fmt = "event.context.{_0}")]
    Context(String),
    #[display(fmt = "event.{_0}")]
    Field(String),
}

#[derive(Clone, PartialEq, Debug, Display, Serialize)]
#[serde(untagged)]
pub enum AttrVal {
    Integer(i64),
    UInteger(u64),
    Float(f64),
    String(String),
}

impl From<i64> for AttrVal {
    fn from(v: i64) -> Self {
        AttrVal::Integer(v)
    }
}

impl From<u64> for AttrVal {
    fn from(v: u64) -> Self {
        AttrVal::UInteger(v)
    }
}

impl From<f64> for AttrVal {
    fn from(v: f64) -> Self {
        AttrVal::Float(v)
    }
}

impl From<String> for AttrVal {
    fn from(v: String) -> Self {
        AttrVal::String(v)
    }
}

impl From<&str> for AttrVal {
    fn from(v: &str) -> Self {
        AttrVal::String(v.to_owned())
    }
}

/// Every attribute of an event
pub fn event_attrs(event: &EventRecord) -> BTreeMap<EventAttrKey, AttrVal> {
    let mut attrs = BTreeMap::new();
    attrs.insert(EventAttrKey::Name, event.name().into());
    attrs.insert(EventAttrKey::Id, event.class.id.into());
    attrs.insert(EventAttrKey::StreamId, event.class.stream_id.into());
    attrs.insert(EventAttrKey::Timestamp, event.timestamp.into());
    if let Some(ll) = event.class.loglevel {
        attrs.insert(EventAttrKey::LogLevel, ll.into());
    }
    if let Some(cpu) = event.cpu_id {
        attrs.insert(EventAttrKey::CpuId, cpu.into());
    }

    let scopes: [(&Option<Record>, fn(String) -> EventAttrKey); 3] = [
        (&event.stream_context, EventAttrKey::StreamContext),
        (&event.context, EventAttrKey::Context),
        (&event.fields, EventAttrKey::Field),
    ];
    for (record, to_key) in scopes {
        if let Some(r) = record {
            attrs.extend(
                record_attrs(r)
                    .into_iter()
                    .map(|(k, v)| (to_key(k), v)),
            );
        }
    }
    attrs
}

/// Yields a map of <'<possibly.nested.key>', AttrVal> for the fields of `record`
pub fn record_attrs(record: &Record) -> BTreeMap<String, AttrVal> {
    RecordToAttrKeysGen::default().generate(record)
}

#[derive(Debug, Default)]
struct RecordToAttrKeysGen {
    // A stack of key components, pushed and popped as nested structures and
    // arrays are entered and left.
    // Invariant: none of the entries contain a '.' character, CTF field names
    // are C identifiers
    attr_key_stack: Vec<String>,

    attrs: BTreeMap<String, AttrVal>,
}

impl RecordToAttrKeysGen {
    fn generate(mut self, record: &Record) -> BTreeMap<String, AttrVal> {
        self.record(record);
        self.attrs
    }

    fn record(&mut self, record: &Record) {
        for (field, value) in record.fields() {
            self.attr_key_stack.push(field.name().to_owned());
            self.value(field.element_type(), value);
            self.attr_key_stack.pop();
        }
    }

    fn value(&mut self, element: Option<&Type>, value: &Value) {
        let key = self.attr_key_stack.join(".");
        match value {
            Value::UInt(v) => {
                self.attrs.insert(key, (*v).into());
            }
            Value::SInt(v) => {
                self.attrs.insert(key, (*v).into());
            }
            Value::Float(v) => {
                self.attrs.insert(key, (*v).into());
            }
            Value::Str(s) => {
                self.attrs.insert(key, s.as_str().into());
            }
            // Enums get an extra `.label` attr
            Value::Enum { value, label } => {
                self.attrs.insert(format!("{key}.label"), label.to_string().into());
                self.attrs.insert(key, wide_int(*value));
            }
            Value::Record(r) => self.record(r),
            Value::Array(items) => {
                if let Some(text) = encoded_text(element, items) {
                    self.attrs.insert(key, text.into());
                    return;
                }
                for (idx, item) in items.iter().enumerate() {
                    self.attr_key_stack.push(idx.to_string());
                    self.value(element, item);
                    self.attr_key_stack.pop();
                }
            }
        }
    }
}

fn wide_int(v: i128) -> AttrVal {
    match (i64::try_from(v), u64::try_from(v)) {
        (Ok(i), _) => i.into(),
        (_, Ok(u)) => u.into(),
        _ => v.to_string().into(),
    }
}

/// The bytes of an innermost array of text-encoded integers, up to the first NUL
fn encoded_text(element: Option<&Type>, items: &[Value]) -> Option<String> {
    let int = element?.as_int()?;
    if int.encoding() == Encoding::None || int.size() != 8 {
        return None;
    }
    let bytes = items
        .iter()
        .map(|v| match v {
            Value::UInt(b) => u8::try_from(*b).ok(),
            _ => None,
        })
        .collect::<Option<Vec<u8>>>()?;
    let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
    Some(String::from_utf8_lossy(&bytes[..end]).into_owned())
}
