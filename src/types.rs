use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering::SeqCst};
use std::sync::Arc;

#[derive(Clone, Debug)]
#[repr(transparent)]
pub struct Interruptor(Arc<AtomicBool>);

impl Interruptor {
    pub fn new() -> Self {
        Interruptor(Arc::new(AtomicBool::new(false)))
    }

    pub fn set(&self) {
        self.0.store(true, SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(SeqCst)
    }
}

impl Default for Interruptor {
    fn default() -> Self {
        Self::new()
    }
}

/// Byte order of a scalar field.
///
/// Declarations that use `native` (or don't say) carry no byte order and
/// resolve to the trace's byte order when decoded.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display, Default)]
pub enum ByteOrder {
    #[default]
    #[display(fmt = "le")]
    LittleEndian,
    #[display(fmt = "be")]
    BigEndian,
}

impl FromStr for ByteOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "le" => Ok(ByteOrder::LittleEndian),
            "be" | "network" => Ok(ByteOrder::BigEndian),
            _ => Err(format!("'{s}' is not a byte order")),
        }
    }
}

/// What to do with `floating_point` fields.
#[derive(
    Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display, Default, Deserialize,
    Serialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum FloatPolicy {
    /// Decode 32 and 64-bit IEEE-754 values
    #[default]
    #[display(fmt = "ieee754")]
    Ieee754,
    /// Consume the bits and report 0.0
    #[display(fmt = "zero")]
    Zero,
}

impl FromStr for FloatPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "ieee754" => Ok(FloatPolicy::Ieee754),
            "zero" => Ok(FloatPolicy::Zero),
            _ => Err(format!(
                "'{s}' is not a float policy, expected 'ieee754' or 'zero'"
            )),
        }
    }
}

/// Identity of a traced thread: (process id, thread id).
#[derive(
    Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default, Display, Serialize,
)]
#[display(fmt = "{}/{}", pid, tid)]
pub struct ThreadKey {
    pub pid: i64,
    pub tid: i64,
}

impl ThreadKey {
    pub fn new(pid: i64, tid: i64) -> Self {
        Self { pid, tid }
    }
}
