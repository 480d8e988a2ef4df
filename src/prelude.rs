pub use crate::config::ReaderConfig;
pub use crate::error::Error;
pub use crate::event::{EventReader, EventRecord, LostEvents};
pub use crate::flatten::{event_attrs, AttrVal, EventAttrKey};
pub use crate::metadata::{Metadata, MetadataOptions};
pub use crate::opts::ReaderOpts;
pub use crate::schema::{Record, Value};
pub use crate::trace::{ReadStatus, Thread, TraceReadOutcome, TraceReader};
pub use crate::types::{FloatPolicy, Interruptor, ThreadKey};
