//! Reading a whole trace: metadata plus every channel file next to it, with
//! the events grouped per thread.

use crate::config::ReaderConfig;
use crate::error::Error;
use crate::event::{EventReader, EventRecord, LostEvents};
use crate::metadata::Metadata;
use crate::types::{Interruptor, ThreadKey};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, warn};

/// The events of one (pid, tid) pair, in the order they were read
#[derive(Clone, Debug, PartialEq)]
pub struct Thread {
    pub pid: i64,
    pub tid: i64,
    pub events: Vec<EventRecord>,
    pub lost: Vec<LostEvents>,
}

impl Thread {
    fn new(key: ThreadKey) -> Self {
        Self {
            pid: key.pid,
            tid: key.tid,
            events: Vec::new(),
            lost: Vec::new(),
        }
    }

    pub fn key(&self) -> ThreadKey {
        ThreadKey::new(self.pid, self.tid)
    }

    /// Sum of the lost event counts reported on this thread
    pub fn lost_count(&self) -> u64 {
        self.lost.iter().map(|l| l.count).sum()
    }
}

#[derive(Debug)]
pub enum ReadStatus {
    Complete,
    /// The interruptor was set before every event was read
    Interrupted,
    /// Reading stopped on an error, the threads hold what was read before it
    Partial(Error),
}

/// Threads in the order they were first seen, plus how the read ended
#[derive(Debug)]
pub struct TraceReadOutcome {
    pub threads: Vec<Thread>,
    pub status: ReadStatus,
}

impl TraceReadOutcome {
    pub fn is_complete(&self) -> bool {
        matches!(self.status, ReadStatus::Complete)
    }

    pub fn thread(&self, key: ThreadKey) -> Option<&Thread> {
        self.threads.iter().find(|t| t.key() == key)
    }

    pub fn event_count(&self) -> usize {
        self.threads.iter().map(|t| t.events.len()).sum()
    }
}

#[derive(Debug, Default)]
struct ThreadBuckets {
    threads: Vec<Thread>,
    index: HashMap<ThreadKey, usize>,
}

impl ThreadBuckets {
    fn get_mut(&mut self, key: ThreadKey) -> &mut Thread {
        let threads = &mut self.threads;
        let idx = *self.index.entry(key).or_insert_with(|| {
            debug!(thread = %key, "New thread");
            threads.push(Thread::new(key));
            threads.len() - 1
        });
        &mut self.threads[idx]
    }
}

/// Reads LTTng traces
#[derive(Clone, Debug, Default)]
pub struct TraceReader {
    config: ReaderConfig,
    interruptor: Option<Interruptor>,
}

impl TraceReader {
    pub fn new(config: ReaderConfig) -> Self {
        Self {
            config,
            interruptor: None,
        }
    }

    /// Stop between two events once `interruptor` is set
    pub fn with_interruptor(mut self, interruptor: Interruptor) -> Self {
        self.interruptor = Some(interruptor);
        self
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// Read the trace whose metadata is at `path`, or the trace directory
    /// `path` holding a `metadata` file.
    ///
    /// Never fails: an error ends the read and is reported in the outcome's
    /// status along with the events read until then.
    pub fn read<P: AsRef<Path>>(&self, path: P) -> TraceReadOutcome {
        let path = path.as_ref();
        let mut buckets = ThreadBuckets::default();
        let status = match self.read_into(path, &mut buckets) {
            Ok(true) => ReadStatus::Complete,
            Ok(false) => {
                warn!(path = %path.display(), "Trace read interrupted");
                ReadStatus::Interrupted
            }
            Err(e) => {
                error!(path = %path.display(), err = %e, "Failed to read the trace, keeping the events read so far");
                ReadStatus::Partial(e)
            }
        };
        TraceReadOutcome {
            threads: buckets.threads,
            status,
        }
    }

    /// `false` when interrupted
    fn read_into(&self, path: &Path, buckets: &mut ThreadBuckets) -> Result<bool, Error> {
        let metadata_path = if path.is_dir() {
            path.join("metadata")
        } else {
            path.to_path_buf()
        };
        let md = Metadata::from_file_with(&metadata_path, self.config.metadata_options())?;

        for channel in self.channel_files(&metadata_path)? {
            debug!(channel = %channel.display(), "Reading channel");
            let mut events = EventReader::open(&md, &channel)?;
            loop {
                if self.is_interrupted() {
                    return Ok(false);
                }
                let (event, lost) = match events.next_event()? {
                    Some(ev) => ev,
                    None => break,
                };
                let thread = buckets.get_mut(self.thread_key(&event));
                if let Some(lost) = lost {
                    warn!(thread = %thread.key(), count = lost.count, "Events were lost");
                    thread.lost.push(lost);
                }
                thread.events.push(event);
            }
        }
        Ok(true)
    }

    fn is_interrupted(&self) -> bool {
        self.interruptor.as_ref().map_or(false, Interruptor::is_set)
    }

    /// Files next to the metadata whose name contains the channel pattern,
    /// sorted by name
    fn channel_files(&self, metadata_path: &Path) -> Result<Vec<PathBuf>, Error> {
        let dir = match metadata_path.parent() {
            Some(d) if !d.as_os_str().is_empty() => d,
            _ => Path::new("."),
        };
        let mut channels = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let is_channel = entry
                .file_name()
                .to_str()
                .map_or(false, |n| n.contains(&self.config.channel_pattern));
            if is_channel && entry.file_type()?.is_file() {
                channels.push(entry.path());
            }
        }
        channels.sort();
        if channels.is_empty() {
            warn!(dir = %dir.display(), pattern = %self.config.channel_pattern, "No channel files found");
        }
        Ok(channels)
    }

    fn thread_key(&self, event: &EventRecord) -> ThreadKey {
        let first_of = |names: &[String]| {
            names
                .iter()
                .find_map(|n| event.context_field(n).and_then(|v| v.as_i64()))
                .unwrap_or(0)
        };
        ThreadKey::new(
            first_of(&self.config.pid_fields),
            first_of(&self.config.tid_fields),
        )
    }
}

/// Read the trace at `path` with the default configuration
pub fn read_trace<P: AsRef<Path>>(path: P) -> TraceReadOutcome {
    TraceReader::default().read(path)
}
