use clap::Parser;
use ctf_reader::{prelude::*, tracing::try_init_tracing_subscriber};
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::PathBuf;
use thiserror::Error;
use tracing::warn;

/// Read an LTTng CTF trace and print its events grouped by thread
#[derive(Parser, Debug, Clone)]
#[clap(version)]
pub struct Opts {
    #[clap(flatten)]
    pub reader_opts: ReaderOpts,

    /// Print every event as a JSON object of flattened attributes, one per line
    #[clap(long, help_heading = "OUTPUT", conflicts_with = "json")]
    pub events: bool,

    /// Print the per-thread summary as JSON
    #[clap(long, help_heading = "OUTPUT")]
    pub json: bool,

    /// Path to the trace directory or its metadata file
    #[clap(name = "input")]
    pub input: PathBuf,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("The trace could only be read partially")]
    Partial(#[source] ctf_reader::Error),
}

#[derive(Debug, Serialize)]
struct ThreadSummary {
    pid: i64,
    tid: i64,
    events: usize,
    lost: u64,
    first_timestamp: Option<u64>,
    last_timestamp: Option<u64>,
}

impl From<&Thread> for ThreadSummary {
    fn from(t: &Thread) -> Self {
        Self {
            pid: t.pid,
            tid: t.tid,
            events: t.events.len(),
            lost: t.lost_count(),
            first_timestamp: t.events.first().map(|e| e.timestamp),
            last_timestamp: t.events.last().map(|e| e.timestamp),
        }
    }
}

fn main() {
    match do_main() {
        Ok(()) => (),
        Err(e) => {
            eprintln!("{e}");
            let mut cause = e.source();
            while let Some(err) = cause {
                eprintln!("Caused by: {err}");
                cause = err.source();
            }
            let code = if e.is::<Error>() {
                exitcode::DATAERR
            } else {
                exitcode::SOFTWARE
            };
            std::process::exit(code);
        }
    }
}

fn do_main() -> Result<(), Box<dyn std::error::Error>> {
    let opts = Opts::parse();

    try_init_tracing_subscriber()?;

    let intr = Interruptor::new();
    let interruptor = intr.clone();
    ctrlc::set_handler(move || {
        if intr.is_set() {
            // 128 (fatal error signal "n") + 2 (control-c is fatal error signal 2)
            std::process::exit(130);
        } else {
            intr.set();
        }
    })?;

    let cfg = ReaderConfig::load_merge_with_opts(opts.reader_opts)?;
    if !opts.input.exists() {
        warn!("Input path '{}' does not exist", opts.input.display());
    }

    let outcome = TraceReader::new(cfg)
        .with_interruptor(interruptor)
        .read(&opts.input);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if opts.events {
        for thread in outcome.threads.iter() {
            for event in thread.events.iter() {
                let attrs: BTreeMap<String, AttrVal> = event_attrs(event)
                    .into_iter()
                    .map(|(k, v)| (k.to_string(), v))
                    .collect();
                serde_json::to_writer(&mut out, &attrs)?;
                writeln!(out)?;
            }
        }
    } else {
        let summaries: Vec<ThreadSummary> =
            outcome.threads.iter().map(ThreadSummary::from).collect();
        if opts.json {
            serde_json::to_writer_pretty(&mut out, &summaries)?;
            writeln!(out)?;
        } else {
            for s in summaries.iter() {
                write!(out, "{}/{}: {} events", s.pid, s.tid, s.events)?;
                if s.lost != 0 {
                    write!(out, ", {} lost", s.lost)?;
                }
                if let (Some(first), Some(last)) = (s.first_timestamp, s.last_timestamp) {
                    write!(out, " [{first}..{last}]")?;
                }
                writeln!(out)?;
            }
        }
    }
    out.flush()?;

    match outcome.status {
        ReadStatus::Complete => Ok(()),
        ReadStatus::Interrupted => {
            warn!("Interrupted, the output only covers the events read so far");
            Ok(())
        }
        ReadStatus::Partial(e) => Err(Error::Partial(e).into()),
    }
}
