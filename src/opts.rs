use crate::types::FloatPolicy;
use clap::Parser;
use std::path::PathBuf;

/// Reader options shared by the command line tools. Anything given here
/// takes precedence over the configuration file.
#[derive(Parser, Debug, Clone, Default)]
pub struct ReaderOpts {
    /// Reader configuration file, also read from CTF_READER_CONFIG when not given
    #[clap(long = "config", name = "config-file", help_heading = "READER CONFIGURATION")]
    pub config_file: Option<PathBuf>,

    /// Substring that names the channel files to read next to the metadata
    #[clap(long, name = "channel-pattern", help_heading = "READER CONFIGURATION")]
    pub channel_pattern: Option<String>,

    /// Context field holding the process ID, in order of preference. Can be repeated.
    #[clap(long = "pid-field", name = "pid-field", help_heading = "READER CONFIGURATION")]
    pub pid_fields: Vec<String>,

    /// Context field holding the thread ID, in order of preference. Can be repeated.
    #[clap(long = "tid-field", name = "tid-field", help_heading = "READER CONFIGURATION")]
    pub tid_fields: Vec<String>,

    /// How to decode floating point fields, 'ieee754' or 'zero'
    #[clap(long, name = "float-policy", help_heading = "READER CONFIGURATION")]
    pub float_policy: Option<FloatPolicy>,
}
