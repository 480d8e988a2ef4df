use crate::error::Error;
use crate::metadata::MetadataOptions;
use crate::opts::ReaderOpts;
use crate::types::FloatPolicy;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;

/// Environment variable naming the configuration file
pub const CONFIG_ENV_VAR: &str = "CTF_READER_CONFIG";

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ReaderConfig {
    /// Files next to the metadata whose name contains this are channel files
    pub channel_pattern: String,

    /// Context fields holding the process ID, the first one present wins
    pub pid_fields: Vec<String>,

    /// Context fields holding the thread ID, the first one present wins
    pub tid_fields: Vec<String>,

    pub float_policy: FloatPolicy,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            channel_pattern: "channel0_".to_owned(),
            pid_fields: ["vpid", "_vpid", "pid", "_pid"].map(String::from).to_vec(),
            tid_fields: ["vtid", "_vtid", "tid", "_tid"].map(String::from).to_vec(),
            float_policy: FloatPolicy::default(),
        }
    }
}

impl ReaderConfig {
    pub fn try_from_file(path: &Path) -> Result<Self, Error> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// The configuration file named by the options, or else by
    /// [`CONFIG_ENV_VAR`], with the options applied on top
    pub fn load_merge_with_opts(opts: ReaderOpts) -> Result<Self, Error> {
        let cfg = if let Some(cfg_path) = &opts.config_file {
            Self::try_from_file(cfg_path)?
        } else if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
            Self::try_from_file(Path::new(&env_path))?
        } else {
            Self::default()
        };

        Ok(Self {
            channel_pattern: opts.channel_pattern.unwrap_or(cfg.channel_pattern),
            pid_fields: if opts.pid_fields.is_empty() {
                cfg.pid_fields
            } else {
                opts.pid_fields
            },
            tid_fields: if opts.tid_fields.is_empty() {
                cfg.tid_fields
            } else {
                opts.tid_fields
            },
            float_policy: opts.float_policy.unwrap_or(cfg.float_policy),
        })
    }

    pub fn metadata_options(&self) -> MetadataOptions {
        MetadataOptions {
            float_policy: self.float_policy,
        }
    }
}
