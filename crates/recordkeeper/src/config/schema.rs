use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::db::default_database_path;
use crate::disposal::DEFAULT_REJECT_REMARKS_MIN_LEN;
use crate::retention::BareYearsPolicy;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub version: String,
    /// SQLite file. Falls back to `~/.recordkeeper/data/recordkeeper.db`.
    #[serde(default)]
    pub database_path: Option<String>,
    #[serde(default)]
    pub sweep: SweepConfig,
    #[serde(default)]
    pub retention: RetentionConfig,
    #[serde(default)]
    pub disposal: DisposalConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            database_path: None,
            sweep: SweepConfig::default(),
            retention: RetentionConfig::default(),
            disposal: DisposalConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Resolves the database file, expanding a leading `~/`.
    pub fn resolved_database_path(&self) -> Option<PathBuf> {
        match &self.database_path {
            Some(path) => match path.strip_prefix("~/") {
                Some(rest) => dirs::home_dir().map(|h| h.join(rest)),
                None => Some(PathBuf::from(path)),
            },
            None => default_database_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Move Active records past their total retention to Scheduled for Disposal.
    #[serde(default = "default_true")]
    pub schedule_disposals: bool,
    #[serde(default = "default_true")]
    pub run_on_start: bool,
}

fn default_interval_secs() -> u64 {
    24 * 60 * 60
}

fn default_true() -> bool {
    true
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            schedule_disposals: true,
            run_on_start: true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetentionConfig {
    #[serde(default)]
    pub bare_years_policy: BareYearsPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisposalConfig {
    #[serde(default = "default_remarks_min_len")]
    pub reject_remarks_min_len: usize,
}

fn default_remarks_min_len() -> usize {
    DEFAULT_REJECT_REMARKS_MIN_LEN
}

impl Default for DisposalConfig {
    fn default() -> Self {
        Self {
            reject_remarks_min_len: DEFAULT_REJECT_REMARKS_MIN_LEN,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Emit JSON log lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}
