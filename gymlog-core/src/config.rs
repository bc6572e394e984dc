//! Environment driven configuration shared by the CLI and the server.

use std::env;
use std::path::PathBuf;

use log::LevelFilter;

use crate::errors::{GymError, Result};
use crate::logging::parse_level;

pub const DATABASE_URL: &str = "DATABASE_URL";
pub const EXPORT_DIR: &str = "GYMLOG_EXPORT_DIR";
pub const BIND_ADDR: &str = "GYMLOG_BIND_ADDR";
pub const LOG_LEVEL: &str = "GYMLOG_LOG";

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5000";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub export_dir: PathBuf,
    pub bind_addr: String,
    pub log_level: LevelFilter,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup(DATABASE_URL)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| {
                GymError::Config(format!(
                    "{DATABASE_URL} must be specified or present in the environment"
                ))
            })?;

        let log_level = match lookup(LOG_LEVEL) {
            Some(raw) => parse_level(&raw)
                .ok_or_else(|| GymError::Config(format!("unknown log level '{raw}'")))?,
            None => LevelFilter::Info,
        };

        Ok(Self {
            database_url,
            export_dir: lookup(EXPORT_DIR)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),
            bind_addr: lookup(BIND_ADDR).unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            log_level,
        })
    }
}
