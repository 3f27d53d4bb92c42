//! Runtime configuration (SPEC_FULL.md §10).
//!
//! Grounded on `examples/appujet-baja/src/configs/base.rs`'s `Config::load`:
//! read a TOML file from the working directory if present, fall back to
//! defaults otherwise. Structured with `serde` + `toml`, as the teacher does,
//! but a missing or malformed file is not fatal here — every part of this
//! codec has a sane default.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// The codec's tunable limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Ceiling on a single length-delimited frame's payload, enforced
    /// before the payload is read so a corrupt length prefix can't force
    /// an unbounded allocation.
    pub max_payload_len: u64,
    /// Bound on each repeated field's channel (SPEC_FULL.md §5).
    pub channel_capacity: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_payload_len: 64 * 1024 * 1024,
            channel_capacity: crate::message::DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

/// Logging knobs (SPEC_FULL.md §11).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level when no `filters` override applies.
    pub level: String,
    /// Additional `tracing_subscriber::EnvFilter` directives, e.g.
    /// `"pbstream::decode=debug"`.
    pub filters: Vec<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            filters: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub limits: Limits,
    pub logging: LoggingConfig,
}

impl Config {
    /// Loads `pbstream.toml` from the current working directory. Missing
    /// file or malformed TOML both fall back to [`Config::default`]; only
    /// an I/O error other than "not found" is propagated.
    pub fn load() -> std::io::Result<Self> {
        Self::load_from(Path::new("pbstream.toml"))
    }

    pub fn load_from(path: &Path) -> std::io::Result<Self> {
        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(e),
        };

        match toml::from_str(&contents) {
            Ok(config) => Ok(config),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "malformed config, using defaults");
                Ok(Self::default())
            }
        }
    }
}
