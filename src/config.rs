//! Daemon configuration (`uplifter.toml`).
//!
//! ```toml
//! [store]
//! path = "uplifter-settings.json"
//!
//! [dispatch]
//! mode = "serial"        # or "concurrent"
//! queue_capacity = 16
//!
//! [logging]
//! level = "info"
//! json = false
//! ```
//!
//! Every field is optional.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uplift_engine::DispatchMode;

pub const DEFAULT_CONFIG_FILE: &str = "uplifter.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub store: StoreConfig,
    pub dispatch: DispatchConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// JSON settings document shared with `uplifter instance …`.
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("uplifter-settings.json"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DispatchModeName {
    #[default]
    Concurrent,
    Serial,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct DispatchConfig {
    pub mode: DispatchModeName,
    /// Per-instance queue size in serial mode.
    pub queue_capacity: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            mode: DispatchModeName::Concurrent,
            queue_capacity: 16,
        }
    }
}

impl DispatchConfig {
    pub fn dispatch_mode(&self) -> DispatchMode {
        match self.mode {
            DispatchModeName::Concurrent => DispatchMode::Concurrent,
            DispatchModeName::Serial => DispatchMode::SerialPerInstance {
                capacity: self.queue_capacity.max(1),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// `EnvFilter` directive; `RUST_LOG` wins when set.
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Load `path`, or `./uplifter.toml` when no path is given. Only an
    /// explicitly named file has to exist.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_FILE);
                if fallback.exists() {
                    Self::from_file(fallback)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("parsing config file {}", path.display()))
    }

    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(raw)?)
    }
}
