use clap::ValueEnum;
use serde::Serialize;

use crate::error::Result;
use crate::probe::{self, CapabilityLevel};

/// Symbol invoked when none is configured.
pub const DEFAULT_SYMBOL: &str = "sample_function";

/// Value the default symbol is expected to return.
pub const DEFAULT_EXPECTED: i32 = 123;

/// How the backing primitive is chosen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyPreference {
    /// Probe the kernel version.
    #[default]
    Auto,
    /// Force `memfd_create`.
    Memfd,
    /// Force a named `/dev/shm` object.
    Shm,
}

impl StrategyPreference {
    pub fn select(self) -> Result<CapabilityLevel> {
        match self {
            StrategyPreference::Auto => probe::probe(),
            StrategyPreference::Memfd => Ok(CapabilityLevel::AnonymousMemFd),
            StrategyPreference::Shm => Ok(CapabilityLevel::NamedSharedMemory),
        }
    }
}

/// Options for a single load-and-invoke run.
#[derive(Debug, Clone)]
pub struct Settings {
    pub strategy: StrategyPreference,
    /// Export to resolve and call.
    pub symbol: String,
    /// Sentinel the export should return; `None` disables the check.
    pub expected: Option<i32>,
    /// Name for the backing resource; synthesized from the clock when unset.
    pub resource_name: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            strategy: StrategyPreference::Auto,
            symbol: DEFAULT_SYMBOL.to_string(),
            expected: Some(DEFAULT_EXPECTED),
            resource_name: None,
        }
    }
}
