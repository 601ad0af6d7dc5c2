// src/config/model.rs

use serde::Deserialize;

/// Configuration as read from a TOML file, before validation.
///
/// ```toml
/// [executor]
/// max_concurrency = 4
/// event_buffer = 64
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    /// Worker pool settings from `[executor]`.
    #[serde(default)]
    pub executor: ExecutorConfig,
}

/// `[executor]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExecutorConfig {
    /// Upper bound on tasks running at the same time. Absent means every
    /// ready task runs at once.
    #[serde(default)]
    pub max_concurrency: Option<usize>,

    /// Capacity of the runtime event channel.
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

fn default_event_buffer() -> usize {
    64
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_concurrency: None,
            event_buffer: default_event_buffer(),
        }
    }
}

/// Validated configuration. Only obtainable through
/// `ConfigFile::try_from(RawConfigFile)` or [`ConfigFile::default`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFile {
    executor: ExecutorConfig,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(executor: ExecutorConfig) -> Self {
        Self { executor }
    }

    /// Runtime view used by [`Schedule::run_with`](crate::schedule::Schedule::run_with).
    pub fn executor_config(&self) -> &ExecutorConfig {
        &self.executor
    }
}
