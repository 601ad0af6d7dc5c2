// src/config/validate.rs

use crate::config::model::{ConfigFile, ExecutorConfig, RawConfigFile};
use crate::errors::{Result, ScheduleError};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = ScheduleError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_executor(&raw.executor)?;
        Ok(ConfigFile::new_unchecked(raw.executor))
    }
}

fn validate_executor(cfg: &ExecutorConfig) -> Result<()> {
    if cfg.event_buffer == 0 {
        return Err(ScheduleError::Config(
            "[executor].event_buffer must be >= 1 (got 0)".to_string(),
        ));
    }

    if cfg.max_concurrency == Some(0) {
        return Err(ScheduleError::Config(
            "[executor].max_concurrency must be >= 1 when set (got 0)".to_string(),
        ));
    }

    Ok(())
}
