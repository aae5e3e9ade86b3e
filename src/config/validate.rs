// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{OpgraphError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = OpgraphError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.run_monitoring, raw.graph))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_run_monitoring(cfg)?;
    validate_graph_section(cfg)?;
    Ok(())
}

fn validate_run_monitoring(cfg: &RawConfigFile) -> Result<()> {
    let section = &cfg.run_monitoring;

    if section.poll_interval_seconds == 0 {
        return Err(OpgraphError::ConfigError(
            "[run_monitoring].poll_interval_seconds must be >= 1 (got 0)".to_string(),
        ));
    }

    if section.start_timeout_seconds == 0 {
        return Err(OpgraphError::ConfigError(
            "[run_monitoring].start_timeout_seconds must be >= 1 (got 0)".to_string(),
        ));
    }

    if section.max_runtime_seconds == 0 {
        return Err(OpgraphError::ConfigError(
            "[run_monitoring].max_runtime_seconds must be > 0 (got 0)".to_string(),
        ));
    }

    Ok(())
}

fn validate_graph_section(cfg: &RawConfigFile) -> Result<()> {
    if let Some(path) = &cfg.graph.document {
        if path.as_os_str().is_empty() {
            return Err(OpgraphError::ConfigError(
                "[graph].document must not be empty".to_string(),
            ));
        }
    }
    Ok(())
}
