// src/error_info.rs

//! Serializable description of an error, suitable for storing in engine
//! events and for reporting from the monitoring loop.

use std::backtrace::BacktraceStatus;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{DefinitionError, MonitorError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializableErrorInfo {
    pub message: String,
    /// One frame per entry; empty when no backtrace was captured.
    pub stack: Vec<String>,
    pub cls_name: Option<String>,
    pub cause: Option<Box<SerializableErrorInfo>>,
}

impl SerializableErrorInfo {
    pub fn new(message: impl Into<String>, cls_name: Option<&str>) -> Self {
        Self {
            message: message.into(),
            stack: Vec::new(),
            cls_name: cls_name.map(str::to_string),
            cause: None,
        }
    }

    /// Convert an `anyhow` error, keeping its source chain as nested causes.
    pub fn from_error(err: &anyhow::Error) -> Self {
        let top: &(dyn std::error::Error + 'static) = err.as_ref();
        let mut info = Self::from_std(top);
        info.cls_name = Some(class_name_of(err).to_string());

        let backtrace = err.backtrace();
        if backtrace.status() == BacktraceStatus::Captured {
            info.stack = backtrace
                .to_string()
                .lines()
                .map(str::trim_end)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect();
        }
        info
    }

    fn from_std(err: &(dyn std::error::Error + 'static)) -> Self {
        Self {
            message: err.to_string(),
            stack: Vec::new(),
            cls_name: None,
            cause: err.source().map(|source| Box::new(Self::from_std(source))),
        }
    }

    /// The innermost cause, or `self` when there is none.
    pub fn root_cause(&self) -> &SerializableErrorInfo {
        match &self.cause {
            Some(cause) => cause.root_cause(),
            None => self,
        }
    }
}

fn class_name_of(err: &anyhow::Error) -> &'static str {
    if let Some(e) = err.downcast_ref::<MonitorError>() {
        e.class_name()
    } else if err.downcast_ref::<DefinitionError>().is_some() {
        "DefinitionError"
    } else if err.downcast_ref::<std::io::Error>().is_some() {
        "IoError"
    } else {
        "Error"
    }
}

impl fmt::Display for SerializableErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.cls_name {
            Some(cls) => write!(f, "{cls}: {}", self.message)?,
            None => f.write_str(&self.message)?,
        }
        for frame in &self.stack {
            write!(f, "\n{frame}")?;
        }
        if let Some(cause) = &self.cause {
            write!(
                f,
                "\n\nThe above error was caused by the following error:\n{cause}"
            )?;
        }
        Ok(())
    }
}

impl From<&anyhow::Error> for SerializableErrorInfo {
    fn from(err: &anyhow::Error) -> Self {
        Self::from_error(err)
    }
}
