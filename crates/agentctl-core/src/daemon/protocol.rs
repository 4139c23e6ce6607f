//! Socket protocol.
//!
//! A request is a bare command word terminated by a newline or EOF. The reply
//! is a single JSON document.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::state::DaemonStatus;
use crate::updates::UpdateHint;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    Status,
    Updates,
    Check,
    Stop,
}

impl Request {
    pub fn as_str(self) -> &'static str {
        match self {
            Request::Status => "status",
            Request::Updates => "updates",
            Request::Check => "check",
            Request::Stop => "stop",
        }
    }
}

impl FromStr for Request {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "status" => Ok(Request::Status),
            "updates" => Ok(Request::Updates),
            "check" => Ok(Request::Check),
            "stop" => Ok(Request::Stop),
            other => anyhow::bail!("Unknown daemon command: '{}'", other),
        }
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub ok: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<DaemonStatus>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updates: Option<Vec<UpdateHint>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Response {
    fn ok() -> Self {
        Self {
            ok: true,
            status: None,
            updates: None,
            message: None,
            error: None,
        }
    }

    pub fn status(status: DaemonStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::ok()
        }
    }

    pub fn updates(updates: Vec<UpdateHint>) -> Self {
        Self {
            updates: Some(updates),
            ..Self::ok()
        }
    }

    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::ok()
        }
    }

    pub fn error(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: Some(error.into()),
            ..Self::ok()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!("status\n".parse::<Request>().unwrap(), Request::Status);
        assert_eq!(" stop ".parse::<Request>().unwrap(), Request::Stop);
        assert!("restart".parse::<Request>().is_err());
    }

    #[test]
    fn test_error_response_shape() {
        let value = serde_json::to_value(Response::error("boom")).unwrap();
        assert_eq!(value, serde_json::json!({ "ok": false, "error": "boom" }));
    }
}
