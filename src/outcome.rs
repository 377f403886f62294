use crate::error::PkiError;
use serde::Serialize;

/// Result of one invocation, reported as a single JSON object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Outcome {
    pub changed: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub failed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticket: Option<String>,
}

impl Outcome {
    pub fn changed(msg: impl Into<String>) -> Self {
        Outcome {
            changed: true,
            msg: Some(msg.into()),
            ..Default::default()
        }
    }

    pub fn unchanged(msg: impl Into<String>) -> Self {
        Outcome {
            msg: Some(msg.into()),
            ..Default::default()
        }
    }

    pub fn ticket(ticket: impl Into<String>) -> Self {
        Outcome {
            changed: true,
            ticket: Some(ticket.into()),
            ..Default::default()
        }
    }

    pub fn failed(msg: impl Into<String>) -> Self {
        Outcome {
            failed: true,
            msg: Some(msg.into()),
            ..Default::default()
        }
    }

    pub fn with_stdout(mut self, stdout: impl Into<String>) -> Self {
        self.stdout = Some(stdout.into());
        self
    }

    pub fn to_json(&self, pretty: bool) -> serde_json::Result<String> {
        if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        }
    }
}

impl From<PkiError> for Outcome {
    fn from(err: PkiError) -> Self {
        Outcome::failed(err.to_string())
    }
}
