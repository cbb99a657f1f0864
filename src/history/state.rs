use serde::{Deserialize, Serialize};

/// Lifecycle of one pipeline run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum State {
    Started,
    Completed,
    Failed,
}

impl State {
    pub fn as_str(&self) -> &str {
        match self {
            State::Started => "Started",
            State::Completed => "Completed",
            State::Failed => "Failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "started" => Some(State::Started),
            "completed" => Some(State::Completed),
            "failed" => Some(State::Failed),
            _ => None,
        }
    }
}
