//! Stage domain model

use crate::core::state::StageState;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The three fixed stages of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageKind {
    /// Derive short SHA, branch tag and environment
    Prepare,
    /// Registry login and image build/push
    Build,
    /// Webhook dispatch
    Deploy,
}

impl StageKind {
    pub fn id(&self) -> &'static str {
        match self {
            StageKind::Prepare => "prepare",
            StageKind::Build => "build",
            StageKind::Deploy => "deploy",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// A single stage in a pipeline
#[derive(Debug, Clone)]
pub struct Stage {
    /// Unique stage identifier
    pub id: String,

    pub kind: StageKind,

    /// Stage IDs that must finish first
    pub needs: Vec<String>,

    /// Timeout in seconds
    pub timeout_secs: u64,

    /// Runtime state
    pub state: StageState,
}

impl Stage {
    pub fn new(kind: StageKind, needs: Vec<String>, timeout_secs: u64) -> Self {
        Self {
            id: kind.id().to_string(),
            kind,
            needs,
            timeout_secs,
            state: StageState::Pending,
        }
    }

    /// Build a stage that will not run
    pub fn disabled(kind: StageKind, needs: Vec<String>) -> Self {
        Self {
            state: StageState::Skipped {
                reason: "disabled".to_string(),
            },
            ..Self::new(kind, needs, 0)
        }
    }
}
