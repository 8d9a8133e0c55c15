#![forbid(unsafe_code)]

use motion_core::MotionVersion;
use motion_core::ids::{CategoryId, MotionId, StateId};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommitAction {
    Skipped,
    Appended,
    Rewritten,
}

impl CommitAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Skipped => "skipped",
            Self::Appended => "appended",
            Self::Rewritten => "rewritten",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitOutcome {
    pub motion_id: MotionId,
    pub revision: i64,
    pub action: CommitAction,
    pub version: Option<MotionVersion>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MotionSummary {
    pub id: MotionId,
    pub state_id: StateId,
    pub identifier: Option<String>,
    pub category: Option<CategoryId>,
    pub title: Option<String>,
    pub version_count: usize,
}
