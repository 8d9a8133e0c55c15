#![forbid(unsafe_code)]

use crate::ids::StateId;
use std::fmt;

/// Actions gated by per-state capability flags.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GatedAction {
    Support,
    Unsupport,
    CreatePoll,
}

impl GatedAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Support => "support",
            Self::Unsupport => "unsupport",
            Self::CreatePoll => "create a poll for",
        }
    }
}

impl fmt::Display for GatedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum MotionError {
    #[error("{to} is not a valid next state of {}", state_label(.from))]
    WorkflowTransition { from: Option<StateId>, to: StateId },
    #[error("you can not {action} a motion in state {state}")]
    StateCapability { action: GatedAction, state: String },
    #[error("unknown workflow state: {0}")]
    UnknownState(String),
    #[error("version ordinal {ordinal} is out of range (motion has {count} versions)")]
    Range { ordinal: usize, count: usize },
    #[error("validation failed: {0}")]
    Validation(&'static str),
}

fn state_label(state: &Option<StateId>) -> &str {
    state.as_ref().map(StateId::as_str).unwrap_or("<unset>")
}
