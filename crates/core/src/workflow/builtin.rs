#![forbid(unsafe_code)]

use super::{State, StateConfig, WorkflowConfig, WorkflowRegistry};
use crate::ids::StateId;
use std::collections::BTreeMap;

const DEFAULT_STATE: &str = "pub";

// id, name, support, poll, next states
const STATES: &[(&str, &str, bool, bool, &[&str])] = &[
    ("pub", "published", true, false, &["per", "wd", "nd"]),
    (
        "per",
        "permitted",
        false,
        true,
        &["acc", "rej", "wd", "adj", "rev", "nd"],
    ),
    ("acc", "accepted", false, false, &[]),
    ("rej", "rejected", false, false, &[]),
    ("wd", "withdrawn", false, false, &[]),
    ("adj", "adjourned", false, false, &["per"]),
    ("rev", "revised", false, false, &["per"]),
    ("nd", "not decided", false, false, &["per"]),
];

pub(super) fn registry() -> WorkflowRegistry {
    let states = STATES
        .iter()
        .map(|&(id, name, support, poll, next)| {
            let id = StateId::from_static(id);
            let state = State {
                id: id.clone(),
                name: name.to_string(),
                support,
                poll,
                next_states: next.iter().copied().map(StateId::from_static).collect(),
            };
            (id, state)
        })
        .collect::<BTreeMap<_, _>>();

    WorkflowRegistry {
        states,
        default: StateId::from_static(DEFAULT_STATE),
    }
}

/// The standard motion workflow in its authoring format.
pub fn builtin_config() -> WorkflowConfig {
    WorkflowConfig {
        default: DEFAULT_STATE.to_string(),
        states: STATES
            .iter()
            .map(|&(id, name, support, poll, next)| StateConfig {
                id: id.to_string(),
                name: name.to_string(),
                support,
                poll,
                next: next.iter().map(|s| s.to_string()).collect(),
            })
            .collect(),
    }
}
