#![forbid(unsafe_code)]

mod builtin;

use crate::error::MotionError;
use crate::ids::StateId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

pub use builtin::builtin_config;

/// Token that always resolves to the entry state of the graph.
pub const DEFAULT_TOKEN: &str = "default";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct State {
    id: StateId,
    name: String,
    support: bool,
    poll: bool,
    next_states: Vec<StateId>,
}

impl State {
    pub fn id(&self) -> &StateId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether supporters may be added or removed in this state.
    pub fn support(&self) -> bool {
        self.support
    }

    /// Whether polls may be created in this state.
    pub fn poll(&self) -> bool {
        self.poll
    }

    pub fn next_states(&self) -> &[StateId] {
        &self.next_states
    }

    pub fn allows(&self, next: &StateId) -> bool {
        self.next_states.contains(next)
    }
}

/// Authoring format of a workflow graph.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkflowConfig {
    pub default: String,
    pub states: Vec<StateConfig>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StateConfig {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub support: bool,
    #[serde(default)]
    pub poll: bool,
    #[serde(default)]
    pub next: Vec<String>,
}

/// Immutable state graph. Loaded once and shared read-only afterwards.
#[derive(Clone, Debug)]
pub struct WorkflowRegistry {
    states: BTreeMap<StateId, State>,
    default: StateId,
}

impl WorkflowRegistry {
    pub fn builtin() -> Self {
        builtin::registry()
    }

    pub fn from_config(config: WorkflowConfig) -> Result<Self, MotionError> {
        let mut states = BTreeMap::new();
        for state in &config.states {
            let id = StateId::try_new(state.id.as_str())
                .map_err(|_| MotionError::Validation("workflow state id is invalid"))?;
            if state.name.trim().is_empty() {
                return Err(MotionError::Validation("workflow state name must not be empty"));
            }
            if states.contains_key(&id) {
                return Err(MotionError::Validation("workflow state id is duplicated"));
            }

            let mut seen = BTreeSet::new();
            let mut next_states = Vec::with_capacity(state.next.len());
            for next in &state.next {
                let next = StateId::try_new(next.as_str())
                    .map_err(|_| MotionError::Validation("workflow edge target is invalid"))?;
                if seen.insert(next.clone()) {
                    next_states.push(next);
                }
            }

            states.insert(
                id.clone(),
                State {
                    id,
                    name: state.name.trim().to_string(),
                    support: state.support,
                    poll: state.poll,
                    next_states,
                },
            );
        }

        let default = StateId::try_new(config.default.as_str())
            .map_err(|_| MotionError::Validation("workflow default state is invalid"))?;
        if !states.contains_key(&default) {
            return Err(MotionError::Validation(
                "workflow default state is not declared",
            ));
        }
        if states
            .values()
            .flat_map(|state| state.next_states.iter())
            .any(|next| !states.contains_key(next))
        {
            return Err(MotionError::Validation(
                "workflow edge points at an undeclared state",
            ));
        }

        Ok(Self { states, default })
    }

    /// Looks up a state by id. `"default"` resolves to the entry state.
    pub fn resolve(&self, token: &str) -> Result<&State, MotionError> {
        let token = token.trim();
        if token == DEFAULT_TOKEN {
            return Ok(self.default_state());
        }
        self.states
            .get(token)
            .ok_or_else(|| MotionError::UnknownState(token.to_string()))
    }

    pub fn default_state(&self) -> &State {
        // from_config guarantees the default is present.
        &self.states[&self.default]
    }

    pub fn contains(&self, id: &StateId) -> bool {
        self.states.contains_key(id)
    }

    pub fn states(&self) -> impl Iterator<Item = &State> {
        self.states.values()
    }

    pub fn to_config(&self) -> WorkflowConfig {
        WorkflowConfig {
            default: self.default.as_str().to_string(),
            states: self
                .states
                .values()
                .map(|state| StateConfig {
                    id: state.id.as_str().to_string(),
                    name: state.name.clone(),
                    support: state.support,
                    poll: state.poll,
                    next: state
                        .next_states
                        .iter()
                        .map(|next| next.as_str().to_string())
                        .collect(),
                })
                .collect(),
        }
    }
}
