#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

macro_rules! surrogate_id {
    ($name:ident) => {
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            pub fn new(value: i64) -> Self {
                Self(value)
            }

            pub fn get(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

surrogate_id!(MotionId);
surrogate_id!(VersionId);
surrogate_id!(CategoryId);
surrogate_id!(PollId);
surrogate_id!(CommentId);

const MAX_PERSON_REF_LEN: usize = 255;
const MAX_STATE_ID_LEN: usize = 3;

/// Opaque reference to a person owned by an external identity directory.
/// Only compared and stored here.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PersonRef(String);

impl PersonRef {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn try_new(value: impl Into<String>) -> Result<Self, PersonRefError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(PersonRefError::Empty);
        }
        if trimmed.chars().count() > MAX_PERSON_REF_LEN {
            return Err(PersonRefError::TooLong);
        }
        if trimmed.chars().any(|c| c.is_control()) {
            return Err(PersonRefError::ContainsControl);
        }
        Ok(Self(trimmed.to_string()))
    }
}

impl TryFrom<String> for PersonRef {
    type Error = PersonRefError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::try_new(value)
    }
}

impl From<PersonRef> for String {
    fn from(value: PersonRef) -> Self {
        value.0
    }
}

impl fmt::Display for PersonRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum PersonRefError {
    #[error("person reference must not be empty")]
    Empty,
    #[error("person reference is too long")]
    TooLong,
    #[error("person reference contains control characters")]
    ContainsControl,
}

/// Short token naming a workflow state (`pub`, `per`, ...).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StateId(String);

impl StateId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn try_new(value: impl Into<String>) -> Result<Self, StateIdError> {
        let value = value.into();
        validate_state_id(&value)?;
        Ok(Self(value))
    }

    pub(crate) fn from_static(value: &'static str) -> Self {
        Self(value.to_string())
    }
}

impl Borrow<str> for StateId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for StateId {
    type Error = StateIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::try_new(value)
    }
}

impl From<StateId> for String {
    fn from(value: StateId) -> Self {
        value.0
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum StateIdError {
    #[error("state id must not be empty")]
    Empty,
    #[error("state id must be at most 3 characters")]
    TooLong,
    #[error("state id contains whitespace or control characters")]
    InvalidChar,
    #[error("state id `default` is reserved")]
    Reserved,
}

fn validate_state_id(value: &str) -> Result<(), StateIdError> {
    if value.is_empty() {
        return Err(StateIdError::Empty);
    }
    if value == crate::workflow::DEFAULT_TOKEN {
        return Err(StateIdError::Reserved);
    }
    if value.chars().count() > MAX_STATE_ID_LEN {
        return Err(StateIdError::TooLong);
    }
    if value.chars().any(|c| c.is_control() || c.is_whitespace()) {
        return Err(StateIdError::InvalidChar);
    }
    Ok(())
}
