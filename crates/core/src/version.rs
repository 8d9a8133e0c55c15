#![forbid(unsafe_code)]

use crate::ids::{CommentId, MotionId, PersonRef, VersionId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Field {
    Title,
    Text,
    Reason,
}

impl Field {
    pub const ALL: [Field; 3] = [Field::Title, Field::Text, Field::Reason];
}

/// Content of one ledger entry.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionSnapshot {
    pub title: String,
    pub text: String,
    pub reason: Option<String>,
}

impl VersionSnapshot {
    pub fn field(&self, field: Field) -> Option<&str> {
        match field {
            Field::Title => Some(&self.title),
            Field::Text => Some(&self.text),
            Field::Reason => self.reason.as_deref(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MotionVersion {
    pub id: VersionId,
    pub motion_id: MotionId,
    #[serde(flatten)]
    pub content: VersionSnapshot,
    pub note: Option<String>,
    pub rejected: bool,
    pub created_at_ms: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Comment {
    pub id: CommentId,
    pub version_id: VersionId,
    pub author: PersonRef,
    pub text: String,
    pub created_at_ms: i64,
}

/// Whether a dirty commit appends to the ledger or rewrites its newest entry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum VersioningPolicy {
    #[default]
    #[serde(rename = "ALWAYS_CREATE_NEW_VERSION", alias = "always_new")]
    AlwaysNew,
    #[serde(rename = "NEVER_CREATE_NEW_VERSION", alias = "update_existing")]
    UpdateExisting,
}

impl VersioningPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AlwaysNew => "ALWAYS_CREATE_NEW_VERSION",
            Self::UpdateExisting => "NEVER_CREATE_NEW_VERSION",
        }
    }
}

impl fmt::Display for VersioningPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VersioningPolicy {
    type Err = &'static str;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "ALWAYS_CREATE_NEW_VERSION" | "always_new" => Ok(Self::AlwaysNew),
            "NEVER_CREATE_NEW_VERSION" | "update_existing" => Ok(Self::UpdateExisting),
            _ => Err("unknown versioning policy"),
        }
    }
}
