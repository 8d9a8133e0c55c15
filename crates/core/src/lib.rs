#![forbid(unsafe_code)]

//! Domain model for motions: the workflow graph, staged edits, commit
//! planning against the version ledger, and poll tallying. No I/O lives here.

pub mod category;
pub mod error;
pub mod ids;
pub mod motion;
pub mod poll;
pub mod staged;
pub mod version;
pub mod workflow;

pub use error::{GatedAction, MotionError};
pub use motion::{CommitPlan, Motion, MotionRecord};
pub use version::{MotionVersion, VersionSnapshot, VersioningPolicy};
pub use workflow::{State, WorkflowRegistry};

#[cfg(test)]
mod tests;
