#![forbid(unsafe_code)]

use crate::error::CliError;
use motion_core::poll::CountingPolicy;
use motion_core::workflow::WorkflowConfig;
use motion_core::{VersioningPolicy, WorkflowRegistry};
use serde::Deserialize;
use std::path::Path;

pub(crate) const CONFIG_FILE_NAME: &str = "motions.yaml";

/// Process-wide settings, read once at startup.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct MotionConfig {
    pub(crate) versioning: VersioningPolicy,
    pub(crate) counting: CountingPolicy,
    pub(crate) workflow: Option<WorkflowConfig>,
}

impl MotionConfig {
    pub(crate) fn from_yaml(raw: &str) -> Result<Self, CliError> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(raw)?)
    }

    /// Explicit path first, then `motions.yaml` in the storage dir, then defaults.
    pub(crate) fn load(explicit: Option<&Path>, storage_dir: &Path) -> Result<Self, CliError> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let candidate = storage_dir.join(CONFIG_FILE_NAME);
                if !candidate.is_file() {
                    tracing::debug!(path = %candidate.display(), "no config file, using defaults");
                    return Ok(Self::default());
                }
                candidate
            }
        };
        let raw = std::fs::read_to_string(&path).map_err(|source| CliError::ConfigRead {
            path: path.clone(),
            source,
        })?;
        let config = Self::from_yaml(&raw)?;
        tracing::debug!(
            path = %path.display(),
            versioning = %config.versioning,
            custom_workflow = config.workflow.is_some(),
            "loaded config"
        );
        Ok(config)
    }

    pub(crate) fn registry(&self) -> Result<WorkflowRegistry, CliError> {
        match &self.workflow {
            Some(workflow) => Ok(WorkflowRegistry::from_config(workflow.clone())?),
            None => Ok(WorkflowRegistry::builtin()),
        }
    }
}
