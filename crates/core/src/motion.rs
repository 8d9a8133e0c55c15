#![forbid(unsafe_code)]

use crate::error::MotionError;
use crate::ids::{CategoryId, MotionId, StateId, VersionId};
use crate::staged::{Staged, StagedEdits};
use crate::version::{Field, MotionVersion, VersionSnapshot, VersioningPolicy};
use crate::workflow::{DEFAULT_TOKEN, State, WorkflowRegistry};

/// Persisted columns of a motion row.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MotionRecord {
    pub id: Option<MotionId>,
    pub revision: i64,
    pub state_id: Option<StateId>,
    pub identifier: Option<String>,
    pub category: Option<CategoryId>,
    pub master: Option<MotionId>,
    pub permitted_version: Option<VersionId>,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

/// What a commit has to do with the ledger.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CommitPlan {
    Skip,
    Append(VersionSnapshot),
    Rewrite {
        version_id: VersionId,
        snapshot: VersionSnapshot,
    },
}

/// In-memory motion: the persisted record, staged edits and cached versions.
///
/// Setters only buffer. Nothing reaches storage until the store commits the
/// motion, which consults [`Motion::plan_commit`].
#[derive(Clone, Debug, Default)]
pub struct Motion {
    record: MotionRecord,
    edits: StagedEdits,
    force_new_version: bool,
    last_version: Option<MotionVersion>,
    selected_version: Option<MotionVersion>,
}

impl Motion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_record(record: MotionRecord, last_version: Option<MotionVersion>) -> Self {
        Self {
            record,
            last_version,
            ..Self::default()
        }
    }

    pub fn id(&self) -> Option<MotionId> {
        self.record.id
    }

    pub fn record(&self) -> &MotionRecord {
        &self.record
    }

    pub fn revision(&self) -> i64 {
        self.record.revision
    }

    pub fn state_id(&self) -> Option<&StateId> {
        self.record.state_id.as_ref()
    }

    pub fn identifier(&self) -> Option<&str> {
        self.record.identifier.as_deref()
    }

    pub fn set_identifier(&mut self, identifier: Option<String>) {
        self.record.identifier = identifier
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
    }

    pub fn category(&self) -> Option<CategoryId> {
        self.record.category
    }

    pub fn set_category(&mut self, category: Option<CategoryId>) {
        self.record.category = category;
    }

    pub fn master(&self) -> Option<MotionId> {
        self.record.master
    }

    pub fn set_master(&mut self, master: Option<MotionId>) {
        self.record.master = master;
    }

    pub fn permitted_version(&self) -> Option<VersionId> {
        self.record.permitted_version
    }

    pub fn set_permitted_version(&mut self, version: Option<VersionId>) {
        self.record.permitted_version = version;
    }

    pub fn title(&self) -> &str {
        self.resolve(Field::Title).unwrap_or_default()
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.edits.title = Staged::Set(title.into());
    }

    pub fn text(&self) -> &str {
        self.resolve(Field::Text).unwrap_or_default()
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.edits.text = Staged::Set(text.into());
    }

    pub fn reason(&self) -> Option<&str> {
        self.resolve(Field::Reason)
    }

    pub fn set_reason(&mut self, reason: Option<String>) {
        self.edits.reason = Staged::Set(reason);
    }

    pub fn staged(&self) -> &StagedEdits {
        &self.edits
    }

    fn resolve(&self, field: Field) -> Option<&str> {
        self.edits
            .resolve(field, self.effective_version().map(|v| &v.content))
    }

    /// Forces the next commit to append a version even if nothing changed.
    pub fn request_new_version(&mut self) {
        self.force_new_version = true;
    }

    pub fn new_version_requested(&self) -> bool {
        self.force_new_version
    }

    pub fn last_version(&self) -> Option<&MotionVersion> {
        self.last_version.as_ref()
    }

    pub fn selected_version(&self) -> Option<&MotionVersion> {
        self.selected_version.as_ref()
    }

    /// The version getters read from: the selected one, else the newest.
    pub fn effective_version(&self) -> Option<&MotionVersion> {
        self.selected_version.as_ref().or(self.last_version.as_ref())
    }

    pub fn select_by_handle(&mut self, version: MotionVersion) -> Result<(), MotionError> {
        let Some(id) = self.record.id else {
            return Err(MotionError::Validation(
                "cannot select a version of an unsaved motion",
            ));
        };
        if version.motion_id != id {
            return Err(MotionError::Validation(
                "version belongs to a different motion",
            ));
        }
        self.selected_version = Some(version);
        Ok(())
    }

    pub fn clear_version_selection(&mut self) {
        self.selected_version = None;
    }

    /// Decides what the commit writes. Untouched fields carry forward from
    /// the newest version, never from the selected one.
    pub fn plan_commit(&self, policy: VersioningPolicy) -> CommitPlan {
        let last = self.last_version.as_ref();
        let base = last.map(|v| &v.content);
        let dirty = self.edits.differs_from(base);

        if !dirty && !self.force_new_version {
            return CommitPlan::Skip;
        }

        let snapshot = self.edits.snapshot_over(base);
        match (last, self.force_new_version, policy) {
            (Some(last), false, VersioningPolicy::UpdateExisting) => CommitPlan::Rewrite {
                version_id: last.id,
                snapshot,
            },
            _ => CommitPlan::Append(snapshot),
        }
    }

    /// Tolerant read: an unset or unknown state id yields `None`.
    pub fn state<'r>(&self, registry: &'r WorkflowRegistry) -> Option<&'r State> {
        let state_id = self.record.state_id.as_ref()?;
        registry.resolve(state_id.as_str()).ok()
    }

    pub fn set_state(
        &mut self,
        registry: &WorkflowRegistry,
        next: &str,
    ) -> Result<(), MotionError> {
        let next = registry.resolve(next)?;
        let Some(current) = self.state(registry) else {
            return Err(MotionError::WorkflowTransition {
                from: self.record.state_id.clone(),
                to: next.id().clone(),
            });
        };
        if !current.allows(next.id()) {
            return Err(MotionError::WorkflowTransition {
                from: Some(current.id().clone()),
                to: next.id().clone(),
            });
        }
        self.record.state_id = Some(next.id().clone());
        Ok(())
    }

    /// Moves to the entry state without consulting the transition graph.
    pub fn reset_state(&mut self, registry: &WorkflowRegistry) {
        self.record.state_id = Some(registry.default_state().id().clone());
    }

    /// Fills in the default state for a fresh motion and rejects stale ids.
    pub fn ensure_state(&mut self, registry: &WorkflowRegistry) -> Result<StateId, MotionError> {
        let token = match &self.record.state_id {
            Some(state_id) => state_id.as_str(),
            None => DEFAULT_TOKEN,
        };
        let state_id = registry.resolve(token)?.id().clone();
        self.record.state_id = Some(state_id.clone());
        Ok(state_id)
    }

    pub fn refresh_last_version(&mut self, last_version: Option<MotionVersion>) {
        self.last_version = last_version;
    }

    /// Records a successful base-row write.
    pub fn mark_saved(
        &mut self,
        id: MotionId,
        revision: i64,
        created_at_ms: i64,
        updated_at_ms: i64,
    ) {
        self.record.id = Some(id);
        self.record.revision = revision;
        self.record.created_at_ms = created_at_ms;
        self.record.updated_at_ms = updated_at_ms;
    }

    /// Records a version write: staged edits and the force flag are consumed.
    pub fn mark_version_written(&mut self, version: MotionVersion) {
        self.edits.clear();
        self.force_new_version = false;
        if self
            .selected_version
            .as_ref()
            .is_some_and(|selected| selected.id == version.id)
        {
            self.selected_version = Some(version.clone());
        }
        self.last_version = Some(version);
    }
}
