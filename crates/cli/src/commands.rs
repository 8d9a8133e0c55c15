#![forbid(unsafe_code)]

use crate::args::Command;
use crate::config::MotionConfig;
use crate::error::CliError;
use motion_core::ids::{CategoryId, MotionId, PersonRef};
use motion_core::poll::MotionPoll;
use motion_core::{Motion, MotionVersion, WorkflowRegistry};
use motion_storage::{CommitOutcome, CreateCategoryRequest, SqliteStore};
use serde_json::{Value, json};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// One open store plus the settings every command runs under.
pub(crate) struct Session {
    pub(crate) store: SqliteStore,
    pub(crate) registry: WorkflowRegistry,
    pub(crate) config: MotionConfig,
}

impl Session {
    pub(crate) fn run(&mut self, command: Command) -> Result<Value, CliError> {
        match command {
            Command::Create {
                title,
                text,
                reason,
                identifier,
                category,
            } => {
                let mut motion = Motion::new();
                motion.set_title(title);
                motion.set_text(text);
                if reason.is_some() {
                    motion.set_reason(reason);
                }
                motion.set_identifier(identifier);
                motion.set_category(category.map(CategoryId::new));
                self.commit(motion)
            }
            Command::Edit {
                id,
                title,
                text,
                reason,
                new_version,
            } => {
                let mut motion = self.store.load_motion(id)?;
                if let Some(title) = title {
                    motion.set_title(title);
                }
                if let Some(text) = text {
                    motion.set_text(text);
                }
                if let Some(reason) = reason {
                    // An empty reason clears it.
                    let reason = Some(reason).filter(|r| !r.trim().is_empty());
                    motion.set_reason(reason);
                }
                if new_version {
                    motion.request_new_version();
                }
                self.commit(motion)
            }
            Command::Show { id, version } => {
                let mut motion = self.store.load_motion(id)?;
                if let Some(ordinal) = version {
                    self.store.select_version_by_ordinal(&mut motion, ordinal)?;
                }
                let mut out = self.motion_json(&motion)?;
                out["supporters"] = json!(self.store.supporters(id)?);
                out["submitters"] = json!(self.store.submitters(id)?);
                Ok(out)
            }
            Command::Versions { id } => {
                self.store.load_motion(id)?;
                let ledger = self.store.ledger(id);
                let versions = ledger
                    .all()?
                    .iter()
                    .enumerate()
                    .map(|(index, version)| version_json(version, index + 1))
                    .collect::<Vec<_>>();
                Ok(json!({ "motion_id": id, "versions": versions }))
            }
            Command::State { id, next } => {
                let mut motion = self.store.load_motion(id)?;
                motion.set_state(&self.registry, &next)?;
                self.commit(motion)
            }
            Command::ResetState { id } => {
                let mut motion = self.store.load_motion(id)?;
                motion.reset_state(&self.registry);
                self.commit(motion)
            }
            Command::Support { id, person } => {
                let person = person_ref(person)?;
                let changed = self.store.support(&self.registry, id, &person)?;
                self.membership_json(id, &person, changed)
            }
            Command::Unsupport { id, person } => {
                let person = person_ref(person)?;
                let changed = self.store.unsupport(&self.registry, id, &person)?;
                self.membership_json(id, &person, changed)
            }
            Command::Poll { id } => {
                let poll = self.store.create_poll(&self.registry, id)?;
                self.poll_json(&poll)
            }
            Command::Polls { id } => {
                let polls = self
                    .store
                    .polls(id)?
                    .iter()
                    .map(|poll| self.poll_json(poll))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(json!({ "motion_id": id, "polls": polls }))
            }
            Command::Vote { id, number, counts } => {
                let poll = self.find_poll(id, number)?;
                self.store.record_votes(poll.id, counts)?;
                let mut out = self.poll_json(&poll)?;
                out["votes"] = serde_json::to_value(self.store.vote_counts(poll.id)?)?;
                Ok(out)
            }
            Command::Result { id, number } => {
                let poll = self.find_poll(id, number)?;
                let tally = self.store.poll_result(poll.id, &self.config.counting)?;
                let mut out = self.poll_json(&poll)?;
                out["result"] = serde_json::to_value(tally)?;
                out["yes_share"] = json!(tally.yes_share());
                Ok(out)
            }
            Command::Category { name, prefix } => {
                let category = self
                    .store
                    .create_category(CreateCategoryRequest { name, prefix })?;
                Ok(serde_json::to_value(category)?)
            }
            Command::Workflow => Ok(json!({
                "versioning": self.config.versioning,
                "counting": self.config.counting,
                "workflow": self.registry.to_config(),
            })),
        }
    }

    fn commit(&mut self, mut motion: Motion) -> Result<Value, CliError> {
        let outcome =
            self.store
                .commit_motion(&mut motion, &self.registry, self.config.versioning)?;
        let mut out = self.motion_json(&motion)?;
        out["commit"] = self.outcome_json(&outcome)?;
        Ok(out)
    }

    fn motion_json(&self, motion: &Motion) -> Result<Value, CliError> {
        let state = motion.state(&self.registry).map(|state| {
            json!({
                "id": state.id(),
                "name": state.name(),
                "next_states": state.next_states(),
            })
        });
        let version = match (motion.id(), motion.effective_version()) {
            (Some(id), Some(version)) => Some(self.store.ledger(id).version_number(version)?),
            _ => None,
        };
        let record = motion.record();
        Ok(json!({
            "id": motion.id(),
            "revision": motion.revision(),
            "identifier": motion.identifier(),
            "state": state,
            "category": motion.category(),
            "master": motion.master(),
            "permitted_version": motion.permitted_version(),
            "version": version,
            "title": motion.title(),
            "text": motion.text(),
            "reason": motion.reason(),
            "created_at": ts_ms_to_rfc3339(record.created_at_ms),
            "updated_at": ts_ms_to_rfc3339(record.updated_at_ms),
        }))
    }

    fn outcome_json(&self, outcome: &CommitOutcome) -> Result<Value, CliError> {
        let version = match &outcome.version {
            Some(version) => Some(
                self.store
                    .ledger(outcome.motion_id)
                    .version_number(version)?,
            ),
            None => None,
        };
        Ok(json!({
            "action": outcome.action.as_str(),
            "revision": outcome.revision,
            "version": version,
        }))
    }

    fn membership_json(
        &self,
        id: MotionId,
        person: &PersonRef,
        changed: bool,
    ) -> Result<Value, CliError> {
        Ok(json!({
            "motion_id": id,
            "person": person,
            "changed": changed,
            "supporters": self.store.supporters(id)?,
        }))
    }

    fn poll_json(&self, poll: &MotionPoll) -> Result<Value, CliError> {
        Ok(json!({
            "id": poll.id,
            "motion_id": poll.motion_id,
            "number": poll.poll_number,
            "ballot": self.store.ballot(poll)?,
            "votes_cast": poll.votes_cast,
            "votes_invalid": poll.votes_invalid,
            "created_at": ts_ms_to_rfc3339(poll.created_at_ms),
        }))
    }

    fn find_poll(&self, id: MotionId, number: i64) -> Result<MotionPoll, CliError> {
        self.store
            .poll(id, number)?
            .ok_or_else(|| CliError::NotFound(format!("poll {number} of motion {id}")))
    }
}

fn version_json(version: &MotionVersion, number: usize) -> Value {
    json!({
        "id": version.id,
        "number": number,
        "title": version.content.title,
        "text": version.content.text,
        "reason": version.content.reason,
        "created_at": ts_ms_to_rfc3339(version.created_at_ms),
    })
}

fn person_ref(raw: String) -> Result<PersonRef, CliError> {
    PersonRef::try_new(raw).map_err(|err| CliError::Usage(err.to_string()))
}

pub(crate) fn ts_ms_to_rfc3339(ts_ms: i64) -> String {
    let nanos = i128::from(ts_ms) * 1_000_000;
    let dt = OffsetDateTime::from_unix_timestamp_nanos(nanos).unwrap_or(OffsetDateTime::UNIX_EPOCH);
    dt.format(&Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}
