#![forbid(unsafe_code)]

use super::StoreError;
use motion_core::ids::MotionId;
use motion_core::{GatedAction, MotionError, State, WorkflowRegistry};
use rusqlite::{Connection, OptionalExtension, params};

/// Reads the persisted state of a motion and checks its capability flag for
/// `action`. Callers run this inside the transaction that performs the action.
pub(super) fn require_capability_tx<'r>(
    conn: &Connection,
    registry: &'r WorkflowRegistry,
    motion_id: MotionId,
    action: GatedAction,
) -> Result<&'r State, StoreError> {
    let state_id = conn
        .query_row(
            "SELECT state_id FROM motions WHERE id=?1",
            params![motion_id.get()],
            |row| row.get::<_, String>(0),
        )
        .optional()?
        .ok_or(StoreError::UnknownId)?;

    let Ok(state) = registry.resolve(&state_id) else {
        tracing::warn!(
            motion_id = motion_id.get(),
            state_id = %state_id,
            "motion has a state unknown to the workflow"
        );
        return Err(MotionError::StateCapability {
            action,
            state: state_id,
        }
        .into());
    };

    let allowed = match action {
        GatedAction::Support | GatedAction::Unsupport => state.support(),
        GatedAction::CreatePoll => state.poll(),
    };
    if !allowed {
        return Err(MotionError::StateCapability {
            action,
            state: state.name().to_string(),
        }
        .into());
    }
    Ok(state)
}
