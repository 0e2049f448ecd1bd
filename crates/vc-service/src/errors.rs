//! Lifecycle error types.
//!
//! Only authorization and lookup failures surface to callers. Transient
//! collaborator failures inside the state machine are logged where they
//! happen and never reach this type, except for provisioning where there
//! is no state to fall back on.

use crate::collaborators::CollaboratorError;
use common::types::{MemberId, RoomId};
use thiserror::Error;

/// Error returned by lifecycle controller operations.
///
/// Maps to HTTP status codes for the dashboard API:
/// - `PermissionDenied`: 403
/// - `SessionNotFound`, `RoomNotFound`: 404
/// - `UnknownTeam`, `NotInRoom`, `NotManaged`: 400
/// - `Collaborator`: 502
/// - `Internal`: 500
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// Requester is neither an administrator nor the session starter.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// No session is tracked for the room.
    #[error("No session for room {0}")]
    SessionNotFound(RoomId),

    /// Room is not present in the gateway cache.
    #[error("Room not found: {0}")]
    RoomNotFound(RoomId),

    /// Team label outside the closed set.
    #[error("Unknown team: {0}")]
    UnknownTeam(String),

    /// Member is not connected to the session's rooms.
    #[error("Member {member} is not in room {room}")]
    NotInRoom { member: MemberId, room: RoomId },

    /// Room is outside the managed category or is the base room.
    #[error("Room {0} is not managed")]
    NotManaged(RoomId),

    /// External side effect failed where no fallback exists.
    #[error("Collaborator error: {0}")]
    Collaborator(#[from] CollaboratorError),

    /// Actor channel failure.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl LifecycleError {
    /// HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            LifecycleError::PermissionDenied(_) => 403,
            LifecycleError::SessionNotFound(_) | LifecycleError::RoomNotFound(_) => 404,
            LifecycleError::UnknownTeam(_)
            | LifecycleError::NotInRoom { .. }
            | LifecycleError::NotManaged(_) => 400,
            LifecycleError::Collaborator(_) => 502,
            LifecycleError::Internal(_) => 500,
        }
    }

    /// User-facing message (no internal details).
    #[must_use]
    pub fn client_message(&self) -> String {
        match self {
            LifecycleError::PermissionDenied(_) => {
                "Only the session starter or an administrator can do that".to_string()
            }
            LifecycleError::SessionNotFound(_) => "No active session for this room".to_string(),
            LifecycleError::RoomNotFound(_) => "Room not found".to_string(),
            LifecycleError::UnknownTeam(label) => format!("Unknown team: {label}"),
            LifecycleError::NotInRoom { .. } => {
                "Join the voice room before using this command".to_string()
            }
            LifecycleError::NotManaged(_) => "This room is not managed".to_string(),
            LifecycleError::Collaborator(_) | LifecycleError::Internal(_) => {
                "An internal error occurred".to_string()
            }
        }
    }
}
