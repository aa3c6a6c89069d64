//! Attribution for lifecycle operations.

use serde::{Deserialize, Serialize};

/// Actor id reserved for automated processes.
pub const SYSTEM_ACTOR_ID: i64 = 0;

/// Who performs an operation, passed explicitly into every workflow call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: i64,
    pub office_id: Option<i64>,
    pub role_id: Option<i64>,
}

impl Actor {
    /// The sweep job and other unattended processes.
    pub const fn system() -> Self {
        Self {
            id: SYSTEM_ACTOR_ID,
            office_id: None,
            role_id: None,
        }
    }

    pub fn user(id: i64, office_id: Option<i64>, role_id: Option<i64>) -> Self {
        Self {
            id,
            office_id,
            role_id,
        }
    }

    pub fn is_system(&self) -> bool {
        self.id == SYSTEM_ACTOR_ID
    }
}
