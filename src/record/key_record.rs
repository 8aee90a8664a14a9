//! The persisted key record and the partial update applied by recovery.
//!
//! On disk (or in any document store) the record is a single JSON object:
//!
//! ```json
//! {
//!   "userWrapped": "<base64 envelope>",
//!   "recoveryWrapped": "<base64 envelope>",
//!   "createdAt": "2026-10-18T09:00:00Z",
//!   "updatedAt": "2026-10-18T09:00:00Z"
//! }
//! ```
//!
//! Both wrapped fields are optional in the type so that a record stripped
//! of one copy can still be read and reported precisely, instead of
//! failing as a parse error.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Both wrapped copies of the master key plus informational timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyRecord {
    /// MK wrapped under the current user password.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_wrapped: Option<String>,

    /// MK wrapped under the server recovery secret.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recovery_wrapped: Option<String>,

    /// When the domain was provisioned.
    pub created_at: DateTime<Utc>,

    /// When either wrapped copy last changed.
    pub updated_at: DateTime<Utc>,
}

impl KeyRecord {
    /// Build a freshly provisioned record with both copies present.
    pub fn new(user_wrapped: String, recovery_wrapped: String) -> Self {
        let now = Utc::now();
        Self {
            user_wrapped: Some(user_wrapped),
            recovery_wrapped: Some(recovery_wrapped),
            created_at: now,
            updated_at: now,
        }
    }

    /// The user-wrapped copy, if present and non-empty.
    pub fn user_wrapped(&self) -> Option<&str> {
        non_empty(self.user_wrapped.as_deref())
    }

    /// The recovery-wrapped copy, if present and non-empty.
    pub fn recovery_wrapped(&self) -> Option<&str> {
        non_empty(self.recovery_wrapped.as_deref())
    }

    /// Whether this record counts as "set up" for the status endpoint.
    pub fn is_setup(&self) -> bool {
        self.user_wrapped().is_some()
    }

    /// Apply a patch in place, bumping `updated_at` but never `created_at`.
    pub fn apply(&mut self, patch: KeyRecordPatch) {
        if let Some(user_wrapped) = patch.user_wrapped {
            self.user_wrapped = Some(user_wrapped);
        }
        if let Some(recovery_wrapped) = patch.recovery_wrapped {
            self.recovery_wrapped = Some(recovery_wrapped);
        }
        self.updated_at = Utc::now();
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.trim().is_empty())
}

/// Fields to overwrite on an existing record. `None` leaves a field alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyRecordPatch {
    pub user_wrapped: Option<String>,
    pub recovery_wrapped: Option<String>,
}

impl KeyRecordPatch {
    /// Patch that replaces only the user-wrapped copy.
    pub fn user_wrapped(wrapped: String) -> Self {
        Self {
            user_wrapped: Some(wrapped),
            recovery_wrapped: None,
        }
    }
}
