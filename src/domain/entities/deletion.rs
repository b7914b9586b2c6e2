use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Ordered steps of a user deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeletionStep {
    DeleteUserRecord,
    DeleteCreatedEvents,
    RemoveInvitee,
    DeleteBlobs,
}

impl DeletionStep {
    pub const ALL: [DeletionStep; 4] = [
        DeletionStep::DeleteUserRecord,
        DeletionStep::DeleteCreatedEvents,
        DeletionStep::RemoveInvitee,
        DeletionStep::DeleteBlobs,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DeletionStep::DeleteUserRecord => "delete_user_record",
            DeletionStep::DeleteCreatedEvents => "delete_created_events",
            DeletionStep::RemoveInvitee => "remove_invitee",
            DeletionStep::DeleteBlobs => "delete_blobs",
        }
    }

    /// Steps still to run, starting at `self`.
    pub fn remaining(self) -> impl Iterator<Item = DeletionStep> {
        Self::ALL.into_iter().filter(move |step| *step >= self)
    }
}

impl fmt::Display for DeletionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeletionStep {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|step| step.as_str() == s)
            .ok_or_else(|| format!("unknown deletion step: {s}"))
    }
}

/// Tombstone for a deletion that has started but not finished.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingDeletion {
    pub user_id: String,
    pub next_step: DeletionStep,
    pub attempts: u32,
    pub last_error: Option<String>,
    pub requested_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PendingDeletion {
    pub fn start(user_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        PendingDeletion {
            user_id: user_id.into(),
            next_step: DeletionStep::DeleteUserRecord,
            attempts: 0,
            last_error: None,
            requested_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletionReport {
    pub user_id: String,
    pub events_deleted: u64,
    pub events_rewritten: u64,
    pub blobs_deleted: u64,
    pub resumed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum DeletionStatus {
    None,
    Pending(PendingDeletion),
}
