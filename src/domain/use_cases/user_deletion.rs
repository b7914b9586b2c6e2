use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument, warn};

use crate::{
    entities::deletion::{DeletionReport, DeletionStatus, DeletionStep, PendingDeletion},
    errors::AppError,
    repositories::{
        blob::BlobRepository, deletion::DeletionLedger, event::EventRepository,
        user::UserRepository,
    },
};

/// Totals from one sweep over the pending-deletion ledger.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepSummary {
    pub completed: usize,
    pub failed: usize,
}

/// Removes a user and everything that hangs off them across the user, event
/// and blob stores. Progress is kept in a tombstone so an interrupted run can
/// be resumed from the step that failed.
#[derive(Clone)]
pub struct UserDeletionCoordinator {
    users: Arc<dyn UserRepository>,
    events: Arc<dyn EventRepository>,
    blobs: Arc<dyn BlobRepository>,
    ledger: Arc<dyn DeletionLedger>,
}

impl UserDeletionCoordinator {
    pub fn new(
        users: Arc<dyn UserRepository>,
        events: Arc<dyn EventRepository>,
        blobs: Arc<dyn BlobRepository>,
        ledger: Arc<dyn DeletionLedger>,
    ) -> Self {
        UserDeletionCoordinator { users, events, blobs, ledger }
    }

    #[instrument(skip(self))]
    pub async fn delete_user(&self, user_id: &str) -> Result<DeletionReport, AppError> {
        let user_id = user_id.trim();
        if user_id.is_empty() {
            return Err(AppError::invalid("id", "User id is required"));
        }

        let existing = self.ledger.get(user_id).await?;

        if self.users.get_user(user_id).await?.is_none() {
            return match existing {
                Some(pending) => {
                    info!(next_step = %pending.next_step, "Resuming pending deletion");
                    self.run(pending, true).await
                }
                None => Err(AppError::NotFound(format!("User {user_id} not found"))),
            };
        }

        let (pending, resumed) = match existing {
            Some(pending) => (self.restart_if_user_exists(pending).await?, true),
            None => {
                let pending = PendingDeletion::start(user_id, Utc::now());
                self.ledger.record(&pending).await?;
                (pending, false)
            }
        };

        self.run(pending, resumed).await
    }

    /// Retries every recorded deletion from its next step.
    pub async fn resume_pending(&self) -> Result<SweepSummary, AppError> {
        let mut summary = SweepSummary::default();

        for pending in self.ledger.list_pending().await? {
            let user_id = pending.user_id.clone();
            let attempt = match self.restart_if_user_exists(pending).await {
                Ok(pending) => self.run(pending, true).await,
                Err(e) => Err(e),
            };
            match attempt {
                Ok(report) => {
                    info!(user_id, events_deleted = report.events_deleted, "Pending deletion completed");
                    summary.completed += 1;
                }
                Err(e) => {
                    warn!(user_id, "Pending deletion still failing: {}", e);
                    summary.failed += 1;
                }
            }
        }

        Ok(summary)
    }

    pub async fn deletion_status(&self, user_id: &str) -> Result<DeletionStatus, AppError> {
        Ok(match self.ledger.get(user_id).await? {
            Some(pending) => DeletionStatus::Pending(pending),
            None => DeletionStatus::None,
        })
    }

    /// A user record that exists again must be removed before anything that
    /// hangs off it, so the saga restarts from the first step.
    async fn restart_if_user_exists(&self, mut pending: PendingDeletion) -> Result<PendingDeletion, AppError> {
        if pending.next_step != DeletionStep::DeleteUserRecord
            && self.users.get_user(&pending.user_id).await?.is_some()
        {
            warn!(
                user_id = %pending.user_id,
                next_step = %pending.next_step,
                "User record reappeared during deletion; restarting"
            );
            pending.next_step = DeletionStep::DeleteUserRecord;
            pending.updated_at = Utc::now();
        }
        Ok(pending)
    }

    async fn run(&self, mut pending: PendingDeletion, resumed: bool) -> Result<DeletionReport, AppError> {
        let mut report = DeletionReport {
            user_id: pending.user_id.clone(),
            resumed,
            ..Default::default()
        };

        for step in pending.next_step.remaining() {
            if let Err(err) = self.execute(step, &mut report).await {
                pending.next_step = step;
                pending.attempts += 1;
                pending.last_error = Some(err.to_string());
                pending.updated_at = Utc::now();

                warn!(
                    user_id = %pending.user_id,
                    step = %step,
                    attempts = pending.attempts,
                    "User deletion halted: {}", err
                );
                if let Err(record_err) = self.ledger.record(&pending).await {
                    warn!(user_id = %pending.user_id, "Could not update deletion tombstone: {}", record_err);
                }
                return Err(err);
            }
        }

        if let Err(e) = self.ledger.complete(&pending.user_id).await {
            warn!(user_id = %pending.user_id, "Could not clear deletion tombstone: {}", e);
        }

        info!(
            user_id = %report.user_id,
            events_deleted = report.events_deleted,
            events_rewritten = report.events_rewritten,
            blobs_deleted = report.blobs_deleted,
            "User deleted"
        );
        Ok(report)
    }

    async fn execute(&self, step: DeletionStep, report: &mut DeletionReport) -> Result<(), AppError> {
        let user_id = report.user_id.as_str();
        match step {
            DeletionStep::DeleteUserRecord => match self.users.delete_user(user_id).await {
                Err(AppError::NotFound(_)) if report.resumed => Ok(()),
                other => other,
            },
            DeletionStep::DeleteCreatedEvents => {
                report.events_deleted += self.events.delete_events_by_creator(user_id).await?;
                Ok(())
            }
            DeletionStep::RemoveInvitee => {
                report.events_rewritten += self.events.remove_invitee_everywhere(user_id).await?;
                Ok(())
            }
            DeletionStep::DeleteBlobs => {
                report.blobs_deleted += self.blobs.delete_all_for_owner(user_id).await?;
                Ok(())
            }
        }
    }
}
