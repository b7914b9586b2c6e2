use tokio::time::{interval, Duration, MissedTickBehavior};

use crate::use_cases::user_deletion::UserDeletionCoordinator;

/// Periodically resumes every user deletion that stopped part way.
pub async fn start_deletion_sweeper(coordinator: UserDeletionCoordinator, period: Duration) {
    let mut interval = interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;

        match coordinator.resume_pending().await {
            Ok(summary) if summary.completed == 0 && summary.failed == 0 => {}
            Ok(summary) => tracing::info!(
                completed = summary.completed,
                failed = summary.failed,
                "Deletion sweep finished"
            ),
            Err(e) => tracing::error!("Deletion sweep failed: {}", e),
        }
    }
}
