use async_trait::async_trait;
use sqlx::PgPool;

use crate::{
    entities::event::EventRecord,
    errors::AppError,
    repositories::{memory_repo::MemoryEventRepo, sqlx_repo::SqlxEventRepo},
};

const EVENT_COLUMNS: &str =
    "id, name, date, start_time, end_time, location, description, color, creator_id, invitee_ids";

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventRepository: Send + Sync {
    async fn create_event(&self, event: &EventRecord) -> Result<(), AppError>;
    async fn get_event(&self, id: &str) -> Result<Option<EventRecord>, AppError>;
    async fn get_all_events(&self) -> Result<Vec<EventRecord>, AppError>;
    async fn update_event(&self, event: &EventRecord) -> Result<(), AppError>;
    async fn delete_event(&self, id: &str) -> Result<(), AppError>;
    /// Returns the number of events removed.
    async fn delete_events_by_creator(&self, creator_id: &str) -> Result<u64, AppError>;
    /// Returns the number of events whose invitee list changed.
    async fn remove_invitee_everywhere(&self, user_id: &str) -> Result<u64, AppError>;
}

fn event_not_found(id: &str) -> AppError {
    AppError::NotFound(format!("Event {id} not found"))
}

impl SqlxEventRepo {
    pub fn new(pool: PgPool) -> Self {
        SqlxEventRepo { pool }
    }
}

#[async_trait]
impl EventRepository for SqlxEventRepo {
    async fn create_event(&self, event: &EventRecord) -> Result<(), AppError> {
        sqlx::query(&format!(
            "INSERT INTO events ({EVENT_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)"
        ))
        .bind(&event.id)
        .bind(&event.name)
        .bind(&event.date)
        .bind(&event.start_time)
        .bind(&event.end_time)
        .bind(&event.location)
        .bind(&event.description)
        .bind(&event.color)
        .bind(&event.creator_id)
        .bind(&event.invitee_ids)
        .execute(&self.pool)
        .await
        .map_err(|e| match AppError::from(e) {
            AppError::Conflict(_) => AppError::Conflict(format!("Event {} already exists", event.id)),
            AppError::Dependency { message, .. } => AppError::Dependency { operation: "events.create", message },
            other => other,
        })?;

        Ok(())
    }

    async fn get_event(&self, id: &str) -> Result<Option<EventRecord>, AppError> {
        sqlx::query_as::<_, EventRecord>(&format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::dependency("events.get", e))
    }

    async fn get_all_events(&self) -> Result<Vec<EventRecord>, AppError> {
        sqlx::query_as::<_, EventRecord>(&format!("SELECT {EVENT_COLUMNS} FROM events ORDER BY date, start_time, id"))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::dependency("events.get_all", e))
    }

    async fn update_event(&self, event: &EventRecord) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            UPDATE events
            SET name = $2, date = $3, start_time = $4, end_time = $5, location = $6,
                description = $7, color = $8, creator_id = $9, invitee_ids = $10, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(&event.id)
        .bind(&event.name)
        .bind(&event.date)
        .bind(&event.start_time)
        .bind(&event.end_time)
        .bind(&event.location)
        .bind(&event.description)
        .bind(&event.color)
        .bind(&event.creator_id)
        .bind(&event.invitee_ids)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::dependency("events.update", e))?;

        if result.rows_affected() == 0 {
            return Err(event_not_found(&event.id));
        }
        Ok(())
    }

    async fn delete_event(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::dependency("events.delete", e))?;

        if result.rows_affected() == 0 {
            return Err(event_not_found(id));
        }
        Ok(())
    }

    async fn delete_events_by_creator(&self, creator_id: &str) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM events WHERE creator_id = $1")
            .bind(creator_id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::dependency("events.delete_by_creator", e))?;

        Ok(result.rows_affected())
    }

    async fn remove_invitee_everywhere(&self, user_id: &str) -> Result<u64, AppError> {
        let result = sqlx::query(
            "UPDATE events SET invitee_ids = array_remove(invitee_ids, $1), updated_at = NOW() WHERE $1 = ANY(invitee_ids)",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::dependency("events.remove_invitee", e))?;

        Ok(result.rows_affected())
    }
}

impl MemoryEventRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventRepository for MemoryEventRepo {
    async fn create_event(&self, event: &EventRecord) -> Result<(), AppError> {
        match self.events.entry(event.id.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                Err(AppError::Conflict(format!("Event {} already exists", event.id)))
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(event.clone());
                Ok(())
            }
        }
    }

    async fn get_event(&self, id: &str) -> Result<Option<EventRecord>, AppError> {
        Ok(self.events.get(id).map(|e| e.clone()))
    }

    async fn get_all_events(&self) -> Result<Vec<EventRecord>, AppError> {
        let mut events: Vec<EventRecord> = self.events.iter().map(|e| e.value().clone()).collect();
        events.sort_by(|a, b| {
            (&a.date, &a.start_time, &a.id).cmp(&(&b.date, &b.start_time, &b.id))
        });
        Ok(events)
    }

    async fn update_event(&self, event: &EventRecord) -> Result<(), AppError> {
        match self.events.get_mut(&event.id) {
            Some(mut existing) => {
                *existing = event.clone();
                Ok(())
            }
            None => Err(event_not_found(&event.id)),
        }
    }

    async fn delete_event(&self, id: &str) -> Result<(), AppError> {
        self.events
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| event_not_found(id))
    }

    async fn delete_events_by_creator(&self, creator_id: &str) -> Result<u64, AppError> {
        let mut removed = 0;
        self.events.retain(|_, event| {
            let keep = event.creator_id != creator_id;
            if !keep {
                removed += 1;
            }
            keep
        });
        Ok(removed)
    }

    async fn remove_invitee_everywhere(&self, user_id: &str) -> Result<u64, AppError> {
        let mut rewritten = 0;
        for mut event in self.events.iter_mut() {
            let before = event.invitee_ids.len();
            event.invitee_ids.retain(|id| id != user_id);
            if event.invitee_ids.len() != before {
                rewritten += 1;
            }
        }
        Ok(rewritten)
    }
}
