use std::{collections::HashMap, sync::Arc};

use tracing::warn;
use uuid::Uuid;
use validator::Validate;

use crate::{
    entities::{
        event::{CreateEventRequest, Event, EventRecord, UpdateEventRequest},
        identity::Identity,
        user::User,
    },
    errors::{AppError, FieldError},
    repositories::{event::EventRepository, user::UserRepository},
};

pub struct EventHandler {
    events: Arc<dyn EventRepository>,
    users: Arc<dyn UserRepository>,
}

impl EventHandler {
    pub fn new(events: Arc<dyn EventRepository>, users: Arc<dyn UserRepository>) -> Self {
        EventHandler { events, users }
    }

    /// Creates an event owned by the caller.
    pub async fn create_event(&self, caller: &Identity, request: CreateEventRequest) -> Result<Event, AppError> {
        request.validate()?;

        let id = request
            .id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let record = request.into_record(id, caller.uid.clone());
        let people = self.resolve_for_write(&record).await?;

        self.events.create_event(&record).await?;
        to_event(record, &people)
            .ok_or_else(|| AppError::dependency("events.create", "creator vanished during write"))
    }

    pub async fn get_event(&self, id: &str) -> Result<Event, AppError> {
        let record = self.find(id).await?;
        let people = self.load_people(record.invitee_ids.iter().chain([&record.creator_id])).await?;

        to_event(record, &people)
            .ok_or_else(|| AppError::NotFound(format!("Event {id} not found")))
    }

    pub async fn get_all_events(&self) -> Result<Vec<Event>, AppError> {
        let records = self.events.get_all_events().await?;
        self.denormalize(records).await
    }

    /// Events the user created or is invited to.
    pub async fn get_events_by_user(&self, user_id: &str) -> Result<Vec<Event>, AppError> {
        let records = self
            .events
            .get_all_events()
            .await?
            .into_iter()
            .filter(|event| event.involves(user_id))
            .collect();
        self.denormalize(records).await
    }

    pub async fn update_event(
        &self,
        caller: &Identity,
        id: &str,
        request: UpdateEventRequest,
    ) -> Result<Event, AppError> {
        request.validate()?;
        if request.id.as_deref().is_some_and(|body_id| body_id != id) {
            return Err(AppError::invalid("id", "Body id does not match the path"));
        }

        let mut record = self.find(id).await?;
        if !caller.can_act_for(&record.creator_id) {
            return Err(AppError::Forbidden("Only the creator can modify this event".into()));
        }

        record.apply(&request);
        let people = self.resolve_for_write(&record).await?;
        self.events.update_event(&record).await?;

        to_event(record, &people)
            .ok_or_else(|| AppError::dependency("events.update", "creator vanished during write"))
    }

    pub async fn delete_event(&self, caller: &Identity, id: &str) -> Result<(), AppError> {
        let record = self.find(id).await?;
        if !caller.can_act_for(&record.creator_id) {
            return Err(AppError::Forbidden("Only the creator can delete this event".into()));
        }
        self.events.delete_event(id).await
    }

    async fn find(&self, id: &str) -> Result<EventRecord, AppError> {
        self.events
            .get_event(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Event {id} not found")))
    }

    /// Every referenced user must exist before an event is written.
    async fn resolve_for_write(&self, record: &EventRecord) -> Result<HashMap<String, User>, AppError> {
        let people = self.load_people(record.invitee_ids.iter().chain([&record.creator_id])).await?;

        let mut errors = Vec::new();
        if !people.contains_key(&record.creator_id) {
            errors.push(FieldError::new(
                "creator",
                format!("Creator {} is not a registered user", record.creator_id),
            ));
        }
        let missing: Vec<&str> = record
            .invitee_ids
            .iter()
            .filter(|id| !people.contains_key(*id))
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            errors.push(FieldError::new("invitees", format!("Unknown users: {}", missing.join(", "))));
        }

        if errors.is_empty() {
            Ok(people)
        } else {
            Err(AppError::InvalidArgument(errors))
        }
    }

    async fn load_people<'a>(
        &self,
        ids: impl Iterator<Item = &'a String>,
    ) -> Result<HashMap<String, User>, AppError> {
        let mut people = HashMap::new();
        for id in ids {
            if people.contains_key(id) {
                continue;
            }
            if let Some(user) = self.users.get_user(id).await? {
                people.insert(id.clone(), user);
            }
        }
        Ok(people)
    }

    async fn denormalize(&self, records: Vec<EventRecord>) -> Result<Vec<Event>, AppError> {
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let people: HashMap<String, User> = self
            .users
            .get_all_users()
            .await?
            .into_iter()
            .map(|user| (user.id.clone(), user))
            .collect();

        Ok(records
            .into_iter()
            .filter_map(|record| {
                let id = record.id.clone();
                let event = to_event(record, &people);
                if event.is_none() {
                    warn!(event_id = %id, "Skipping event whose creator no longer exists");
                }
                event
            })
            .collect())
    }
}

/// Builds the client view. Returns `None` when the creator is unknown; unknown
/// invitees are dropped.
fn to_event(record: EventRecord, people: &HashMap<String, User>) -> Option<Event> {
    let creator = people.get(&record.creator_id)?.clone();
    let invitees = record
        .invitee_ids
        .iter()
        .filter_map(|id| {
            let user = people.get(id).cloned();
            if user.is_none() {
                warn!(event_id = %record.id, invitee = %id, "Dropping unknown invitee");
            }
            user
        })
        .collect();

    Some(Event::from_record(record, creator, invitees))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::memory_repo::{MemoryEventRepo, MemoryUserRepo};

    fn caller(uid: &str, admin: bool) -> Identity {
        Identity { uid: uid.into(), email: None, name: None, admin }
    }

    async fn setup() -> (EventHandler, MemoryEventRepo, MemoryUserRepo) {
        let users = MemoryUserRepo::new();
        for id in ["a", "b", "c"] {
            users.create_user(&User::new(id, id.to_uppercase(), format!("{id}@example.com"), "parent")).await.unwrap();
        }
        let events = MemoryEventRepo::new();
        (EventHandler::new(Arc::new(events.clone()), Arc::new(users.clone())), events, users)
    }

    fn request(id: Option<&str>, invitees: &[&str]) -> CreateEventRequest {
        CreateEventRequest {
            id: id.map(String::from),
            name: "Field trip".into(),
            date: "2030-05-01".into(),
            invitees: invitees.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn create_resolves_creator_and_invitees() {
        let (handler, _, _) = setup().await;

        let event = handler.create_event(&caller("a", false), request(None, &["b", "c", "b"])).await.unwrap();

        assert!(Uuid::parse_str(&event.id).is_ok());
        assert_eq!(event.creator.id, "a");
        let invitees: Vec<_> = event.invitees.iter().map(|u| u.id.as_str()).collect();
        assert_eq!(invitees, vec!["b", "c"]);
    }

    #[tokio::test]
    async fn duplicate_ids_conflict() {
        let (handler, _, _) = setup().await;
        handler.create_event(&caller("a", false), request(Some("e1"), &[])).await.unwrap();

        let err = handler.create_event(&caller("b", false), request(Some("e1"), &[])).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn unknown_people_are_rejected_at_write() {
        let (handler, events, _) = setup().await;

        let err = handler.create_event(&caller("ghost", false), request(Some("e1"), &["nobody"])).await.unwrap_err();
        match err {
            AppError::InvalidArgument(errors) => {
                let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
                assert_eq!(fields, vec!["creator", "invitees"]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(events.get_event("e1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn reads_skip_orphans_and_drop_missing_invitees() {
        let (handler, _, users) = setup().await;
        handler.create_event(&caller("a", false), request(Some("e1"), &["b", "c"])).await.unwrap();
        handler.create_event(&caller("b", false), request(Some("e2"), &["a"])).await.unwrap();

        users.delete_user("c").await.unwrap();
        users.delete_user("b").await.unwrap();

        let all = handler.get_all_events().await.unwrap();
        assert_eq!(all.len(), 1);
        assert!(all[0].invitees.is_empty());
        assert!(matches!(handler.get_event("e2").await.unwrap_err(), AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn by_user_includes_invitations() {
        let (handler, _, _) = setup().await;
        handler.create_event(&caller("a", false), request(Some("e1"), &["b"])).await.unwrap();
        handler.create_event(&caller("c", false), request(Some("e2"), &[])).await.unwrap();

        let ids: Vec<_> = handler.get_events_by_user("b").await.unwrap().into_iter().map(|e| e.id).collect();
        assert_eq!(ids, vec!["e1"]);
    }

    #[tokio::test]
    async fn only_creator_or_admin_may_update() {
        let (handler, _, _) = setup().await;
        handler.create_event(&caller("a", false), request(Some("e1"), &[])).await.unwrap();
        let patch = || UpdateEventRequest {
            location: Some("Zoo".into()),
            ..Default::default()
        };

        assert!(matches!(
            handler.update_event(&caller("b", false), "e1", patch()).await.unwrap_err(),
            AppError::Forbidden(_)
        ));
        let updated = handler.update_event(&caller("admin", true), "e1", patch()).await.unwrap();
        assert_eq!(updated.location, "Zoo");
        assert_eq!(updated.name, "Field trip");
    }

    #[tokio::test]
    async fn mismatched_body_id_is_rejected() {
        let (handler, _, _) = setup().await;
        handler.create_event(&caller("a", false), request(Some("e1"), &[])).await.unwrap();

        let patch = UpdateEventRequest {
            id: Some("e2".into()),
            ..Default::default()
        };
        assert!(matches!(
            handler.update_event(&caller("a", false), "e1", patch).await.unwrap_err(),
            AppError::InvalidArgument(_)
        ));
    }
}
