use serde::{Deserialize, Serialize};
use validator::Validate;

use super::user::User;

/// An event as persisted: people are referenced by user id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct EventRecord {
    pub id: String,
    pub name: String,
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    pub location: String,
    pub description: String,
    pub color: String,
    pub creator_id: String,
    pub invitee_ids: Vec<String>,
}

impl EventRecord {
    pub fn involves(&self, user_id: &str) -> bool {
        self.creator_id == user_id || self.invitee_ids.iter().any(|id| id == user_id)
    }

    /// Applies the non-empty fields of `patch`. Callers check the id and validate first.
    pub fn apply(&mut self, patch: &UpdateEventRequest) {
        let fields = [
            (&mut self.name, &patch.name),
            (&mut self.date, &patch.date),
            (&mut self.start_time, &patch.start_time),
            (&mut self.end_time, &patch.end_time),
            (&mut self.location, &patch.location),
            (&mut self.description, &patch.description),
            (&mut self.color, &patch.color),
            (&mut self.creator_id, &patch.creator),
        ];
        for (target, value) in fields {
            if let Some(value) = value.as_deref().filter(|v| !v.trim().is_empty()) {
                *target = value.to_string();
            }
        }

        if let Some(invitees) = patch.invitees.as_ref().filter(|list| !list.is_empty()) {
            self.invitee_ids = dedup_ids(invitees);
        }
    }
}

/// Removes duplicate ids while keeping first-seen order.
pub fn dedup_ids(ids: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(ids.len());
    for id in ids {
        let id = id.trim();
        if !id.is_empty() && !out.iter().any(|seen| seen == id) {
            out.push(id.to_string());
        }
    }
    out
}

/// An event as returned to clients, with the creator and invitees resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    pub name: String,
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    pub location: String,
    pub description: String,
    pub color: String,
    pub creator: User,
    pub invitees: Vec<User>,
}

impl Event {
    pub fn from_record(record: EventRecord, creator: User, invitees: Vec<User>) -> Self {
        Event {
            id: record.id,
            name: record.name,
            date: record.date,
            start_time: record.start_time,
            end_time: record.end_time,
            location: record.location,
            description: record.description,
            color: record.color,
            creator,
            invitees,
        }
    }
}

#[derive(Debug, Default, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    #[validate(length(min = 1, max = 128, message = "Id must be between 1 and 128 characters"))]
    pub id: Option<String>,

    #[validate(length(min = 1, max = 200, message = "Name is required"))]
    pub name: String,

    #[validate(length(min = 1, message = "Date is required"))]
    pub date: String,

    #[serde(default)]
    pub start_time: String,

    #[serde(default)]
    pub end_time: String,

    #[serde(default)]
    pub location: String,

    #[validate(length(max = 4000, message = "Description is too long"))]
    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub color: String,

    #[serde(default)]
    pub invitees: Vec<String>,
}

impl CreateEventRequest {
    pub fn into_record(self, id: String, creator_id: String) -> EventRecord {
        EventRecord {
            id,
            name: self.name.trim().to_string(),
            date: self.date,
            start_time: self.start_time,
            end_time: self.end_time,
            location: self.location,
            description: self.description,
            color: self.color,
            creator_id,
            invitee_ids: dedup_ids(&self.invitees),
        }
    }
}

#[derive(Debug, Default, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEventRequest {
    pub id: Option<String>,

    #[validate(length(max = 200, message = "Name is too long"))]
    pub name: Option<String>,

    pub date: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub location: Option<String>,

    #[validate(length(max = 4000, message = "Description is too long"))]
    pub description: Option<String>,

    pub color: Option<String>,

    /// New creator id.
    pub creator: Option<String>,

    pub invitees: Option<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> EventRecord {
        CreateEventRequest {
            name: "Picnic".into(),
            date: "2030-06-01".into(),
            invitees: vec!["b".into(), "c".into(), "b".into()],
            ..Default::default()
        }
        .into_record("e1".into(), "a".into())
    }

    #[test]
    fn invitees_are_deduplicated_in_order() {
        assert_eq!(record().invitee_ids, vec!["b", "c"]);
    }

    #[test]
    fn empty_patch_fields_are_ignored() {
        let mut event = record();
        event.apply(&UpdateEventRequest {
            name: Some("".into()),
            location: Some("Park".into()),
            invitees: Some(vec![]),
            ..Default::default()
        });

        assert_eq!(event.name, "Picnic");
        assert_eq!(event.location, "Park");
        assert_eq!(event.invitee_ids, vec!["b", "c"]);
    }

    #[test]
    fn involvement_covers_creator_and_invitees() {
        let event = record();
        assert!(event.involves("a"));
        assert!(event.involves("c"));
        assert!(!event.involves("z"));
    }
}
