use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::entities::{
    deletion::PendingDeletion,
    event::EventRecord,
    image::{BlobKey, ImageData},
    invitation::Invitation,
    user::User,
};

#[derive(Clone, Default)]
pub struct MemoryUserRepo {
    pub users: Arc<DashMap<String, User>>,
}

#[derive(Clone, Default)]
pub struct MemoryEventRepo {
    pub events: Arc<DashMap<String, EventRecord>>,
}

#[derive(Clone, Default)]
pub struct MemoryInvitationRepo {
    pub invitations: Arc<DashMap<String, Invitation>>,
}

#[derive(Clone, Default)]
pub struct MemoryDeletionLedger {
    pub pending: Arc<DashMap<String, PendingDeletion>>,
}

#[derive(Clone, Default)]
pub struct MemoryBlobStore {
    pub blobs: Arc<DashMap<BlobKey, (ImageData, DateTime<Utc>)>>,
}
