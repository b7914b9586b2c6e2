use std::sync::Arc;

use sqlx::PgPool;

use crate::{
    errors::AppError,
    repositories::{
        blob::BlobRepository,
        deletion::DeletionLedger,
        event::EventRepository,
        invitation::InvitationRepository,
        memory_repo::{
            MemoryBlobStore, MemoryDeletionLedger, MemoryEventRepo, MemoryInvitationRepo,
            MemoryUserRepo,
        },
        sqlx_repo::{SqlxDeletionLedger, SqlxEventRepo, SqlxInvitationRepo, SqlxUserRepo},
        user::UserRepository,
    },
    settings::{AppConfig, BlobBackend, StorageBackend},
    storage::filesystem::FilesystemBlobStore,
};

/// Every store the use-case handlers are built over.
#[derive(Clone)]
pub struct SharedRepositories {
    pub users: Arc<dyn UserRepository>,
    pub events: Arc<dyn EventRepository>,
    pub invitations: Arc<dyn InvitationRepository>,
    pub deletions: Arc<dyn DeletionLedger>,
    pub blobs: Arc<dyn BlobRepository>,
}

impl SharedRepositories {
    pub fn in_memory() -> Self {
        SharedRepositories {
            users: Arc::new(MemoryUserRepo::new()),
            events: Arc::new(MemoryEventRepo::new()),
            invitations: Arc::new(MemoryInvitationRepo::new()),
            deletions: Arc::new(MemoryDeletionLedger::new()),
            blobs: Arc::new(MemoryBlobStore::new()),
        }
    }

    pub fn postgres(pool: PgPool, blobs: Arc<dyn BlobRepository>) -> Self {
        SharedRepositories {
            users: Arc::new(SqlxUserRepo::new(pool.clone())),
            events: Arc::new(SqlxEventRepo::new(pool.clone())),
            invitations: Arc::new(SqlxInvitationRepo::new(pool.clone())),
            deletions: Arc::new(SqlxDeletionLedger::new(pool)),
            blobs,
        }
    }

    pub fn with_blobs(mut self, blobs: Arc<dyn BlobRepository>) -> Self {
        self.blobs = blobs;
        self
    }

    /// Picks the record and blob backends named in the configuration.
    /// `pool` must be present when the postgres backend is selected.
    pub async fn from_config(config: &AppConfig, pool: Option<PgPool>) -> Result<Self, AppError> {
        let blobs: Arc<dyn BlobRepository> = match config.blob_backend {
            BlobBackend::Memory => Arc::new(MemoryBlobStore::new()),
            BlobBackend::Filesystem => Arc::new(FilesystemBlobStore::new(config.blob_root.clone()).await?),
        };

        match (config.storage_backend, pool) {
            (StorageBackend::Memory, _) => Ok(Self::in_memory().with_blobs(blobs)),
            (StorageBackend::Postgres, Some(pool)) => Ok(Self::postgres(pool, blobs)),
            (StorageBackend::Postgres, None) => Err(AppError::dependency(
                "repositories.init",
                "postgres backend selected without a connection pool",
            )),
        }
    }
}
