//! Persistence contract and driver selection.
//!
//! One flat async trait covers all six entities; the document, relational
//! and in-memory drivers implement it interchangeably. The chosen driver is
//! constructed once at startup and injected through `AppState` rather than
//! living in a module singleton.

mod memory;
mod mongo;
mod postgres;

pub use memory::MemoryStorage;
pub use mongo::MongoStorage;
pub use postgres::PgStorage;

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;

use crate::config::{AppConfig, StorageKind};
use crate::models::{
    Application, ApplicationPatch, Dispute, DisputePatch, Job, JobPatch, Message, NewApplication,
    NewDispute, NewJob, NewMessage, NewUser, NewWorkNft, User, UserPatch, WorkNft,
};

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Update or lookup addressed a row that does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Mongo(#[from] mongodb::error::Error),
    #[error(transparent)]
    Bson(#[from] mongodb::bson::ser::Error),
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// Optional equality filters for job listings, combined with AND.
#[derive(Debug, Clone, Default)]
pub struct JobFilter {
    pub category: Option<String>,
    pub status: Option<String>,
}

impl JobFilter {
    pub fn status(status: &str) -> Self {
        Self {
            category: None,
            status: Some(status.into()),
        }
    }

    pub fn matches(&self, job: &Job) -> bool {
        self.category.as_ref().map_or(true, |c| &job.category == c)
            && self.status.as_ref().map_or(true, |s| &job.status == s)
    }
}

/// The storage contract. Lookups return `None` for missing rows; updates on
/// a missing id fail with [`StorageError::NotFound`].
///
/// Sort orders are fixed: newest first everywhere except messages, which read
/// as a chat transcript (oldest first). No call spans a transaction; handler
/// sequences are last-write-wins.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn get_user(&self, id: &str) -> Result<Option<User>>;
    async fn get_user_by_wallet(&self, wallet_address: &str) -> Result<Option<User>>;
    async fn create_user(&self, insert: NewUser) -> Result<User>;
    async fn update_user(&self, id: &str, patch: UserPatch) -> Result<User>;

    async fn get_jobs(&self, filter: JobFilter) -> Result<Vec<Job>>;
    async fn get_job(&self, id: &str) -> Result<Option<Job>>;
    async fn create_job(&self, insert: NewJob) -> Result<Job>;
    async fn update_job(&self, id: &str, patch: JobPatch) -> Result<Job>;

    async fn get_applications(&self, job_id: &str) -> Result<Vec<Application>>;
    /// Duplicate-application guard: look up the one application a freelancer
    /// may have on a job.
    async fn find_application(
        &self,
        job_id: &str,
        freelancer_id: &str,
    ) -> Result<Option<Application>>;
    async fn create_application(&self, insert: NewApplication) -> Result<Application>;
    async fn update_application(&self, id: &str, patch: ApplicationPatch) -> Result<Application>;

    async fn get_messages(&self, job_id: &str) -> Result<Vec<Message>>;
    async fn create_message(&self, insert: NewMessage) -> Result<Message>;

    async fn get_disputes(&self, job_id: Option<&str>) -> Result<Vec<Dispute>>;
    async fn create_dispute(&self, insert: NewDispute) -> Result<Dispute>;
    async fn update_dispute(&self, id: &str, patch: DisputePatch) -> Result<Dispute>;

    async fn get_work_nfts(&self, freelancer_id: &str) -> Result<Vec<WorkNft>>;
    async fn create_work_nft(&self, insert: NewWorkNft) -> Result<WorkNft>;
}

/// Connect the driver selected by configuration. Postgres and Mongo both
/// fail fast when their connection string is absent.
pub async fn connect(config: &AppConfig) -> anyhow::Result<Arc<dyn Storage>> {
    match config.storage {
        StorageKind::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL must be set for Postgres storage")?;
            let storage = PgStorage::connect(url).await?;
            Ok(Arc::new(storage))
        }
        StorageKind::Mongo => {
            let uri = config
                .mongodb_uri
                .as_deref()
                .context("MONGODB_URI must be set for Mongo storage")?;
            let storage = MongoStorage::connect(uri, &config.mongodb_db).await?;
            Ok(Arc::new(storage))
        }
        StorageKind::Memory => {
            tracing::warn!("using in-memory storage; data will not survive restart");
            Ok(Arc::new(MemoryStorage::new()))
        }
    }
}
