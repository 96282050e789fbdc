//! Document driver on MongoDB.
//!
//! Documents are the serde (camelCase) image of the wire models, so a stored
//! job looks exactly like the JSON the API returns. Timestamps are RFC 3339
//! strings; their lexicographic order is chronological, which keeps the
//! `createdAt` sorts correct without a BSON date mapping.

use async_trait::async_trait;
use futures_util::TryStreamExt;
use mongodb::bson::{doc, Document};
use mongodb::options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument};
use mongodb::{Client, Collection, Database};
use serde::Serialize;

use super::{JobFilter, Result, Storage, StorageError};
use crate::models::{
    Application, ApplicationPatch, Dispute, DisputePatch, Job, JobPatch, Message, NewApplication,
    NewDispute, NewJob, NewMessage, NewUser, NewWorkNft, User, UserPatch, WorkNft,
};

pub struct MongoStorage {
    db: Database,
}

impl MongoStorage {
    pub async fn connect(uri: &str, db_name: &str) -> anyhow::Result<Self> {
        let client = Client::with_uri_str(uri).await?;
        Ok(Self {
            db: client.database(db_name),
        })
    }

    fn users(&self) -> Collection<User> {
        self.db.collection("users")
    }

    fn jobs(&self) -> Collection<Job> {
        self.db.collection("jobs")
    }

    fn applications(&self) -> Collection<Application> {
        self.db.collection("applications")
    }

    fn messages(&self) -> Collection<Message> {
        self.db.collection("messages")
    }

    fn disputes(&self) -> Collection<Dispute> {
        self.db.collection("disputes")
    }

    fn work_nfts(&self) -> Collection<WorkNft> {
        self.db.collection("work_nfts")
    }
}

fn newest_first() -> FindOptions {
    FindOptions::builder()
        .sort(doc! { "createdAt": -1, "id": -1 })
        .build()
}

fn oldest_first() -> FindOptions {
    FindOptions::builder()
        .sort(doc! { "createdAt": 1, "id": 1 })
        .build()
}

fn return_after() -> FindOneAndUpdateOptions {
    FindOneAndUpdateOptions::builder()
        .return_document(ReturnDocument::After)
        .build()
}

/// Serialize a patch into a `$set` document; `None` fields are skipped.
fn set_document<P: Serialize>(patch: &P) -> Result<Document> {
    Ok(mongodb::bson::to_document(patch)?)
}

#[async_trait]
impl Storage for MongoStorage {
    async fn get_user(&self, id: &str) -> Result<Option<User>> {
        Ok(self.users().find_one(doc! { "id": id }, None).await?)
    }

    async fn get_user_by_wallet(&self, wallet_address: &str) -> Result<Option<User>> {
        Ok(self
            .users()
            .find_one(doc! { "walletAddress": wallet_address }, None)
            .await?)
    }

    async fn create_user(&self, insert: NewUser) -> Result<User> {
        let user = User::new(insert);
        self.users().insert_one(&user, None).await?;
        Ok(user)
    }

    async fn update_user(&self, id: &str, patch: UserPatch) -> Result<User> {
        let set = set_document(&patch)?;
        if set.is_empty() {
            return self
                .get_user(id)
                .await?
                .ok_or(StorageError::NotFound("user"));
        }
        self.users()
            .find_one_and_update(doc! { "id": id }, doc! { "$set": set }, return_after())
            .await?
            .ok_or(StorageError::NotFound("user"))
    }

    async fn get_jobs(&self, filter: JobFilter) -> Result<Vec<Job>> {
        let mut query = Document::new();
        if let Some(category) = filter.category {
            query.insert("category", category);
        }
        if let Some(status) = filter.status {
            query.insert("status", status);
        }
        let cursor = self.jobs().find(query, newest_first()).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn get_job(&self, id: &str) -> Result<Option<Job>> {
        Ok(self.jobs().find_one(doc! { "id": id }, None).await?)
    }

    async fn create_job(&self, insert: NewJob) -> Result<Job> {
        let job = Job::new(insert);
        self.jobs().insert_one(&job, None).await?;
        Ok(job)
    }

    async fn update_job(&self, id: &str, patch: JobPatch) -> Result<Job> {
        let set = set_document(&patch)?;
        if set.is_empty() {
            return self
                .get_job(id)
                .await?
                .ok_or(StorageError::NotFound("job"));
        }
        self.jobs()
            .find_one_and_update(doc! { "id": id }, doc! { "$set": set }, return_after())
            .await?
            .ok_or(StorageError::NotFound("job"))
    }

    async fn get_applications(&self, job_id: &str) -> Result<Vec<Application>> {
        let cursor = self
            .applications()
            .find(doc! { "jobId": job_id }, newest_first())
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn find_application(
        &self,
        job_id: &str,
        freelancer_id: &str,
    ) -> Result<Option<Application>> {
        Ok(self
            .applications()
            .find_one(doc! { "jobId": job_id, "freelancerId": freelancer_id }, None)
            .await?)
    }

    async fn create_application(&self, insert: NewApplication) -> Result<Application> {
        let app = Application::new(insert);
        self.applications().insert_one(&app, None).await?;
        Ok(app)
    }

    async fn update_application(&self, id: &str, patch: ApplicationPatch) -> Result<Application> {
        let set = set_document(&patch)?;
        if set.is_empty() {
            return self
                .applications()
                .find_one(doc! { "id": id }, None)
                .await?
                .ok_or(StorageError::NotFound("application"));
        }
        self.applications()
            .find_one_and_update(doc! { "id": id }, doc! { "$set": set }, return_after())
            .await?
            .ok_or(StorageError::NotFound("application"))
    }

    async fn get_messages(&self, job_id: &str) -> Result<Vec<Message>> {
        let cursor = self
            .messages()
            .find(doc! { "jobId": job_id }, oldest_first())
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn create_message(&self, insert: NewMessage) -> Result<Message> {
        let msg = Message::new(insert);
        self.messages().insert_one(&msg, None).await?;
        Ok(msg)
    }

    async fn get_disputes(&self, job_id: Option<&str>) -> Result<Vec<Dispute>> {
        let mut query = Document::new();
        if let Some(job_id) = job_id {
            query.insert("jobId", job_id);
        }
        let cursor = self.disputes().find(query, newest_first()).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn create_dispute(&self, insert: NewDispute) -> Result<Dispute> {
        let dispute = Dispute::new(insert);
        self.disputes().insert_one(&dispute, None).await?;
        Ok(dispute)
    }

    async fn update_dispute(&self, id: &str, patch: DisputePatch) -> Result<Dispute> {
        let set = set_document(&patch)?;
        if set.is_empty() {
            return self
                .disputes()
                .find_one(doc! { "id": id }, None)
                .await?
                .ok_or(StorageError::NotFound("dispute"));
        }
        self.disputes()
            .find_one_and_update(doc! { "id": id }, doc! { "$set": set }, return_after())
            .await?
            .ok_or(StorageError::NotFound("dispute"))
    }

    async fn get_work_nfts(&self, freelancer_id: &str) -> Result<Vec<WorkNft>> {
        let cursor = self
            .work_nfts()
            .find(doc! { "freelancerId": freelancer_id }, newest_first())
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn create_work_nft(&self, insert: NewWorkNft) -> Result<WorkNft> {
        let nft = WorkNft::mint(insert);
        self.work_nfts().insert_one(&nft, None).await?;
        Ok(nft)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::JOB_IN_PROGRESS;

    #[test]
    fn patch_set_document_skips_unset_fields() {
        let patch = JobPatch {
            status: Some(JOB_IN_PROGRESS.into()),
            assigned_freelancer_id: Some("f1".into()),
            ..Default::default()
        };
        let set = set_document(&patch).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.get_str("status").unwrap(), "in_progress");
        assert_eq!(set.get_str("assignedFreelancerId").unwrap(), "f1");

        let empty = set_document(&JobPatch::default()).unwrap();
        assert!(empty.is_empty());
    }
}
