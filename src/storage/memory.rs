//! In-memory driver. Backs `STORAGE=memory` and the test suite; semantics
//! mirror the database drivers, including sort orders and not-found errors.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{JobFilter, Result, Storage, StorageError};
use crate::models::{
    Application, ApplicationPatch, Dispute, DisputePatch, Job, JobPatch, Message, NewApplication,
    NewDispute, NewJob, NewMessage, NewUser, NewWorkNft, User, UserPatch, WorkNft,
};

#[derive(Default)]
struct Tables {
    users: HashMap<String, User>,
    jobs: HashMap<String, Job>,
    applications: HashMap<String, Application>,
    messages: HashMap<String, Message>,
    disputes: HashMap<String, Dispute>,
    work_nfts: HashMap<String, WorkNft>,
}

#[derive(Default)]
pub struct MemoryStorage {
    tables: RwLock<Tables>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Deterministic newest-first order; id breaks creation-time ties.
fn newest_first<T, K>(items: &mut Vec<T>, key: K)
where
    K: Fn(&T) -> (time::OffsetDateTime, String),
{
    items.sort_by(|a, b| {
        let (ta, ia) = key(a);
        let (tb, ib) = key(b);
        tb.cmp(&ta).then(ib.cmp(&ia))
    });
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn get_user(&self, id: &str) -> Result<Option<User>> {
        Ok(self.tables.read().await.users.get(id).cloned())
    }

    async fn get_user_by_wallet(&self, wallet_address: &str) -> Result<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.wallet_address == wallet_address)
            .cloned())
    }

    async fn create_user(&self, insert: NewUser) -> Result<User> {
        let user = User::new(insert);
        self.tables
            .write()
            .await
            .users
            .insert(user.id.clone(), user.clone());
        Ok(user)
    }

    async fn update_user(&self, id: &str, patch: UserPatch) -> Result<User> {
        let mut tables = self.tables.write().await;
        let user = tables
            .users
            .get_mut(id)
            .ok_or(StorageError::NotFound("user"))?;
        if let Some(v) = patch.bio {
            user.bio = Some(v);
        }
        if let Some(v) = patch.avatar {
            user.avatar = Some(v);
        }
        if let Some(v) = patch.skills {
            user.skills = v;
        }
        if let Some(v) = patch.reputation_score {
            user.reputation_score = v;
        }
        if let Some(v) = patch.total_earned {
            user.total_earned = v;
        }
        if let Some(v) = patch.total_spent {
            user.total_spent = v;
        }
        if let Some(v) = patch.completed_jobs {
            user.completed_jobs = v;
        }
        if let Some(v) = patch.rating {
            user.rating = v;
        }
        Ok(user.clone())
    }

    async fn get_jobs(&self, filter: JobFilter) -> Result<Vec<Job>> {
        let tables = self.tables.read().await;
        let mut jobs: Vec<Job> = tables
            .jobs
            .values()
            .filter(|j| filter.matches(j))
            .cloned()
            .collect();
        newest_first(&mut jobs, |j| (j.created_at, j.id.clone()));
        Ok(jobs)
    }

    async fn get_job(&self, id: &str) -> Result<Option<Job>> {
        Ok(self.tables.read().await.jobs.get(id).cloned())
    }

    async fn create_job(&self, insert: NewJob) -> Result<Job> {
        let job = Job::new(insert);
        self.tables
            .write()
            .await
            .jobs
            .insert(job.id.clone(), job.clone());
        Ok(job)
    }

    async fn update_job(&self, id: &str, patch: JobPatch) -> Result<Job> {
        let mut tables = self.tables.write().await;
        let job = tables
            .jobs
            .get_mut(id)
            .ok_or(StorageError::NotFound("job"))?;
        if let Some(v) = patch.title {
            job.title = v;
        }
        if let Some(v) = patch.description {
            job.description = v;
        }
        if let Some(v) = patch.category {
            job.category = v;
        }
        if let Some(v) = patch.budget {
            job.budget = v;
        }
        if let Some(v) = patch.currency {
            job.currency = v;
        }
        if let Some(v) = patch.deadline {
            job.deadline = v;
        }
        if let Some(v) = patch.skills {
            job.skills = v;
        }
        if let Some(v) = patch.status {
            job.status = v;
        }
        if let Some(v) = patch.escrow_funded {
            job.escrow_funded = v;
        }
        if let Some(v) = patch.assigned_freelancer_id {
            job.assigned_freelancer_id = Some(v);
        }
        if let Some(v) = patch.completed_at {
            job.completed_at = Some(v);
        }
        Ok(job.clone())
    }

    async fn get_applications(&self, job_id: &str) -> Result<Vec<Application>> {
        let tables = self.tables.read().await;
        let mut apps: Vec<Application> = tables
            .applications
            .values()
            .filter(|a| a.job_id == job_id)
            .cloned()
            .collect();
        newest_first(&mut apps, |a| (a.created_at, a.id.clone()));
        Ok(apps)
    }

    async fn find_application(
        &self,
        job_id: &str,
        freelancer_id: &str,
    ) -> Result<Option<Application>> {
        let tables = self.tables.read().await;
        Ok(tables
            .applications
            .values()
            .find(|a| a.job_id == job_id && a.freelancer_id == freelancer_id)
            .cloned())
    }

    async fn create_application(&self, insert: NewApplication) -> Result<Application> {
        let app = Application::new(insert);
        self.tables
            .write()
            .await
            .applications
            .insert(app.id.clone(), app.clone());
        Ok(app)
    }

    async fn update_application(&self, id: &str, patch: ApplicationPatch) -> Result<Application> {
        let mut tables = self.tables.write().await;
        let app = tables
            .applications
            .get_mut(id)
            .ok_or(StorageError::NotFound("application"))?;
        if let Some(v) = patch.proposal {
            app.proposal = v;
        }
        if let Some(v) = patch.estimated_delivery {
            app.estimated_delivery = v;
        }
        if let Some(v) = patch.portfolio_link {
            app.portfolio_link = Some(v);
        }
        if let Some(v) = patch.status {
            app.status = v;
        }
        Ok(app.clone())
    }

    async fn get_messages(&self, job_id: &str) -> Result<Vec<Message>> {
        let tables = self.tables.read().await;
        let mut msgs: Vec<Message> = tables
            .messages
            .values()
            .filter(|m| m.job_id == job_id)
            .cloned()
            .collect();
        // Chat transcript order.
        msgs.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(msgs)
    }

    async fn create_message(&self, insert: NewMessage) -> Result<Message> {
        let msg = Message::new(insert);
        self.tables
            .write()
            .await
            .messages
            .insert(msg.id.clone(), msg.clone());
        Ok(msg)
    }

    async fn get_disputes(&self, job_id: Option<&str>) -> Result<Vec<Dispute>> {
        let tables = self.tables.read().await;
        let mut disputes: Vec<Dispute> = tables
            .disputes
            .values()
            .filter(|d| job_id.map_or(true, |j| d.job_id == j))
            .cloned()
            .collect();
        newest_first(&mut disputes, |d| (d.created_at, d.id.clone()));
        Ok(disputes)
    }

    async fn create_dispute(&self, insert: NewDispute) -> Result<Dispute> {
        let dispute = Dispute::new(insert);
        self.tables
            .write()
            .await
            .disputes
            .insert(dispute.id.clone(), dispute.clone());
        Ok(dispute)
    }

    async fn update_dispute(&self, id: &str, patch: DisputePatch) -> Result<Dispute> {
        let mut tables = self.tables.write().await;
        let dispute = tables
            .disputes
            .get_mut(id)
            .ok_or(StorageError::NotFound("dispute"))?;
        if let Some(v) = patch.status {
            dispute.status = v;
        }
        if let Some(v) = patch.resolution {
            dispute.resolution = Some(v);
        }
        if let Some(v) = patch.winner {
            dispute.winner = Some(v);
        }
        if let Some(v) = patch.ai_recommendation {
            dispute.ai_recommendation = Some(v);
        }
        if let Some(v) = patch.resolved_at {
            dispute.resolved_at = Some(v);
        }
        Ok(dispute.clone())
    }

    async fn get_work_nfts(&self, freelancer_id: &str) -> Result<Vec<WorkNft>> {
        let tables = self.tables.read().await;
        let mut nfts: Vec<WorkNft> = tables
            .work_nfts
            .values()
            .filter(|n| n.freelancer_id == freelancer_id)
            .cloned()
            .collect();
        newest_first(&mut nfts, |n| (n.created_at, n.id.clone()));
        Ok(nfts)
    }

    async fn create_work_nft(&self, insert: NewWorkNft) -> Result<WorkNft> {
        let nft = WorkNft::mint(insert);
        self.tables
            .write()
            .await
            .work_nfts
            .insert(nft.id.clone(), nft.clone());
        Ok(nft)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn job(category: &str) -> NewJob {
        NewJob {
            client_id: "u1".into(),
            title: "T".into(),
            description: "D".into(),
            category: category.into(),
            budget: Decimal::new(100, 0),
            currency: "USDC".into(),
            deadline: time::OffsetDateTime::now_utc(),
            skills: vec![],
        }
    }

    #[tokio::test]
    async fn job_filter_is_conjunction_of_equalities() {
        let storage = MemoryStorage::new();
        let design = storage.create_job(job("Design")).await.unwrap();
        let dev = storage.create_job(job("Development")).await.unwrap();
        storage
            .update_job(
                &dev.id,
                JobPatch {
                    status: Some("in_progress".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let open_design = storage
            .get_jobs(JobFilter {
                category: Some("Design".into()),
                status: Some("open".into()),
            })
            .await
            .unwrap();
        assert_eq!(open_design.len(), 1);
        assert_eq!(open_design[0].id, design.id);

        let all = storage.get_jobs(JobFilter::default()).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn listings_are_stable_across_reads() {
        let storage = MemoryStorage::new();
        for i in 0..5 {
            storage.create_job(job(&format!("C{i}"))).await.unwrap();
        }
        let first = storage.get_jobs(JobFilter::default()).await.unwrap();
        let second = storage.get_jobs(JobFilter::default()).await.unwrap();
        let ids = |jobs: &[Job]| jobs.iter().map(|j| j.id.clone()).collect::<Vec<_>>();
        assert_eq!(ids(&first), ids(&second));
    }

    #[tokio::test]
    async fn messages_read_oldest_first() {
        let storage = MemoryStorage::new();
        for content in ["one", "two", "three"] {
            storage
                .create_message(NewMessage {
                    job_id: "j1".into(),
                    sender_id: "u1".into(),
                    content: content.into(),
                })
                .await
                .unwrap();
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }
        let msgs = storage.get_messages("j1").await.unwrap();
        let contents: Vec<_> = msgs.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["one", "two", "three"]);
    }

    #[tokio::test]
    async fn update_on_missing_id_is_not_found() {
        let storage = MemoryStorage::new();
        let err = storage
            .update_job("missing", JobPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound("job")));
    }
}
