//! Relational driver on Postgres via sqlx.
//!
//! Partial updates use `COALESCE` against bound `NULL`s so one static
//! statement per entity covers every patch shape; fields are set-only, never
//! cleared, matching the handlers' usage.

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use super::{JobFilter, Result, Storage, StorageError};
use crate::models::{
    Application, ApplicationPatch, Dispute, DisputePatch, Job, JobPatch, Message, NewApplication,
    NewDispute, NewJob, NewMessage, NewUser, NewWorkNft, User, UserPatch, WorkNft,
};

const USER_COLUMNS: &str = "id, wallet_address, username, bio, avatar, skills, reputation_score, \
     total_earned, total_spent, completed_jobs, rating, created_at";

const JOB_COLUMNS: &str = "id, client_id, title, description, category, budget, currency, \
     deadline, skills, status, escrow_funded, assigned_freelancer_id, created_at, completed_at";

const APPLICATION_COLUMNS: &str =
    "id, job_id, freelancer_id, proposal, estimated_delivery, portfolio_link, status, created_at";

const DISPUTE_COLUMNS: &str = "id, job_id, raised_by, reason, evidence, status, resolution, \
     winner, ai_recommendation, created_at, resolved_at";

const NFT_COLUMNS: &str = "id, job_id, freelancer_id, client_id, job_title, rating, amount, \
     currency, token_id, ipfs_hash, polygon_scan_url, created_at";

pub struct PgStorage {
    pool: PgPool,
}

impl PgStorage {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;

        if let Err(e) = sqlx::migrate!("./migrations").run(&pool).await {
            tracing::warn!(error = %e, "migration failed; continuing with existing schema");
        }

        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Storage for PgStorage {
    async fn get_user(&self, id: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn get_user_by_wallet(&self, wallet_address: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE wallet_address = $1"
        ))
        .bind(wallet_address)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn create_user(&self, insert: NewUser) -> Result<User> {
        let user = User::new(insert);
        sqlx::query(&format!(
            "INSERT INTO users ({USER_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)"
        ))
        .bind(&user.id)
        .bind(&user.wallet_address)
        .bind(&user.username)
        .bind(&user.bio)
        .bind(&user.avatar)
        .bind(&user.skills)
        .bind(user.reputation_score)
        .bind(user.total_earned)
        .bind(user.total_spent)
        .bind(user.completed_jobs)
        .bind(user.rating)
        .bind(user.created_at)
        .execute(&self.pool)
        .await?;
        Ok(user)
    }

    async fn update_user(&self, id: &str, patch: UserPatch) -> Result<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET \
                bio = COALESCE($2, bio), \
                avatar = COALESCE($3, avatar), \
                skills = COALESCE($4, skills), \
                reputation_score = COALESCE($5, reputation_score), \
                total_earned = COALESCE($6, total_earned), \
                total_spent = COALESCE($7, total_spent), \
                completed_jobs = COALESCE($8, completed_jobs), \
                rating = COALESCE($9, rating) \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(patch.bio)
        .bind(patch.avatar)
        .bind(patch.skills)
        .bind(patch.reputation_score)
        .bind(patch.total_earned)
        .bind(patch.total_spent)
        .bind(patch.completed_jobs)
        .bind(patch.rating)
        .fetch_optional(&self.pool)
        .await?;
        user.ok_or(StorageError::NotFound("user"))
    }

    async fn get_jobs(&self, filter: JobFilter) -> Result<Vec<Job>> {
        let jobs = sqlx::query_as::<_, Job>(&format!(
            "SELECT {JOB_COLUMNS} FROM jobs \
             WHERE ($1::text IS NULL OR category = $1) \
               AND ($2::text IS NULL OR status = $2) \
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(filter.category)
        .bind(filter.status)
        .fetch_all(&self.pool)
        .await?;
        Ok(jobs)
    }

    async fn get_job(&self, id: &str) -> Result<Option<Job>> {
        let job = sqlx::query_as::<_, Job>(&format!(
            "SELECT {JOB_COLUMNS} FROM jobs WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(job)
    }

    async fn create_job(&self, insert: NewJob) -> Result<Job> {
        let job = Job::new(insert);
        sqlx::query(&format!(
            "INSERT INTO jobs ({JOB_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)"
        ))
        .bind(&job.id)
        .bind(&job.client_id)
        .bind(&job.title)
        .bind(&job.description)
        .bind(&job.category)
        .bind(job.budget)
        .bind(&job.currency)
        .bind(job.deadline)
        .bind(&job.skills)
        .bind(&job.status)
        .bind(job.escrow_funded)
        .bind(&job.assigned_freelancer_id)
        .bind(job.created_at)
        .bind(job.completed_at)
        .execute(&self.pool)
        .await?;
        Ok(job)
    }

    async fn update_job(&self, id: &str, patch: JobPatch) -> Result<Job> {
        let job = sqlx::query_as::<_, Job>(&format!(
            "UPDATE jobs SET \
                title = COALESCE($2, title), \
                description = COALESCE($3, description), \
                category = COALESCE($4, category), \
                budget = COALESCE($5, budget), \
                currency = COALESCE($6, currency), \
                deadline = COALESCE($7, deadline), \
                skills = COALESCE($8, skills), \
                status = COALESCE($9, status), \
                escrow_funded = COALESCE($10, escrow_funded), \
                assigned_freelancer_id = COALESCE($11, assigned_freelancer_id), \
                completed_at = COALESCE($12, completed_at) \
             WHERE id = $1 RETURNING {JOB_COLUMNS}"
        ))
        .bind(id)
        .bind(patch.title)
        .bind(patch.description)
        .bind(patch.category)
        .bind(patch.budget)
        .bind(patch.currency)
        .bind(patch.deadline)
        .bind(patch.skills)
        .bind(patch.status)
        .bind(patch.escrow_funded)
        .bind(patch.assigned_freelancer_id)
        .bind(patch.completed_at)
        .fetch_optional(&self.pool)
        .await?;
        job.ok_or(StorageError::NotFound("job"))
    }

    async fn get_applications(&self, job_id: &str) -> Result<Vec<Application>> {
        let apps = sqlx::query_as::<_, Application>(&format!(
            "SELECT {APPLICATION_COLUMNS} FROM applications \
             WHERE job_id = $1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(job_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(apps)
    }

    async fn find_application(
        &self,
        job_id: &str,
        freelancer_id: &str,
    ) -> Result<Option<Application>> {
        let app = sqlx::query_as::<_, Application>(&format!(
            "SELECT {APPLICATION_COLUMNS} FROM applications \
             WHERE job_id = $1 AND freelancer_id = $2"
        ))
        .bind(job_id)
        .bind(freelancer_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(app)
    }

    async fn create_application(&self, insert: NewApplication) -> Result<Application> {
        let app = Application::new(insert);
        sqlx::query(&format!(
            "INSERT INTO applications ({APPLICATION_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"
        ))
        .bind(&app.id)
        .bind(&app.job_id)
        .bind(&app.freelancer_id)
        .bind(&app.proposal)
        .bind(&app.estimated_delivery)
        .bind(&app.portfolio_link)
        .bind(&app.status)
        .bind(app.created_at)
        .execute(&self.pool)
        .await?;
        Ok(app)
    }

    async fn update_application(&self, id: &str, patch: ApplicationPatch) -> Result<Application> {
        let app = sqlx::query_as::<_, Application>(&format!(
            "UPDATE applications SET \
                proposal = COALESCE($2, proposal), \
                estimated_delivery = COALESCE($3, estimated_delivery), \
                portfolio_link = COALESCE($4, portfolio_link), \
                status = COALESCE($5, status) \
             WHERE id = $1 RETURNING {APPLICATION_COLUMNS}"
        ))
        .bind(id)
        .bind(patch.proposal)
        .bind(patch.estimated_delivery)
        .bind(patch.portfolio_link)
        .bind(patch.status)
        .fetch_optional(&self.pool)
        .await?;
        app.ok_or(StorageError::NotFound("application"))
    }

    async fn get_messages(&self, job_id: &str) -> Result<Vec<Message>> {
        let msgs = sqlx::query_as::<_, Message>(
            "SELECT id, job_id, sender_id, content, created_at FROM messages \
             WHERE job_id = $1 ORDER BY created_at ASC, id ASC",
        )
        .bind(job_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(msgs)
    }

    async fn create_message(&self, insert: NewMessage) -> Result<Message> {
        let msg = Message::new(insert);
        sqlx::query(
            "INSERT INTO messages (id, job_id, sender_id, content, created_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(&msg.id)
        .bind(&msg.job_id)
        .bind(&msg.sender_id)
        .bind(&msg.content)
        .bind(msg.created_at)
        .execute(&self.pool)
        .await?;
        Ok(msg)
    }

    async fn get_disputes(&self, job_id: Option<&str>) -> Result<Vec<Dispute>> {
        let disputes = sqlx::query_as::<_, Dispute>(&format!(
            "SELECT {DISPUTE_COLUMNS} FROM disputes \
             WHERE ($1::text IS NULL OR job_id = $1) \
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(job_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(disputes)
    }

    async fn create_dispute(&self, insert: NewDispute) -> Result<Dispute> {
        let dispute = Dispute::new(insert);
        sqlx::query(&format!(
            "INSERT INTO disputes ({DISPUTE_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)"
        ))
        .bind(&dispute.id)
        .bind(&dispute.job_id)
        .bind(&dispute.raised_by)
        .bind(&dispute.reason)
        .bind(&dispute.evidence)
        .bind(&dispute.status)
        .bind(&dispute.resolution)
        .bind(&dispute.winner)
        .bind(&dispute.ai_recommendation)
        .bind(dispute.created_at)
        .bind(dispute.resolved_at)
        .execute(&self.pool)
        .await?;
        Ok(dispute)
    }

    async fn update_dispute(&self, id: &str, patch: DisputePatch) -> Result<Dispute> {
        let dispute = sqlx::query_as::<_, Dispute>(&format!(
            "UPDATE disputes SET \
                status = COALESCE($2, status), \
                resolution = COALESCE($3, resolution), \
                winner = COALESCE($4, winner), \
                ai_recommendation = COALESCE($5, ai_recommendation), \
                resolved_at = COALESCE($6, resolved_at) \
             WHERE id = $1 RETURNING {DISPUTE_COLUMNS}"
        ))
        .bind(id)
        .bind(patch.status)
        .bind(patch.resolution)
        .bind(patch.winner)
        .bind(patch.ai_recommendation)
        .bind(patch.resolved_at)
        .fetch_optional(&self.pool)
        .await?;
        dispute.ok_or(StorageError::NotFound("dispute"))
    }

    async fn get_work_nfts(&self, freelancer_id: &str) -> Result<Vec<WorkNft>> {
        let nfts = sqlx::query_as::<_, WorkNft>(&format!(
            "SELECT {NFT_COLUMNS} FROM work_nfts \
             WHERE freelancer_id = $1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(freelancer_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(nfts)
    }

    async fn create_work_nft(&self, insert: NewWorkNft) -> Result<WorkNft> {
        let nft = WorkNft::mint(insert);
        sqlx::query(&format!(
            "INSERT INTO work_nfts ({NFT_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)"
        ))
        .bind(&nft.id)
        .bind(&nft.job_id)
        .bind(&nft.freelancer_id)
        .bind(&nft.client_id)
        .bind(&nft.job_title)
        .bind(nft.rating)
        .bind(nft.amount)
        .bind(&nft.currency)
        .bind(&nft.token_id)
        .bind(&nft.ipfs_hash)
        .bind(&nft.polygon_scan_url)
        .bind(nft.created_at)
        .execute(&self.pool)
        .await?;
        Ok(nft)
    }
}
