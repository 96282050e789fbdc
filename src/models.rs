//! Wire/storage models for the six marketplace entities.
//!
//! One struct per entity serves three masters: the JSON API (camelCase via
//! serde), the relational driver (snake_case columns via `sqlx::FromRow`) and
//! the document driver (documents are the serde image, so they look exactly
//! like the API payloads). Timestamps travel as RFC 3339 strings, which also
//! keeps document-store sorts chronological.

use rand::distributions::Alphanumeric;
use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

pub const JOB_OPEN: &str = "open";
pub const JOB_IN_PROGRESS: &str = "in_progress";
pub const JOB_COMPLETED: &str = "completed";

pub const APPLICATION_PENDING: &str = "pending";
pub const APPLICATION_ACCEPTED: &str = "accepted";

pub const DISPUTE_OPEN: &str = "open";
pub const DISPUTE_RESOLVED: &str = "resolved";

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub wallet_address: String,
    pub username: String,
    pub bio: Option<String>,
    pub avatar: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    pub reputation_score: i32,
    pub total_earned: Decimal,
    pub total_spent: Decimal,
    pub completed_jobs: i32,
    pub rating: Decimal,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub wallet_address: String,
    pub username: String,
    pub bio: Option<String>,
    pub avatar: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
}

impl User {
    /// Build a fresh record with zeroed aggregates, the way the creation
    /// endpoint defines a new account.
    pub fn new(insert: NewUser) -> Self {
        Self {
            id: new_id(),
            wallet_address: insert.wallet_address,
            username: insert.username,
            bio: insert.bio,
            avatar: insert.avatar,
            skills: insert.skills,
            reputation_score: 0,
            total_earned: Decimal::ZERO,
            total_spent: Decimal::ZERO,
            completed_jobs: 0,
            rating: Decimal::ZERO,
            created_at: OffsetDateTime::now_utc(),
        }
    }
}

/// Partial update; only set fields are written.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skills: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reputation_score: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_earned: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_spent: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_jobs: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<Decimal>,
}

// ---------------------------------------------------------------------------
// Job
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: String,
    pub client_id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub budget: Decimal,
    pub currency: String,
    #[serde(with = "time::serde::rfc3339")]
    pub deadline: OffsetDateTime,
    pub skills: Vec<String>,
    pub status: String,
    pub escrow_funded: bool,
    pub assigned_freelancer_id: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub completed_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone)]
pub struct NewJob {
    pub client_id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub budget: Decimal,
    pub currency: String,
    pub deadline: OffsetDateTime,
    pub skills: Vec<String>,
}

impl Job {
    /// New jobs always open, unescrowed, unassigned.
    pub fn new(insert: NewJob) -> Self {
        Self {
            id: new_id(),
            client_id: insert.client_id,
            title: insert.title,
            description: insert.description,
            category: insert.category,
            budget: insert.budget,
            currency: insert.currency,
            deadline: insert.deadline,
            skills: insert.skills,
            status: JOB_OPEN.into(),
            escrow_funded: false,
            assigned_freelancer_id: None,
            created_at: OffsetDateTime::now_utc(),
            completed_at: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub deadline: Option<OffsetDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skills: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub escrow_funded: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_freelancer_id: Option<String>,
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub completed_at: Option<OffsetDateTime>,
}

// ---------------------------------------------------------------------------
// Application
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: String,
    pub job_id: String,
    pub freelancer_id: String,
    pub proposal: String,
    pub estimated_delivery: String,
    pub portfolio_link: Option<String>,
    pub status: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewApplication {
    pub job_id: String,
    pub freelancer_id: String,
    pub proposal: String,
    pub estimated_delivery: String,
    pub portfolio_link: Option<String>,
}

impl Application {
    pub fn new(insert: NewApplication) -> Self {
        Self {
            id: new_id(),
            job_id: insert.job_id,
            freelancer_id: insert.freelancer_id,
            proposal: insert.proposal,
            estimated_delivery: insert.estimated_delivery,
            portfolio_link: insert.portfolio_link,
            status: APPLICATION_PENDING.into(),
            created_at: OffsetDateTime::now_utc(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proposal: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_delivery: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub portfolio_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub job_id: String,
    pub sender_id: String,
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMessage {
    pub job_id: String,
    pub sender_id: String,
    pub content: String,
}

impl Message {
    pub fn new(insert: NewMessage) -> Self {
        Self {
            id: new_id(),
            job_id: insert.job_id,
            sender_id: insert.sender_id,
            content: insert.content,
            created_at: OffsetDateTime::now_utc(),
        }
    }
}

// ---------------------------------------------------------------------------
// Dispute
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Dispute {
    pub id: String,
    pub job_id: String,
    pub raised_by: String,
    pub reason: String,
    pub evidence: Option<String>,
    pub status: String,
    pub resolution: Option<String>,
    pub winner: Option<String>,
    pub ai_recommendation: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub resolved_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDispute {
    pub job_id: String,
    pub raised_by: String,
    pub reason: String,
    pub evidence: Option<String>,
}

impl Dispute {
    pub fn new(insert: NewDispute) -> Self {
        Self {
            id: new_id(),
            job_id: insert.job_id,
            raised_by: insert.raised_by,
            reason: insert.reason,
            evidence: insert.evidence,
            status: DISPUTE_OPEN.into(),
            resolution: None,
            winner: None,
            ai_recommendation: None,
            created_at: OffsetDateTime::now_utc(),
            resolved_at: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisputePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_recommendation: Option<String>,
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub resolved_at: Option<OffsetDateTime>,
}

// ---------------------------------------------------------------------------
// WorkNft
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct WorkNft {
    pub id: String,
    pub job_id: String,
    pub freelancer_id: String,
    pub client_id: String,
    pub job_title: String,
    pub rating: i32,
    pub amount: Decimal,
    pub currency: String,
    pub token_id: Option<String>,
    pub ipfs_hash: Option<String>,
    pub polygon_scan_url: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewWorkNft {
    pub job_id: String,
    pub freelancer_id: String,
    pub client_id: String,
    pub job_title: String,
    pub rating: i32,
    pub amount: Decimal,
    pub currency: String,
}

fn random_suffix(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(|c| (c as char).to_ascii_lowercase())
        .collect()
}

impl WorkNft {
    /// "Mint" a completion certificate. The token id, content hash and
    /// explorer URL are opaque generated strings, not on-chain artifacts.
    pub fn mint(insert: NewWorkNft) -> Self {
        let now = OffsetDateTime::now_utc();
        let millis = now.unix_timestamp_nanos() / 1_000_000;
        let token_id = format!("TG-NFT-{}-{}", millis, random_suffix(6));
        let ipfs_hash = format!("Qm{}", random_suffix(13));
        let polygon_scan_url = format!("https://polygonscan.com/token/{token_id}");
        Self {
            id: new_id(),
            job_id: insert.job_id,
            freelancer_id: insert.freelancer_id,
            client_id: insert.client_id,
            job_title: insert.job_title,
            rating: insert.rating,
            amount: insert.amount,
            currency: insert.currency,
            token_id: Some(token_id),
            ipfs_hash: Some(ipfs_hash),
            polygon_scan_url: Some(polygon_scan_url),
            created_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn sample_job() -> NewJob {
        NewJob {
            client_id: "u1".into(),
            title: "T".into(),
            description: "D".into(),
            category: "Design".into(),
            budget: Decimal::new(100, 0),
            currency: "USDC".into(),
            deadline: OffsetDateTime::now_utc(),
            skills: vec!["Figma".into()],
        }
    }

    #[test]
    fn new_job_defaults() {
        let job = Job::new(sample_job());
        assert_eq!(job.status, JOB_OPEN);
        assert!(!job.escrow_funded);
        assert!(job.assigned_freelancer_id.is_none());
        assert!(job.completed_at.is_none());

        let other = Job::new(sample_job());
        assert_ne!(job.id, other.id);
    }

    #[test]
    fn job_serializes_camel_case() {
        let job = Job::new(sample_job());
        let v = serde_json::to_value(&job).unwrap();
        assert_eq!(v["status"], "open");
        assert_eq!(v["escrowFunded"], false);
        assert_eq!(v["budget"], "100");
        assert!(v["createdAt"].as_str().unwrap().contains('T'));
    }

    #[test]
    fn minted_nft_has_cosmetic_fields() {
        let nft = WorkNft::mint(NewWorkNft {
            job_id: "j1".into(),
            freelancer_id: "f1".into(),
            client_id: "c1".into(),
            job_title: "T".into(),
            rating: 5,
            amount: Decimal::new(500, 0),
            currency: "USDC".into(),
        });
        let token = nft.token_id.as_deref().unwrap();
        assert!(token.starts_with("TG-NFT-"));
        assert!(nft.ipfs_hash.as_deref().unwrap().starts_with("Qm"));
        assert_eq!(
            nft.polygon_scan_url.as_deref().unwrap(),
            format!("https://polygonscan.com/token/{token}")
        );
    }

    #[test]
    fn patch_serializes_only_set_fields() {
        let patch = JobPatch {
            status: Some(JOB_IN_PROGRESS.into()),
            assigned_freelancer_id: Some("f1".into()),
            ..Default::default()
        };
        let v = serde_json::to_value(&patch).unwrap();
        assert_eq!(v.as_object().unwrap().len(), 2);
        assert_eq!(v["status"], "in_progress");
        assert_eq!(v["assignedFreelancerId"], "f1");
    }
}
