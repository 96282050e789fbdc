//! Seed the configured storage driver with demo users and open jobs.
//!
//! Usage: `STORAGE=... cargo run --bin seed`

use rust_decimal::Decimal;
use time::{Duration, OffsetDateTime};

use taskgrid::config::AppConfig;
use taskgrid::models::{NewJob, NewUser, UserPatch};
use taskgrid::storage::{self, Storage};

struct SeedJob {
    title: &'static str,
    description: &'static str,
    category: &'static str,
    budget: &'static str,
    currency: &'static str,
    days_out: i64,
    skills: &'static [&'static str],
}

const SEED_JOBS: &[SeedJob] = &[
    SeedJob {
        title: "Build a Landing Page for DeFi Protocol",
        description: "We need a modern, responsive landing page for our new DeFi protocol. \
            The design should be clean, professional, and showcase our key features. Must \
            include wallet connect integration and work seamlessly on mobile devices.",
        category: "Development",
        budget: "500.00",
        currency: "USDC",
        days_out: 14,
        skills: &["React", "TypeScript", "Web3.js", "Tailwind CSS"],
    },
    SeedJob {
        title: "Design Mobile App UI for NFT Marketplace",
        description: "Looking for a talented designer to create a complete mobile app UI for \
            our NFT marketplace. Should include screens for browsing, buying, selling, and \
            managing NFT collections. Modern, clean aesthetic required.",
        category: "Design",
        budget: "800.00",
        currency: "USDC",
        days_out: 21,
        skills: &["Figma", "UI Design", "Mobile Design", "NFT"],
    },
    SeedJob {
        title: "Smart Contract Audit for Token Launch",
        description: "Need experienced Solidity developer to audit our ERC-20 token smart \
            contract before mainnet deployment. Must check for security vulnerabilities, gas \
            optimizations, and best practices.",
        category: "Development",
        budget: "1200.00",
        currency: "USDC",
        days_out: 10,
        skills: &["Solidity", "Security", "Smart Contracts", "Ethereum"],
    },
    SeedJob {
        title: "Write Technical Documentation for API",
        description: "Create comprehensive technical documentation for our blockchain API. \
            Should include getting started guide, endpoint references, code examples, and \
            best practices. Clear and developer-friendly writing required.",
        category: "Writing",
        budget: "350.00",
        currency: "USDC",
        days_out: 7,
        skills: &["Technical Writing", "API Documentation", "Markdown"],
    },
    SeedJob {
        title: "Create Explainer Video for DApp",
        description: "Need a 60-90 second animated explainer video that shows how our \
            decentralized application works. Should be engaging, clear, and suitable for \
            social media marketing.",
        category: "Video & Animation",
        budget: "600.00",
        currency: "MATIC",
        days_out: 20,
        skills: &["Video Production", "Animation", "Motion Graphics"],
    },
];

async fn seed_user(
    storage: &dyn Storage,
    insert: NewUser,
    patch: UserPatch,
) -> anyhow::Result<String> {
    let user = storage.create_user(insert).await?;
    storage.update_user(&user.id, patch).await?;
    Ok(user.id)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "taskgrid=info,seed=info".into()),
        )
        .init();

    let config = AppConfig::from_env()?;
    let storage = storage::connect(&config).await?;

    tracing::info!("seeding database");

    let client_id = seed_user(
        storage.as_ref(),
        NewUser {
            wallet_address: "0x742d35Cc6634C0532925a3b844Bc9e7595E8f301".into(),
            username: "cryptoentrepreneur".into(),
            bio: Some("Building the next generation of Web3 applications".into()),
            avatar: None,
            skills: vec!["Product Management".into(), "Web3".into(), "Blockchain".into()],
        },
        UserPatch {
            reputation_score: Some(88),
            total_spent: Some("4500.00".parse::<Decimal>()?),
            completed_jobs: Some(8),
            rating: Some("4.6".parse::<Decimal>()?),
            ..Default::default()
        },
    )
    .await?;

    seed_user(
        storage.as_ref(),
        NewUser {
            wallet_address: "0x8B3C5f2a1d9e4F7b8A6c3D2e1f0B9A8C7D6E5F4A".into(),
            username: "alexweb3".into(),
            bio: Some(
                "Full-stack developer specializing in Web3 and blockchain applications. \
                 5 years of experience building decentralized platforms."
                    .into(),
            ),
            avatar: None,
            skills: vec![
                "React".into(),
                "TypeScript".into(),
                "Solidity".into(),
                "Node.js".into(),
                "Web3.js".into(),
                "UI/UX Design".into(),
            ],
        },
        UserPatch {
            reputation_score: Some(95),
            total_earned: Some("12450.50".parse::<Decimal>()?),
            completed_jobs: Some(24),
            rating: Some("4.9".parse::<Decimal>()?),
            ..Default::default()
        },
    )
    .await?;

    seed_user(
        storage.as_ref(),
        NewUser {
            wallet_address: "0x1A2B3C4D5E6F7A8B9C0D1E2F3A4B5C6D7E8F9A0B".into(),
            username: "designpro".into(),
            bio: Some("Creative designer focused on stunning UI/UX for Web3 projects".into()),
            avatar: None,
            skills: vec![
                "Figma".into(),
                "UI Design".into(),
                "UX Design".into(),
                "Branding".into(),
                "Illustration".into(),
            ],
        },
        UserPatch {
            reputation_score: Some(92),
            total_earned: Some("8750.00".parse::<Decimal>()?),
            completed_jobs: Some(18),
            rating: Some("4.8".parse::<Decimal>()?),
            ..Default::default()
        },
    )
    .await?;

    let now = OffsetDateTime::now_utc();
    for job in SEED_JOBS {
        storage
            .create_job(NewJob {
                client_id: client_id.clone(),
                title: job.title.into(),
                description: job.description.into(),
                category: job.category.into(),
                budget: job.budget.parse()?,
                currency: job.currency.into(),
                deadline: now + Duration::days(job.days_out),
                skills: job.skills.iter().map(|s| s.to_string()).collect(),
            })
            .await?;
    }

    tracing::info!("database seeded successfully");
    Ok(())
}
