use serde::Deserialize;

/// Which persistence driver backs the storage trait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    Mongo,
    Postgres,
    Memory,
}

impl StorageKind {
    fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "mongo" | "mongodb" => StorageKind::Mongo,
            "memory" => StorageKind::Memory,
            // Anything else selects the relational driver.
            _ => StorageKind::Postgres,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub storage: StorageKind,
    pub database_url: Option<String>,
    pub mongodb_uri: Option<String>,
    pub mongodb_db: String,
    pub openai_api_key: Option<String>,
    pub sideshift_secret: Option<String>,
    pub sideshift_affiliate_id: Option<String>,
}

fn non_empty(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|v| !v.is_empty())
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let storage = std::env::var("STORAGE")
            .map(|v| StorageKind::parse(&v))
            .unwrap_or(StorageKind::Mongo);

        Ok(Self {
            storage,
            database_url: non_empty("DATABASE_URL"),
            mongodb_uri: non_empty("MONGODB_URI"),
            mongodb_db: std::env::var("MONGODB_DB").unwrap_or_else(|_| "taskgrid".into()),
            openai_api_key: non_empty("OPENAI_API_KEY"),
            sideshift_secret: non_empty("SIDESHIFT_SECRET"),
            sideshift_affiliate_id: non_empty("SIDESHIFT_AFFILIATE_ID"),
        })
    }
}
