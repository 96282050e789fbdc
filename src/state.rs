use std::sync::Arc;

use crate::clients::{OpenAiClient, SideShiftClient};
use crate::config::AppConfig;
use crate::storage::{self, Storage};
use crate::ws::ChatHub;

/// Shared per-request state: the selected storage driver, the two
/// third-party clients and the chat broadcast hub, all constructed once at
/// startup and injected rather than reached for globally.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub storage: Arc<dyn Storage>,
    pub ai: Arc<OpenAiClient>,
    pub swap: Arc<SideShiftClient>,
    pub chat: ChatHub,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);
        let storage = storage::connect(&config).await?;

        if config.openai_api_key.is_none() {
            tracing::warn!("OPENAI_API_KEY not set; AI matching and dispute assistance disabled");
        }

        let ai = Arc::new(OpenAiClient::new(config.openai_api_key.clone()));
        let swap = Arc::new(SideShiftClient::new(
            config.sideshift_secret.clone(),
            config.sideshift_affiliate_id.clone(),
        ));

        Ok(Self {
            config,
            storage,
            ai,
            swap,
            chat: ChatHub::new(),
        })
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        storage: Arc<dyn Storage>,
        ai: Arc<OpenAiClient>,
        swap: Arc<SideShiftClient>,
    ) -> Self {
        Self {
            config,
            storage,
            ai,
            swap,
            chat: ChatHub::new(),
        }
    }

    /// In-memory state for tests: memory driver, disabled LLM client and a
    /// swap client pointed at an unreachable upstream.
    pub fn fake() -> Self {
        use crate::config::StorageKind;
        use crate::storage::MemoryStorage;

        let config = Arc::new(AppConfig {
            storage: StorageKind::Memory,
            database_url: None,
            mongodb_uri: None,
            mongodb_db: "taskgrid".into(),
            openai_api_key: None,
            sideshift_secret: None,
            sideshift_affiliate_id: None,
        });
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let ai = Arc::new(OpenAiClient::new(None));
        let swap = Arc::new(SideShiftClient::with_base_url(
            "http://127.0.0.1:9/api/v2",
            None,
            None,
        ));
        Self::from_parts(config, storage, ai, swap)
    }
}
