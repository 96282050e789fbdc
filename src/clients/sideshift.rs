//! SideShift coin-swap client: list coins, quote a pair, create a fixed
//! shift, poll shift status. Every call catches and logs its failure and
//! degrades (`Vec`/`None`); callers treat `None` as "temporarily
//! unavailable", never as a hard error.

use serde::{Deserialize, Serialize};
use tracing::warn;

const SIDESHIFT_API_URL: &str = "https://api.sideshift.ai/v2";
const SECRET_HEADER: &str = "x-sideshift-secret";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Coin {
    pub id: String,
    pub name: String,
    pub network: String,
    pub symbol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub id: String,
    pub deposit_coin: String,
    pub settle_coin: String,
    pub deposit_amount: String,
    pub settle_amount: String,
    pub rate: String,
    pub expires_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shift {
    pub id: String,
    #[serde(rename = "type")]
    pub shift_type: String,
    pub deposit_coin: String,
    pub settle_coin: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deposit_amount: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settle_amount: Option<String>,
    pub deposit_address: String,
    pub settle_address: String,
    pub status: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversion {
    pub converted_amount: String,
    pub rate: String,
    pub quote_id: String,
}

#[derive(Debug, Deserialize)]
struct CoinsPayload {
    #[serde(default)]
    coins: Vec<Coin>,
}

pub struct SideShiftClient {
    http: reqwest::Client,
    base_url: String,
    secret: Option<String>,
    affiliate_id: Option<String>,
}

impl SideShiftClient {
    pub fn new(secret: Option<String>, affiliate_id: Option<String>) -> Self {
        Self::with_base_url(SIDESHIFT_API_URL, secret, affiliate_id)
    }

    /// Injectable base URL, used by tests to exercise the degraded paths.
    pub fn with_base_url(
        base_url: impl Into<String>,
        secret: Option<String>,
        affiliate_id: Option<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            secret,
            affiliate_id,
        }
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        let mut req = self.http.get(format!("{}{}", self.base_url, path));
        if let Some(secret) = &self.secret {
            req = req.header(SECRET_HEADER, secret);
        }
        req
    }

    /// Coins available for swapping; the fixed five-coin list on any failure.
    pub async fn get_available_coins(&self) -> Vec<Coin> {
        match self.fetch_coins().await {
            Ok(coins) => coins,
            Err(e) => {
                warn!(error = %e, "failed to fetch available coins, using fallback list");
                fallback_coins()
            }
        }
    }

    async fn fetch_coins(&self) -> reqwest::Result<Vec<Coin>> {
        let payload: CoinsPayload = self
            .get("/coins")
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(payload.coins)
    }

    /// Time-bounded exchange-rate offer for a coin pair and amount.
    pub async fn get_quote(
        &self,
        deposit_coin: &str,
        settle_coin: &str,
        deposit_amount: Option<&str>,
        settle_amount: Option<&str>,
    ) -> Option<Quote> {
        let mut params = vec![
            ("depositCoin", deposit_coin),
            ("settleCoin", settle_coin),
        ];
        if let Some(amount) = deposit_amount {
            params.push(("depositAmount", amount));
        }
        if let Some(amount) = settle_amount {
            params.push(("settleAmount", amount));
        }

        let result: reqwest::Result<Quote> = async {
            self.get("/quotes")
                .query(&params)
                .send()
                .await?
                .error_for_status()?
                .json()
                .await
        }
        .await;

        match result {
            Ok(quote) => Some(quote),
            Err(e) => {
                warn!(error = %e, deposit_coin, settle_coin, "failed to get quote");
                None
            }
        }
    }

    /// Lock in a quote: create a fixed-rate shift to the settle address.
    pub async fn create_fixed_shift(
        &self,
        quote_id: &str,
        settle_address: &str,
        affiliate_id: Option<&str>,
    ) -> Option<Shift> {
        let body = serde_json::json!({
            "type": "fixed",
            "quoteId": quote_id,
            "settleAddress": settle_address,
            "affiliateId": affiliate_id.or(self.affiliate_id.as_deref()),
        });

        let result: reqwest::Result<Shift> = async {
            let mut req = self
                .http
                .post(format!("{}/shifts", self.base_url))
                .json(&body);
            if let Some(secret) = &self.secret {
                req = req.header(SECRET_HEADER, secret);
            }
            req.send().await?.error_for_status()?.json().await
        }
        .await;

        match result {
            Ok(shift) => Some(shift),
            Err(e) => {
                warn!(error = %e, quote_id, "failed to create shift");
                None
            }
        }
    }

    pub async fn get_shift_status(&self, shift_id: &str) -> Option<Shift> {
        let result: reqwest::Result<Shift> = async {
            self.get(&format!("/shifts/{shift_id}"))
                .send()
                .await?
                .error_for_status()?
                .json()
                .await
        }
        .await;

        match result {
            Ok(shift) => Some(shift),
            Err(e) => {
                warn!(error = %e, shift_id, "failed to get shift status");
                None
            }
        }
    }

    /// Convert an arbitrary coin into the marketplace base currency by
    /// quoting the pair; the payment-conversion entry point.
    pub async fn convert_to_base_currency(
        &self,
        from_coin: &str,
        amount: &str,
        to_coin: &str,
    ) -> Option<Conversion> {
        let quote = self.get_quote(from_coin, to_coin, Some(amount), None).await?;
        Some(Conversion {
            converted_amount: quote.settle_amount,
            rate: quote.rate,
            quote_id: quote.id,
        })
    }
}

/// Popular coins served when the upstream API is unreachable.
pub fn fallback_coins() -> Vec<Coin> {
    [
        ("USDC", "USD Coin", "POLYGON"),
        ("MATIC", "Polygon", "POLYGON"),
        ("ETH", "Ethereum", "ETHEREUM"),
        ("BTC", "Bitcoin", "BITCOIN"),
        ("USDT", "Tether", "POLYGON"),
    ]
    .into_iter()
    .map(|(id, name, network)| Coin {
        id: id.into(),
        name: name.into(),
        network: network.into(),
        symbol: id.into(),
        icon: None,
    })
    .collect()
}
