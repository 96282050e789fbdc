//! LLM adapter: job matching and dispute-resolution assistance via the
//! chat-completions API. Both calls serialize a natural-language prompt,
//! require the reply to parse as a fixed JSON shape, and fall back to inert
//! defaults when no API key is configured or anything fails.

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;

const OPENAI_API_URL: &str = "https://api.openai.com/v1";
const MODEL: &str = "gpt-5";

/// Open-job summary handed to the matcher.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobBrief {
    pub id: String,
    pub title: String,
    pub description: String,
    pub skills: Vec<String>,
    pub category: String,
}

/// One line of a freelancer's work history (their completion certificates).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkSummary {
    pub job_title: String,
    pub rating: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobMatch {
    pub job_id: String,
    pub score: f64,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisputeRuling {
    /// "client" or "freelancer".
    pub recommendation: String,
    pub reasoning: String,
    /// Clamped into [0, 1].
    pub confidence: f64,
}

#[derive(Debug, Clone)]
pub struct DisputeContext {
    pub job_title: String,
    pub reason: String,
    pub client_evidence: String,
    pub freelancer_evidence: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Completion {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MatchPayload {
    #[serde(default)]
    matches: Vec<JobMatch>,
}

#[derive(Debug, Deserialize)]
struct RulingPayload {
    recommendation: Option<String>,
    reasoning: Option<String>,
    confidence: Option<f64>,
}

pub struct OpenAiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl OpenAiClient {
    /// A client without an API key is disabled: every call resolves to its
    /// fallback without touching the network.
    pub fn new(api_key: Option<String>) -> Self {
        Self::with_base_url(OPENAI_API_URL, api_key)
    }

    pub fn with_base_url(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key,
        }
    }

    async fn complete_json(&self, system: &str, user: &str) -> anyhow::Result<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("no API key configured"))?;

        let body = json!({
            "model": MODEL,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user },
            ],
            "response_format": { "type": "json_object" },
            "max_completion_tokens": 2048,
        });

        let completion: Completion = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| anyhow::anyhow!("completion had no content"))
    }

    /// Rank open jobs against a freelancer's skills and work history.
    /// Empty match list when disabled or on any network/parse failure.
    pub async fn match_jobs(
        &self,
        freelancer_skills: &[String],
        freelancer_history: &[WorkSummary],
        available_jobs: &[JobBrief],
    ) -> Vec<JobMatch> {
        if self.api_key.is_none() {
            return Vec::new();
        }

        let system = "You are an AI job matching expert for a freelance marketplace. \
            Analyze freelancer skills and work history to recommend the best job matches. \
            Respond with JSON in this format: \
            { 'matches': [{ 'jobId': string, 'score': number (0-100), 'reason': string }] }";

        let history = freelancer_history
            .iter()
            .map(|w| format!("{} ({}/5 rating)", w.job_title, w.rating))
            .collect::<Vec<_>>()
            .join("; ");
        let jobs = available_jobs
            .iter()
            .enumerate()
            .map(|(i, job)| {
                format!(
                    "{}. ID: {}, Title: {}, Category: {}, Required Skills: {}",
                    i + 1,
                    job.id,
                    job.title,
                    job.category,
                    job.skills.join(", ")
                )
            })
            .collect::<Vec<_>>()
            .join("\n");
        let user = format!(
            "Freelancer Profile:\nSkills: {}\nPast Work: {}\n\nAvailable Jobs:\n{}\n\n\
             Recommend the top 5 best matches with scores and reasons.",
            freelancer_skills.join(", "),
            history,
            jobs
        );

        let result: anyhow::Result<Vec<JobMatch>> = async {
            let content = self.complete_json(system, &user).await?;
            let payload: MatchPayload = serde_json::from_str(&content)?;
            Ok(payload.matches)
        }
        .await;

        match result {
            Ok(matches) => matches,
            Err(e) => {
                warn!(error = %e, "AI job matching failed");
                Vec::new()
            }
        }
    }

    /// Recommend a dispute winner from both sides' evidence. Returns the
    /// fixed "client wins, zero confidence" ruling when disabled or failing.
    pub async fn resolve_dispute(&self, dispute: &DisputeContext) -> DisputeRuling {
        if self.api_key.is_none() {
            return DisputeRuling {
                recommendation: "client".into(),
                reasoning: "AI disabled".into(),
                confidence: 0.0,
            };
        }

        let system = "You are an impartial AI dispute resolver for a freelance marketplace. \
            Analyze evidence from both parties and provide a fair recommendation. \
            Respond with JSON in this format: \
            { 'recommendation': 'client' or 'freelancer', 'reasoning': string, 'confidence': number (0-1) }";

        let freelancer_section = match &dispute.freelancer_evidence {
            Some(evidence) => format!("Freelancer's Evidence:\n{evidence}"),
            None => "Freelancer has not provided evidence yet.".into(),
        };
        let user = format!(
            "Dispute for Job: {}\n\nDispute Reason: {}\n\nClient's Evidence:\n{}\n\n{}\n\n\
             Based on the evidence, who should win this dispute?",
            dispute.job_title, dispute.reason, dispute.client_evidence, freelancer_section
        );

        let result: anyhow::Result<RulingPayload> = async {
            let content = self.complete_json(system, &user).await?;
            Ok(serde_json::from_str(&content)?)
        }
        .await;

        match result {
            Ok(payload) => DisputeRuling {
                recommendation: payload.recommendation.unwrap_or_else(|| "client".into()),
                reasoning: payload
                    .reasoning
                    .unwrap_or_else(|| "Unable to determine".into()),
                confidence: payload.confidence.unwrap_or(0.5).clamp(0.0, 1.0),
            },
            Err(e) => {
                warn!(error = %e, "AI dispute resolution failed");
                DisputeRuling {
                    recommendation: "client".into(),
                    reasoning: "AI analysis unavailable".into(),
                    confidence: 0.0,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dispute() -> DisputeContext {
        DisputeContext {
            job_title: "T".into(),
            reason: "late delivery".into(),
            client_evidence: "missed the deadline".into(),
            freelancer_evidence: None,
        }
    }

    #[tokio::test]
    async fn disabled_client_returns_fallbacks_without_network() {
        let client = OpenAiClient::new(None);
        let matches = client.match_jobs(&["Rust".into()], &[], &[]).await;
        assert!(matches.is_empty());

        let ruling = client.resolve_dispute(&dispute()).await;
        assert_eq!(ruling.recommendation, "client");
        assert_eq!(ruling.confidence, 0.0);
    }

    #[tokio::test]
    async fn unreachable_upstream_degrades_to_fallback_ruling() {
        let client = OpenAiClient::with_base_url("http://127.0.0.1:9/v1", Some("k".into()));
        let ruling = client.resolve_dispute(&dispute()).await;
        assert_eq!(ruling.recommendation, "client");
        assert_eq!(ruling.reasoning, "AI analysis unavailable");
        assert_eq!(ruling.confidence, 0.0);
    }
}
