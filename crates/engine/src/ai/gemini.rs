// ABOUTME: Gemini REST client: semantic HTML rewrite and PageSpeed-driven optimization plans.
// ABOUTME: Uses the generateContent endpoint over reqwest; failures surface as Remote/Timeout errors.

use std::time::Duration;

use futures::future::BoxFuture;
use serde::Deserialize;
use serde_json::{json, Value};

use super::prompt::{self, strip_code_fences};
use super::SemanticRewriter;
use crate::error::OptimizeError;
use crate::options::OptionKey;
use crate::recommend::{Priority, Recommendation};

/// Default Gemini model.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Default API base URL.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Environment variable the API key is read from.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Connection settings for [`GeminiClient`].
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl GeminiConfig {
    /// Default config with the key taken from `GEMINI_API_KEY`, if set.
    pub fn from_env() -> Self {
        Self {
            api_key: std::env::var(API_KEY_ENV).ok().filter(|k| !k.trim().is_empty()),
            ..Self::default()
        }
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

// Plan items as the model writes them. Unknown keys and priorities are
// dropped instead of failing the whole plan.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRecommendation {
    title: String,
    #[serde(default)]
    description: String,
    priority: Option<String>,
    option_keys: Option<Vec<String>>,
}

impl From<RawRecommendation> for Recommendation {
    fn from(raw: RawRecommendation) -> Self {
        let priority = raw
            .priority
            .as_deref()
            .and_then(|p| match p.trim().to_lowercase().as_str() {
                "high" => Some(Priority::High),
                "medium" => Some(Priority::Medium),
                "low" => Some(Priority::Low),
                _ => None,
            });
        let option_keys = raw.option_keys.map(|keys| {
            keys.iter()
                .filter_map(|k| k.parse::<OptionKey>().ok())
                .collect::<Vec<_>>()
        });
        Recommendation {
            title: raw.title,
            description: raw.description,
            priority,
            // an empty list would suppress the title fallback
            option_keys: option_keys.filter(|keys| !keys.is_empty()),
        }
    }
}

/// The recommendation returned when no API key is configured.
pub fn missing_key_recommendation() -> Recommendation {
    Recommendation {
        title: "Missing API Key".to_string(),
        description: "Please provide a Gemini API key to generate an AI optimization plan."
            .to_string(),
        priority: Some(Priority::High),
        option_keys: None,
    }
}

// The lighthouse categories and audits are all the model needs.
fn report_digest(report: &Value) -> Value {
    let lighthouse = report
        .pointer("/mobile/lighthouseResult")
        .or_else(|| report.get("lighthouseResult"));
    match lighthouse {
        Some(lh) => json!({
            "categories": lh.get("categories").cloned().unwrap_or(Value::Null),
            "audits": lh.get("audits").cloned().unwrap_or(Value::Null),
        }),
        None => report.clone(),
    }
}

/// Client for the Gemini `generateContent` API.
pub struct GeminiClient {
    config: GeminiConfig,
    http_client: reqwest::Client,
}

impl GeminiClient {
    /// Create a client with its own HTTP connection pool.
    pub fn new(config: GeminiConfig) -> Result<Self, OptimizeError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                OptimizeError::remote(
                    "GeminiClient",
                    Some(anyhow::anyhow!("failed to build HTTP client: {}", e)),
                )
            })?;
        Ok(Self::with_http_client(config, http_client))
    }

    /// Create a client sharing an existing reqwest client.
    pub fn with_http_client(config: GeminiConfig, http_client: reqwest::Client) -> Self {
        Self {
            config,
            http_client,
        }
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    pub fn has_api_key(&self) -> bool {
        self.config.api_key.is_some()
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }

    async fn generate(&self, op: &str, prompt: String, json_mode: bool) -> Result<String, OptimizeError> {
        let Some(key) = self.config.api_key.as_deref() else {
            return Err(OptimizeError::invalid_input(
                op,
                Some(anyhow::anyhow!("Gemini API key not provided")),
            ));
        };

        let mut body = json!({ "contents": [{ "parts": [{ "text": prompt }] }] });
        if json_mode {
            body["generationConfig"] = json!({ "responseMimeType": "application/json" });
        }

        let response = self
            .http_client
            .post(self.endpoint())
            .header("x-goog-api-key", key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    OptimizeError::timeout(op, Some(anyhow::anyhow!("request timed out: {}", e)))
                } else {
                    OptimizeError::remote(op, Some(anyhow::anyhow!("request failed: {}", e)))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            let detail: String = detail.chars().take(200).collect();
            return Err(OptimizeError::remote(
                op,
                Some(anyhow::anyhow!("HTTP {}: {}", status.as_u16(), detail)),
            ));
        }

        let parsed: GenerateResponse = response.json().await.map_err(|e| {
            OptimizeError::remote(op, Some(anyhow::anyhow!("invalid response body: {}", e)))
        })?;

        parsed
            .candidates
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|c| c.parts)
            .find_map(|p| p.text)
            .ok_or_else(|| OptimizeError::remote(op, Some(anyhow::anyhow!("response had no text"))))
    }

    /// Ask the model to rewrite `html` with semantic tags. Code fences are stripped.
    pub async fn rewrite_semantic(&self, html: &str) -> Result<String, OptimizeError> {
        let text = self
            .generate("SemanticRewrite", prompt::semantic_rewrite(html), false)
            .await?;
        let cleaned = strip_code_fences(&text);
        if cleaned.is_empty() {
            return Err(OptimizeError::remote(
                "SemanticRewrite",
                Some(anyhow::anyhow!("model returned empty HTML")),
            ));
        }
        Ok(cleaned.to_string())
    }

    /// Turn a PageSpeed Insights report into a prioritized plan.
    ///
    /// Without an API key this returns the single "Missing API Key" item
    /// rather than an error.
    pub async fn optimization_plan(&self, report: &Value) -> Result<Vec<Recommendation>, OptimizeError> {
        if !self.has_api_key() {
            return Ok(vec![missing_key_recommendation()]);
        }

        let digest = serde_json::to_string(&report_digest(report)).map_err(|e| {
            OptimizeError::invalid_input("OptimizationPlan", Some(anyhow::Error::new(e)))
        })?;
        let text = self
            .generate("OptimizationPlan", prompt::optimization_plan(&digest), true)
            .await?;

        let raw: Vec<RawRecommendation> = serde_json::from_str(strip_code_fences(&text))
            .map_err(|e| {
                OptimizeError::remote(
                    "OptimizationPlan",
                    Some(anyhow::anyhow!("plan was not a JSON array of recommendations: {}", e)),
                )
            })?;
        tracing::debug!(count = raw.len(), "received optimization plan");
        Ok(raw.into_iter().map(Recommendation::from).collect())
    }
}

impl SemanticRewriter for GeminiClient {
    fn rewrite<'a>(&'a self, html: &'a str) -> BoxFuture<'a, Result<String, OptimizeError>> {
        Box::pin(self.rewrite_semantic(html))
    }
}
