//! Generative-AI provider client for contract risk analysis.
//!
//! Builds the tenant-protection prompt, calls the provider's inference
//! endpoint, and retries with bounded exponential backoff when the provider
//! reports transient overload.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{AppError, Result};

/// System instruction sent with every analysis request. The provider is asked
/// to act as a tenant-side legal reviewer for Brazilian rental contracts
/// (Lei do Inquilinato, Lei 8.245/91) and to answer in Brazilian Portuguese
/// with a fixed markdown report structure: red flags (abusive clauses),
/// yellow flags (negotiable terms), positive points, a ready-to-send message
/// to the landlord, and a final 0-10 safety score with a one-line verdict.
const SYSTEM_INSTRUCTION: &str = r###"
You are a specialized legal consultant expert in Brazilian Real Estate Law
(Lei do Inquilinato - Lei No 8.245/91). Your mission is to protect tenants
from abusive rental contracts.

Instructions:
1. Analyze the input document looking for specific risks. Do not summarize
   the whole document; focus only on critical clauses.
2. Respond strictly in Portuguese (Brazil), in markdown, using exactly these
   sections:
   "# 🛡️ RELATÓRIO DE SEGURANÇA",
   "## 🔴 BANDEIRAS VERMELHAS (Risco Alto - Abusivo)" - strictly illegal or
   highly dangerous clauses (fines above 3 months of rent, structural repair
   costs pushed onto the tenant, waiver of revision rights). If none, say
   "Nenhuma irregularidade grave encontrada".
   "## 🟡 BANDEIRAS AMARELAS (Atenção - Negociável)" - legal but expensive or
   strict clauses (IGP-M index, rigid visitor rules, pet bans, short eviction
   notice) with advice on how to negotiate each.
   "## 🟢 PONTOS POSITIVOS (Seguro)" - one or two clauses that protect the
   tenant.
   "## 💬 MENSAGEM PARA O DONO (Copy & Paste)" - a polite but firm short
   message the tenant can send to the landlord asking to fix the flags above.
   "## ⚖️ VEREDITO FINAL" - "Nota de Segurança:" from 0 to 10 and "Resumo:"
   one punchy sentence saying whether to sign or walk away.
3. Be direct, use simple language, avoid legal jargon.
4. If the text does not look like a rental contract, ask the user to submit a
   valid document instead.
"###;

/// Instruction appended when the contract arrives as a file rather than text.
const ATTACHMENT_PROMPT: &str =
    "Analyze this rental contract document and identify risks and abusive clauses \
     according to your instructions.";

/// Contract input accepted by the analysis endpoint: pasted text or an
/// uploaded document passed through as base64.
#[derive(Debug, Clone)]
pub enum ContractInput {
    Text(String),
    Attachment { mime_type: String, data: String },
}

/// One part of the prompt: inline text or base64 document data.
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum PromptPart {
    Text {
        text: String,
    },
    InlineData {
        inline_data: InlineData,
    },
}

#[derive(Debug, Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    system_instruction: String,
    contents: Vec<PromptPart>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    text: String,
}

/// Retry schedule for transient provider overload.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(1000),
        }
    }
}

/// HTTP client for the generative-AI provider.
pub struct AiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    retry: RetryPolicy,
}

impl AiClient {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.ai_base_url.trim_end_matches('/').to_string(),
            api_key: config.ai_api_key.clone(),
            model: config.ai_model.clone(),
            retry: RetryPolicy::default(),
        }
    }

    /// Override the retry schedule (used by tests to avoid real backoff waits).
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Run a contract through the provider and return the markdown report.
    ///
    /// Retries on classified transient errors (HTTP 503 or an "overloaded"
    /// provider message) with exponential backoff; all other failures surface
    /// immediately. An empty report is treated as a provider failure.
    pub async fn analyze_contract(&self, input: &ContractInput) -> Result<String> {
        let request = GenerateRequest {
            system_instruction: SYSTEM_INSTRUCTION.to_string(),
            contents: build_parts(input),
        };

        let mut delay = self.retry.initial_delay;
        let mut retries_left = self.retry.max_retries;

        let report = loop {
            match self.generate(&request).await {
                Ok(text) => break text,
                Err(err) if retries_left > 0 && is_transient(&err) => {
                    tracing::warn!(
                        error = %err,
                        retries_left,
                        delay_ms = delay.as_millis() as u64,
                        "AI provider overloaded, retrying"
                    );
                    crate::services::metrics_service::record_ai_retry();
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                    retries_left -= 1;
                }
                Err(err) => return Err(err),
            }
        };

        if report.trim().is_empty() {
            return Err(AppError::AiProvider("provider returned an empty report".to_string()));
        }

        Ok(report)
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<String> {
        let url = format!("{}/v1/models/{}:generate", self.base_url, self.model);

        let response = self
            .http
            .post(&url)
            .header("x-api-key", &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| AppError::AiProvider(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::AiProvider(format!(
                "provider returned {}: {}",
                status.as_u16(),
                body
            )));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| AppError::AiProvider(format!("invalid provider response: {}", e)))?;

        Ok(parsed.text)
    }
}

/// Assemble prompt parts for the two input kinds. Attachments carry the
/// document inline plus a short analysis instruction, mirroring the provider's
/// multimodal request shape.
fn build_parts(input: &ContractInput) -> Vec<PromptPart> {
    match input {
        ContractInput::Text(text) => vec![PromptPart::Text { text: text.clone() }],
        ContractInput::Attachment { mime_type, data } => vec![
            PromptPart::InlineData {
                inline_data: InlineData {
                    mime_type: mime_type.clone(),
                    data: data.clone(),
                },
            },
            PromptPart::Text {
                text: ATTACHMENT_PROMPT.to_string(),
            },
        ],
    }
}

/// Classify provider failures worth retrying: HTTP 503 or an explicit
/// overload message.
fn is_transient(err: &AppError) -> bool {
    match err {
        AppError::AiProvider(msg) => {
            msg.contains("returned 503") || msg.to_lowercase().contains("overloaded")
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(base_url: &str) -> Config {
        Config {
            database_url: "postgres://unused".to_string(),
            port: 0,
            public_url: "http://localhost".to_string(),
            jwt_secret: "secret".to_string(),
            jwt_ttl_secs: 3600,
            ai_base_url: base_url.to_string(),
            ai_api_key: "test-key".to_string(),
            ai_model: "flash-latest".to_string(),
            payment_base_url: "http://unused".to_string(),
            payment_secret_key: "sk".to_string(),
            payment_webhook_secret: "whsec".to_string(),
            smtp_host: "localhost".to_string(),
            smtp_username: String::new(),
            smtp_password: String::new(),
            smtp_from: "no-reply@test".to_string(),
        }
    }

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            max_retries: 3,
            initial_delay: Duration::from_millis(1),
        }
    }

    fn client(server: &MockServer) -> AiClient {
        AiClient::new(&test_config(&server.uri())).with_retry_policy(fast_retry())
    }

    #[tokio::test]
    async fn test_text_analysis_returns_report() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/models/flash-latest:generate"))
            .and(header("x-api-key", "test-key"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"text": "# 🛡️ RELATÓRIO DE SEGURANÇA"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let report = client(&server)
            .analyze_contract(&ContractInput::Text("CLÁUSULA 1 ...".to_string()))
            .await
            .unwrap();
        assert!(report.starts_with("# 🛡️"));
    }

    #[tokio::test]
    async fn test_retries_on_503_then_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"text": "ok report"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let report = client(&server)
            .analyze_contract(&ContractInput::Text("some contract".to_string()))
            .await
            .unwrap();
        assert_eq!(report, "ok report");
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let server = MockServer::start().await;
        // Initial attempt plus three retries
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .expect(4)
            .mount(&server)
            .await;

        let err = client(&server)
            .analyze_contract(&ContractInput::Text("some contract".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::AiProvider(_)));
    }

    #[tokio::test]
    async fn test_non_transient_error_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad request"))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server)
            .analyze_contract(&ContractInput::Text("some contract".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::AiProvider(_)));
    }

    #[tokio::test]
    async fn test_empty_report_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"text": "  "})))
            .mount(&server)
            .await;

        let err = client(&server)
            .analyze_contract(&ContractInput::Text("some contract".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::AiProvider(_)));
    }

    // -----------------------------------------------------------------------
    // Prompt construction
    // -----------------------------------------------------------------------

    #[test]
    fn test_text_input_is_a_single_part() {
        let parts = build_parts(&ContractInput::Text("contract body".to_string()));
        assert_eq!(parts.len(), 1);
        let json = serde_json::to_value(&parts).unwrap();
        assert_eq!(json[0]["text"], "contract body");
    }

    #[test]
    fn test_attachment_input_carries_inline_data_and_instruction() {
        let parts = build_parts(&ContractInput::Attachment {
            mime_type: "application/pdf".to_string(),
            data: "aGVsbG8=".to_string(),
        });
        assert_eq!(parts.len(), 2);
        let json = serde_json::to_value(&parts).unwrap();
        assert_eq!(json[0]["inline_data"]["mime_type"], "application/pdf");
        assert_eq!(json[0]["inline_data"]["data"], "aGVsbG8=");
        assert!(json[1]["text"].as_str().unwrap().contains("rental contract"));
    }

    #[test]
    fn test_transient_classification() {
        assert!(is_transient(&AppError::AiProvider(
            "provider returned 503: busy".to_string()
        )));
        assert!(is_transient(&AppError::AiProvider(
            "provider returned 429: model is Overloaded".to_string()
        )));
        assert!(!is_transient(&AppError::AiProvider(
            "provider returned 400: bad request".to_string()
        )));
        assert!(!is_transient(&AppError::Validation("x".to_string())));
    }

    #[test]
    fn test_default_retry_policy_matches_backoff_schedule() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.initial_delay, Duration::from_millis(1000));
    }
}
