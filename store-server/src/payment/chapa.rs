//! Chapa gateway adapter
//!
//! Hosted-checkout flow over Chapa's REST API:
//! - `POST /v1/transaction/initialize` → checkout_url
//! - `GET  /v1/transaction/verify/{tx_ref}` → authoritative status

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::{ChargeStatus, ChargeVerification, GatewayError, InitializeCharge, PaymentGateway};

const DEFAULT_BASE_URL: &str = "https://api.chapa.co/v1";

/// Chapa HTTP adapter
pub struct ChapaGateway {
    client: reqwest::Client,
    base_url: String,
    secret_key: String,
}

/// Envelope shared by Chapa responses
#[derive(Debug, Deserialize)]
struct ChapaEnvelope {
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<serde_json::Value>,
}

impl ChapaGateway {
    pub fn new(secret_key: String, base_url: Option<String>, timeout_ms: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .connect_timeout(Duration::from_millis(timeout_ms.min(5_000)))
            .build()
            .expect("failed to build gateway HTTP client");

        Self {
            client,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            secret_key,
        }
    }

    async fn parse_envelope(resp: reqwest::Response) -> Result<ChapaEnvelope, GatewayError> {
        let status = resp.status();
        let envelope: ChapaEnvelope = resp
            .json()
            .await
            .map_err(|e| GatewayError::Unavailable(format!("malformed gateway response: {e}")))?;

        if !status.is_success() {
            return Err(GatewayError::Rejected(format!(
                "HTTP {}: {}",
                status,
                envelope.message.unwrap_or_default()
            )));
        }
        Ok(envelope)
    }
}

#[async_trait]
impl PaymentGateway for ChapaGateway {
    async fn initialize_charge(&self, request: InitializeCharge) -> Result<String, GatewayError> {
        let url = format!("{}/transaction/initialize", self.base_url);

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.secret_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| GatewayError::Unavailable(e.to_string()))?;

        let envelope = Self::parse_envelope(resp).await?;

        if envelope.status != "success" {
            return Err(GatewayError::Rejected(
                envelope.message.unwrap_or_else(|| "initialization failed".to_string()),
            ));
        }

        envelope
            .data
            .as_ref()
            .and_then(|d| d.get("checkout_url"))
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| {
                GatewayError::Unavailable("gateway response missing checkout_url".to_string())
            })
    }

    async fn verify_transaction(&self, tx_ref: &str) -> Result<ChargeVerification, GatewayError> {
        let url = format!("{}/transaction/verify/{}", self.base_url, tx_ref);

        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(|e| GatewayError::Unavailable(e.to_string()))?;

        let envelope = Self::parse_envelope(resp).await?;
        let raw = envelope.data.clone().unwrap_or(serde_json::Value::Null);

        // 权威状态在 data.status；信封的 status 只说明查询本身成功
        let charge_status = raw
            .get("status")
            .and_then(|v| v.as_str())
            .unwrap_or("failed");

        let status = if envelope.status == "success" && charge_status == "success" {
            ChargeStatus::Success
        } else {
            ChargeStatus::Failed
        };

        Ok(ChargeVerification { status, raw })
    }
}
