//! Webhook Handlers
//!
//! 签名必须对原始字节校验，先于任何 JSON 解析。校验失败一律
//! 400 且不产生任何状态变更。

use axum::{Json, body::Bytes, extract::State, http::HeaderMap};

use crate::core::ServerState;
use crate::payment::verify_webhook_signature;
use crate::utils::{AppError, AppResponse, AppResult, ok, ok_with_message};

const SIGNATURE_HEADER: &str = "chapa-signature";
const ALT_SIGNATURE_HEADER: &str = "x-chapa-signature";

const EVENT_CHARGE_REFUNDED: &str = "charge.refunded";

/// Inbound gateway event (`POST /api/webhook/chapa`)
pub async fn chapa_event(
    State(state): State<ServerState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<AppResponse<()>>> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .or_else(|| headers.get(ALT_SIGNATURE_HEADER))
        .and_then(|v| v.to_str().ok())
        .ok_or(AppError::SignatureInvalid)?;

    if !verify_webhook_signature(&state.config.webhook_secret, &body, signature) {
        tracing::warn!(target: "security", "webhook signature mismatch");
        return Err(AppError::SignatureInvalid);
    }

    let payload: serde_json::Value = serde_json::from_slice(&body)
        .map_err(|e| AppError::validation(format!("malformed webhook body: {e}")))?;

    let event = payload.get("event").and_then(|v| v.as_str()).unwrap_or("");
    let tx_ref = payload.get("tx_ref").and_then(|v| v.as_str());

    match (event, tx_ref) {
        (EVENT_CHARGE_REFUNDED, Some(tx_ref)) => {
            let tx_ref = tx_ref.to_string();
            state.orders.record_refund(&tx_ref, payload).await?;
            Ok(ok(()))
        }
        (EVENT_CHARGE_REFUNDED, None) => {
            Err(AppError::validation("refund event without tx_ref"))
        }
        _ => {
            // Unhandled event types are acknowledged so the gateway
            // stops retrying them
            tracing::debug!(event = %event, "ignoring unhandled webhook event");
            Ok(ok_with_message((), "ignored"))
        }
    }
}
