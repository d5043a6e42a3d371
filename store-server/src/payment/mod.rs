//! 支付网关适配器
//!
//! 网关是不透明的外部服务，边界收敛为一个 trait：
//! - [`PaymentGateway::initialize_charge`] - 发起托管收银台收款
//! - [`PaymentGateway::verify_transaction`] - 按 tx_ref 查询权威支付结果
//!
//! 入站 webhook 的签名校验在 [`signature`]。网关调用带显式超时、
//! 可失败、不重试 —— 错误直接上抛给调用方。

pub mod chapa;
pub mod signature;

pub use chapa::ChapaGateway;
pub use signature::verify_webhook_signature;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Gateway adapter error
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Transport failure or non-success HTTP status
    #[error("gateway unavailable: {0}")]
    Unavailable(String),

    /// Gateway reached but it rejected the request
    #[error("gateway rejected the request: {0}")]
    Rejected(String),
}

/// Charge initialization request
#[derive(Debug, Clone, Serialize)]
pub struct InitializeCharge {
    pub amount: Decimal,
    pub currency: String,
    pub tx_ref: String,
    pub email: String,
    pub callback_url: String,
    pub return_url: String,
}

/// Outcome reported by the gateway for a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChargeStatus {
    Success,
    Failed,
}

/// Verification result: authoritative status plus the raw payload,
/// stored verbatim on the order.
#[derive(Debug, Clone)]
pub struct ChargeVerification {
    pub status: ChargeStatus,
    pub raw: serde_json::Value,
}

/// Payment gateway boundary
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Initialize a hosted charge; returns the checkout URL the client
    /// is redirected to.
    async fn initialize_charge(&self, request: InitializeCharge) -> Result<String, GatewayError>;

    /// Ask the gateway for the authoritative status of a transaction.
    async fn verify_transaction(&self, tx_ref: &str) -> Result<ChargeVerification, GatewayError>;
}
