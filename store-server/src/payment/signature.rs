//! Webhook signature verification
//!
//! 网关对原始请求体计算 HMAC-SHA256，十六进制编码后放在签名头。
//! 校验必须在解析 JSON 之前、对原始字节进行；比较走 `ring` 的
//! 常数时间 verify。

use ring::hmac;

/// Verify an inbound webhook body against its signature header.
///
/// Returns `true` only when `signature_hex` is a valid hex encoding of
/// HMAC-SHA256(secret, body).
pub fn verify_webhook_signature(secret: &str, body: &[u8], signature_hex: &str) -> bool {
    let Ok(signature) = hex::decode(signature_hex.trim()) else {
        return false;
    };

    let key = hmac::Key::new(hmac::HMAC_SHA256, secret.as_bytes());
    hmac::verify(&key, body, &signature).is_ok()
}

/// Compute the hex signature for a body (used by tests and tooling).
pub fn sign_webhook_body(secret: &str, body: &[u8]) -> String {
    let key = hmac::Key::new(hmac::HMAC_SHA256, secret.as_bytes());
    hex::encode(hmac::sign(&key, body).as_ref())
}
