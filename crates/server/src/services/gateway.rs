//! Payment gateway client.
//!
//! The gateway is an external collaborator: this module owns the thin HTTP
//! adapter for creating remote orders and the signature check for its
//! confirmation callbacks. The client is constructed once in the composition
//! root and injected through [`crate::state::AppState`].

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

use crate::config::GatewayConfig;

type HmacSha256 = Hmac<Sha256>;

/// Errors that can occur when interacting with the payment gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to interpret a response or an amount.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// A remote order created at the gateway, identified by its handle.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteOrder {
    /// The gateway's order handle.
    pub id: String,
    /// Amount in minor currency units (e.g. paise).
    pub amount: i64,
    pub currency: String,
}

/// Contract for the external payment gateway.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a remote order for the given amount.
    async fn create_remote_order(
        &self,
        amount: Decimal,
        currency: &str,
        receipt: &str,
    ) -> Result<RemoteOrder, GatewayError>;

    /// Verify a confirmation callback signature against the shared secret.
    fn verify_signature(&self, order_handle: &str, payment_handle: &str, signature: &str) -> bool;

    /// The public API key id, handed to clients for the checkout widget.
    fn key_id(&self) -> &str;
}

#[derive(Serialize)]
struct CreateOrderBody<'a> {
    /// Minor currency units.
    amount: i64,
    currency: &'a str,
    receipt: &'a str,
}

/// HTTP adapter for a Razorpay-style gateway API.
pub struct HttpGateway {
    client: reqwest::Client,
    base_url: String,
    key_id: String,
    key_secret: SecretString,
}

impl HttpGateway {
    /// Create a new gateway client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder().build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            key_id: config.key_id.clone(),
            key_secret: config.key_secret.clone(),
        })
    }
}

/// Convert a decimal amount to minor currency units (x100).
fn to_minor_units(amount: Decimal) -> Result<i64, GatewayError> {
    (amount * Decimal::from(100))
        .round()
        .to_i64()
        .ok_or_else(|| GatewayError::Parse(format!("amount out of range: {amount}")))
}

#[async_trait]
impl PaymentGateway for HttpGateway {
    async fn create_remote_order(
        &self,
        amount: Decimal,
        currency: &str,
        receipt: &str,
    ) -> Result<RemoteOrder, GatewayError> {
        let body = CreateOrderBody {
            amount: to_minor_units(amount)?,
            currency,
            receipt,
        };

        let response = self
            .client
            .post(format!("{}/orders", self.base_url))
            .basic_auth(&self.key_id, Some(self.key_secret.expose_secret()))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(GatewayError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let order = response.json::<RemoteOrder>().await?;
        Ok(order)
    }

    fn verify_signature(&self, order_handle: &str, payment_handle: &str, signature: &str) -> bool {
        // Decode first so the comparison runs on raw bytes in constant time
        let Ok(provided) = hex::decode(signature) else {
            return false;
        };

        let Ok(mut mac) = HmacSha256::new_from_slice(self.key_secret.expose_secret().as_bytes())
        else {
            return false;
        };
        mac.update(order_handle.as_bytes());
        mac.update(b"|");
        mac.update(payment_handle.as_bytes());

        mac.verify_slice(&provided).is_ok()
    }

    fn key_id(&self) -> &str {
        &self.key_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Compute a callback signature the way the gateway would.
    fn expected_signature(secret: &str, order_handle: &str, payment_handle: &str) -> Option<String> {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
        mac.update(order_handle.as_bytes());
        mac.update(b"|");
        mac.update(payment_handle.as_bytes());
        Some(hex::encode(mac.finalize().into_bytes()))
    }

    fn test_gateway() -> HttpGateway {
        let config = GatewayConfig {
            base_url: "https://api.razorpay.com/v1".to_string(),
            key_id: "rzp_test_k1".to_string(),
            key_secret: SecretString::from("kQ8vV2J4tG7mXc1ZpW3yLbD9"),
            currency: "INR".to_string(),
        };
        HttpGateway::new(&config).expect("client builds")
    }

    #[test]
    fn test_to_minor_units() {
        assert_eq!(to_minor_units(Decimal::new(4300, 2)).expect("in range"), 4300);
        assert_eq!(to_minor_units(Decimal::from(120)).expect("in range"), 12000);
    }

    #[test]
    fn test_signature_roundtrip() {
        let gateway = test_gateway();
        let signature =
            expected_signature("kQ8vV2J4tG7mXc1ZpW3yLbD9", "order_abc", "pay_xyz").expect("hmac");

        assert!(gateway.verify_signature("order_abc", "pay_xyz", &signature));
    }

    #[test]
    fn test_signature_rejects_tampering() {
        let gateway = test_gateway();
        let signature =
            expected_signature("kQ8vV2J4tG7mXc1ZpW3yLbD9", "order_abc", "pay_xyz").expect("hmac");

        assert!(!gateway.verify_signature("order_abc", "pay_other", &signature));
        assert!(!gateway.verify_signature("order_other", "pay_xyz", &signature));
    }

    #[test]
    fn test_signature_rejects_wrong_secret() {
        let gateway = test_gateway();
        let signature =
            expected_signature("another-secret-entirely", "order_abc", "pay_xyz").expect("hmac");

        assert!(!gateway.verify_signature("order_abc", "pay_xyz", &signature));
    }

    #[test]
    fn test_signature_rejects_non_hex() {
        let gateway = test_gateway();
        assert!(!gateway.verify_signature("order_abc", "pay_xyz", "not-hex!"));
    }
}
