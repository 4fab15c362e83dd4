//! Payment record domain types for payment-gated checkout.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tiffinbox_core::{OrderId, PaymentId, UserId};

/// Lifecycle of a gateway payment record.
///
/// `Created` records hold a cart snapshot and no orders; orders materialize
/// only on the `Completed` transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentRecordStatus {
    Created,
    Completed,
    Failed,
}

impl PaymentRecordStatus {
    /// Stable snake_case name, matching the database representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl std::str::FromStr for PaymentRecordStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(Self::Created),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("invalid payment record status: {s}")),
        }
    }
}

/// A pending or settled payment against the external gateway.
///
/// `cart_snapshot` is the serialized delivery groups captured at initiation,
/// so confirmation can materialize orders even if the live cart changed in
/// the meantime. `order_ids` is filled once orders are created.
#[derive(Debug, Clone, Serialize)]
pub struct Payment {
    pub id: PaymentId,
    pub user_id: UserId,
    /// The gateway's order handle for this payment.
    pub gateway_order_id: String,
    /// The gateway's payment id, present after confirmation was attempted.
    pub gateway_payment_id: Option<String>,
    /// The signature supplied with the confirmation callback.
    #[serde(skip_serializing)]
    pub gateway_signature: Option<String>,
    pub amount: Decimal,
    pub currency: String,
    pub status: PaymentRecordStatus,
    pub cart_snapshot: Option<serde_json::Value>,
    pub order_ids: Vec<OrderId>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
