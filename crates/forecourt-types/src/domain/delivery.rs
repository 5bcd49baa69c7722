use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::UnknownVariant;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DeliveryStatus {
    #[serde(rename = "assigned")]
    Assigned,
    #[serde(rename = "picked_up")]
    PickedUp,
    #[serde(rename = "delivered")]
    Delivered,
    #[serde(rename = "failed")]
    Failed,
}

impl DeliveryStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            DeliveryStatus::Assigned => "assigned",
            DeliveryStatus::PickedUp => "picked_up",
            DeliveryStatus::Delivered => "delivered",
            DeliveryStatus::Failed => "failed",
        }
    }

    /// A delivery still on the road counts as pending for rider statistics.
    pub fn is_pending(self) -> bool {
        matches!(self, DeliveryStatus::Assigned | DeliveryStatus::PickedUp)
    }
}

impl std::fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DeliveryStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            DeliveryStatus::Assigned,
            DeliveryStatus::PickedUp,
            DeliveryStatus::Delivered,
            DeliveryStatus::Failed,
        ]
        .into_iter()
        .find(|v| v.as_str() == s)
        .ok_or_else(|| UnknownVariant::new("delivery status", s))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Delivery {
    pub id: Uuid,
    pub order_id: Uuid,
    pub rider_id: Uuid,
    pub status: DeliveryStatus,
    pub assigned_at: DateTime<Utc>,
    pub delivered_at: Option<DateTime<Utc>>,
}

impl Delivery {
    /// Minutes from assignment to hand-over, when both timestamps exist.
    pub fn delivery_minutes(&self) -> Option<i64> {
        self.delivered_at
            .map(|done| (done - self.assigned_at).num_minutes())
    }
}
