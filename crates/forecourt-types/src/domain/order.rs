use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::product::ProductCategory;
use super::UnknownVariant;

/// Lifecycle status of an order. `Completed` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OrderStatus {
    Pending,
    Processing,
    #[serde(rename = "Out for Delivery")]
    OutForDelivery,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Pending,
        OrderStatus::Processing,
        OrderStatus::OutForDelivery,
        OrderStatus::Completed,
        OrderStatus::Cancelled,
    ];

    /// Statuses an order in this status is allowed to move to next.
    pub fn allowed_transitions(self) -> &'static [OrderStatus] {
        match self {
            OrderStatus::Pending => &[OrderStatus::Processing, OrderStatus::Cancelled],
            OrderStatus::Processing => &[OrderStatus::OutForDelivery, OrderStatus::Cancelled],
            OrderStatus::OutForDelivery => &[OrderStatus::Completed, OrderStatus::Cancelled],
            OrderStatus::Completed | OrderStatus::Cancelled => &[],
        }
    }

    pub fn can_transition_to(self, requested: OrderStatus) -> bool {
        self.allowed_transitions().contains(&requested)
    }

    pub fn is_terminal(self) -> bool {
        self.allowed_transitions().is_empty()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Processing => "Processing",
            OrderStatus::OutForDelivery => "Out for Delivery",
            OrderStatus::Completed => "Completed",
            OrderStatus::Cancelled => "Cancelled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| UnknownVariant::new("order status", s))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PaymentMethod {
    #[serde(rename = "Cash on Delivery")]
    CashOnDelivery,
    #[serde(rename = "G-Cash")]
    GCash,
}

impl PaymentMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentMethod::CashOnDelivery => "Cash on Delivery",
            PaymentMethod::GCash => "G-Cash",
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [PaymentMethod::CashOnDelivery, PaymentMethod::GCash]
            .into_iter()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| UnknownVariant::new("payment method", s))
    }
}

/// Customer fields joined onto an order for display. Not the full profile.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CustomerSummary {
    pub full_name: String,
    pub phone_number: String,
    pub address: String,
}

/// Product fields a line item carries from the time of ordering.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProductRef {
    pub id: Uuid,
    pub name: String,
    pub category: ProductCategory,
    pub unit: String,
}

/// One product-quantity-price entry within an order. The price is the price
/// at the time the order was placed and never changes afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LineItem {
    pub quantity: u32,
    pub price_at_order_cents: i64,
    pub product: ProductRef,
}

impl LineItem {
    pub fn subtotal_cents(&self) -> i64 {
        i64::from(self.quantity) * self.price_at_order_cents
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    pub id: Uuid,
    pub status: OrderStatus,
    pub total_cents: i64,
    pub delivery_address: String,
    pub payment_method: PaymentMethod,
    /// None for guest checkouts.
    pub customer_id: Option<Uuid>,
    pub customer: Option<CustomerSummary>,
    pub items: Vec<LineItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Orders enter the system through the external ordering flow; the console
    /// itself only reads and status-mutates them. This constructor exists for
    /// the backends and tests that model that external flow.
    pub fn new(
        customer_id: Option<Uuid>,
        customer: Option<CustomerSummary>,
        delivery_address: String,
        payment_method: PaymentMethod,
        items: Vec<LineItem>,
    ) -> anyhow::Result<Self> {
        if delivery_address.trim().is_empty() {
            anyhow::bail!("delivery_address empty");
        }
        if items.is_empty() {
            anyhow::bail!("items empty");
        }
        for it in &items {
            if it.quantity == 0 {
                anyhow::bail!("item quantity must be > 0");
            }
        }
        let total = items.iter().map(LineItem::subtotal_cents).sum();
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            status: OrderStatus::Pending,
            total_cents: total,
            delivery_address,
            payment_method,
            customer_id,
            customer,
            items,
            created_at: now,
            updated_at: now,
        })
    }

    /// Shallow merge: fields absent from the patch keep their current value.
    /// Joined projections (customer, items) are not part of the change feed
    /// and are always preserved.
    pub fn apply_patch(&mut self, patch: &OrderPatch) {
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(total) = patch.total_cents {
            self.total_cents = total;
        }
        if let Some(address) = &patch.delivery_address {
            self.delivery_address = address.clone();
        }
        if let Some(method) = patch.payment_method {
            self.payment_method = method;
        }
        if let Some(at) = patch.updated_at {
            self.updated_at = at;
        }
    }
}

/// A partial order record carried by an `Updated` change event. Only the raw
/// row columns travel on the feed; joined projections never do.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderPatch {
    pub id: Uuid,
    pub status: Option<OrderStatus>,
    pub total_cents: Option<i64>,
    pub delivery_address: Option<String>,
    pub payment_method: Option<PaymentMethod>,
    pub customer_id: Option<Uuid>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl OrderPatch {
    pub fn empty(id: Uuid) -> Self {
        Self {
            id,
            status: None,
            total_cents: None,
            delivery_address: None,
            payment_method: None,
            customer_id: None,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn status_change(id: Uuid, status: OrderStatus, at: DateTime<Utc>) -> Self {
        Self {
            status: Some(status),
            updated_at: Some(at),
            ..Self::empty(id)
        }
    }

    /// Promote a patch for an unknown order into a full record. The backend is
    /// the source of truth and events may outrun the initial load, so missing
    /// fields take placeholder defaults and timestamps fall back to the
    /// receipt time.
    pub fn into_order(self, received_at: DateTime<Utc>) -> Order {
        Order {
            id: self.id,
            status: self.status.unwrap_or(OrderStatus::Pending),
            total_cents: self.total_cents.unwrap_or(0),
            delivery_address: self.delivery_address.unwrap_or_default(),
            payment_method: self.payment_method.unwrap_or(PaymentMethod::CashOnDelivery),
            customer_id: self.customer_id,
            customer: None,
            items: Vec::new(),
            created_at: self.created_at.unwrap_or(received_at),
            updated_at: self.updated_at.unwrap_or(received_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(qty: u32, price_cents: i64) -> LineItem {
        LineItem {
            quantity: qty,
            price_at_order_cents: price_cents,
            product: ProductRef {
                id: Uuid::new_v4(),
                name: "Diesel".into(),
                category: ProductCategory::Fuel,
                unit: "liters".into(),
            },
        }
    }

    #[test]
    fn transition_table_is_exhaustive() {
        use OrderStatus::*;
        let legal = [
            (Pending, Processing),
            (Pending, Cancelled),
            (Processing, OutForDelivery),
            (Processing, Cancelled),
            (OutForDelivery, Completed),
            (OutForDelivery, Cancelled),
        ];
        for from in OrderStatus::ALL {
            for to in OrderStatus::ALL {
                let expected = legal.contains(&(from, to));
                assert_eq!(
                    from.can_transition_to(to),
                    expected,
                    "{from} -> {to} should be {expected}"
                );
            }
        }
    }

    #[test]
    fn completed_and_cancelled_are_terminal() {
        assert!(OrderStatus::Completed.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(!OrderStatus::Pending.is_terminal());
        assert!(!OrderStatus::Processing.is_terminal());
        assert!(!OrderStatus::OutForDelivery.is_terminal());
    }

    #[test]
    fn status_wire_names_round_trip() {
        let json = serde_json::to_string(&OrderStatus::OutForDelivery).unwrap();
        assert_eq!(json, "\"Out for Delivery\"");
        let back: OrderStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(back, OrderStatus::OutForDelivery);
        assert_eq!("Out for Delivery".parse::<OrderStatus>().unwrap(), back);
        assert!("Shipped".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn new_order_computes_total_and_defaults_pending() {
        let order = Order::new(
            None,
            None,
            "12 Main St".into(),
            PaymentMethod::CashOnDelivery,
            vec![item(2, 500), item(1, 250)],
        )
        .unwrap();
        assert_eq!(order.total_cents, 1250);
        assert_eq!(order.status, OrderStatus::Pending);
        assert!(order.customer_id.is_none());
    }

    #[test]
    fn new_order_validation_errors() {
        let empty_address = Order::new(
            None,
            None,
            "  ".into(),
            PaymentMethod::GCash,
            vec![item(1, 100)],
        );
        assert!(empty_address.is_err());

        let no_items = Order::new(
            None,
            None,
            "12 Main St".into(),
            PaymentMethod::GCash,
            vec![],
        );
        assert!(no_items.is_err());

        let zero_qty = Order::new(
            None,
            None,
            "12 Main St".into(),
            PaymentMethod::GCash,
            vec![item(0, 100)],
        );
        assert!(zero_qty.is_err());
    }

    #[test]
    fn apply_patch_merges_present_fields_only() {
        let mut order = Order::new(
            Some(Uuid::new_v4()),
            Some(CustomerSummary {
                full_name: "Ana Cruz".into(),
                phone_number: "0917".into(),
                address: "12 Main St".into(),
            }),
            "12 Main St".into(),
            PaymentMethod::CashOnDelivery,
            vec![item(3, 400)],
        )
        .unwrap();
        let original_total = order.total_cents;
        let original_customer = order.customer.clone();

        let patch = OrderPatch::status_change(order.id, OrderStatus::Processing, Utc::now());
        order.apply_patch(&patch);

        assert_eq!(order.status, OrderStatus::Processing);
        assert_eq!(order.total_cents, original_total);
        assert_eq!(order.customer, original_customer);
        assert_eq!(order.items.len(), 1);
    }

    #[test]
    fn patch_promotion_fills_defaults() {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let promoted = OrderPatch {
            status: Some(OrderStatus::Processing),
            total_cents: Some(9900),
            ..OrderPatch::empty(id)
        }
        .into_order(now);
        assert_eq!(promoted.id, id);
        assert_eq!(promoted.status, OrderStatus::Processing);
        assert_eq!(promoted.total_cents, 9900);
        assert_eq!(promoted.created_at, now);
        assert!(promoted.items.is_empty());
    }
}
