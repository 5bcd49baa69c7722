use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::domain::delivery::Delivery;
use crate::domain::order::{Order, OrderPatch, OrderStatus};
use crate::domain::product::{Product, ProductDraft};
use crate::domain::profile::{NewRider, Profile, ProfileUpdate, Role};

/// Failures at the data-access boundary, by recovery strategy: `Fetch` is a
/// transient read failure, `Write` a mutation the backend rejected, `NotFound`
/// a missing referenced entity, `Auth` a credential or session failure.
#[derive(thiserror::Error, Debug)]
pub enum GatewayError {
    #[error("fetch failed: {0}")]
    Fetch(String),
    #[error("write rejected: {0}")]
    Write(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("authentication failed: {0}")]
    Auth(String),
}

/// One change notification from the backend's live order channel. Delivery
/// order is not guaranteed and duplicates are possible; consumers reconcile
/// by identifier.
#[derive(Debug, Clone)]
pub enum OrderChange {
    Inserted(Order),
    Updated(OrderPatch),
    Deleted(Uuid),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
}

#[async_trait]
pub trait OrderGateway: Send + Sync + 'static {
    /// All orders with their customer and line-item projections,
    /// most recent first.
    async fn fetch_orders(&self) -> Result<Vec<Order>, GatewayError>;

    /// Orders created inside the window, ascending by creation time.
    async fn fetch_orders_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Order>, GatewayError>;

    async fn fetch_order_by_id(&self, id: Uuid) -> Result<Order, GatewayError>;

    async fn update_order_status(&self, id: Uuid, status: OrderStatus)
        -> Result<(), GatewayError>;

    /// Open the live change channel. Dropping the receiver closes it.
    fn subscribe_order_changes(&self) -> broadcast::Receiver<OrderChange>;
}

#[async_trait]
pub trait ProductGateway: Send + Sync + 'static {
    async fn fetch_products(&self) -> Result<Vec<Product>, GatewayError>;
    async fn fetch_product_by_id(&self, id: Uuid) -> Result<Product, GatewayError>;
    async fn create_product(&self, draft: ProductDraft) -> Result<Product, GatewayError>;
    async fn update_product(&self, id: Uuid, draft: ProductDraft)
        -> Result<Product, GatewayError>;
    async fn delete_product(&self, id: Uuid) -> Result<(), GatewayError>;
    async fn update_stock(&self, id: Uuid, quantity: u32) -> Result<(), GatewayError>;
    /// Products with `stock_quantity` strictly below the threshold,
    /// lowest stock first.
    async fn fetch_low_stock(&self, threshold: u32) -> Result<Vec<Product>, GatewayError>;
}

#[async_trait]
pub trait ProfileGateway: Send + Sync + 'static {
    async fn fetch_profiles(&self, role: Option<Role>) -> Result<Vec<Profile>, GatewayError>;
    async fn fetch_profile_by_id(&self, id: Uuid) -> Result<Profile, GatewayError>;
    async fn update_profile(
        &self,
        id: Uuid,
        update: ProfileUpdate,
    ) -> Result<Profile, GatewayError>;
    /// Provision a rider account with a generated credential.
    async fn create_rider(&self, rider: NewRider) -> Result<Profile, GatewayError>;
    async fn fetch_deliveries(&self, rider: Option<Uuid>) -> Result<Vec<Delivery>, GatewayError>;
}

#[async_trait]
pub trait AuthGateway: Send + Sync + 'static {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, GatewayError>;
    async fn sign_out(&self) -> Result<(), GatewayError>;
    async fn current_user(&self) -> Result<Option<AuthUser>, GatewayError>;
}

/// The full data-access surface the console depends on.
pub trait DataGateway: OrderGateway + ProductGateway + ProfileGateway + AuthGateway {}

impl<T: OrderGateway + ProductGateway + ProfileGateway + AuthGateway> DataGateway for T {}
