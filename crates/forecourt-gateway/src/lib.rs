//! forecourt-gateway: outbound adapters implementing the console's data
//! access ports, selected by feature.

#[cfg(not(any(feature = "memory", feature = "sqlite")))]
compile_error!("Enable a gateway feature: `memory` or `sqlite`.");

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use uuid::Uuid;

use forecourt_types::domain::delivery::Delivery;
use forecourt_types::domain::order::{Order, OrderStatus};
use forecourt_types::domain::product::{Product, ProductDraft};
use forecourt_types::domain::profile::{NewRider, Profile, ProfileUpdate, Role};
use forecourt_types::ports::gateway::{
    AuthGateway, AuthUser, GatewayError, OrderChange, OrderGateway, ProductGateway, ProfileGateway,
};

#[cfg(feature = "memory")]
pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;

/// Backend selected at build time. With both features enabled, a configured
/// `DATABASE_URL` picks sqlite and its absence falls back to memory.
pub enum Gateway {
    #[cfg(feature = "memory")]
    Memory(memory::MemoryGateway),
    #[cfg(feature = "sqlite")]
    Sqlite(sqlite::SqliteGateway),
}

pub async fn build_gateway(database_url: Option<&str>) -> anyhow::Result<Gateway> {
    Gateway::build(database_url).await
}

impl Gateway {
    #[cfg(all(feature = "memory", not(feature = "sqlite")))]
    pub async fn build(_database_url: Option<&str>) -> anyhow::Result<Self> {
        Ok(Gateway::Memory(memory::MemoryGateway::new()))
    }

    #[cfg(all(feature = "sqlite", not(feature = "memory")))]
    pub async fn build(database_url: Option<&str>) -> anyhow::Result<Self> {
        let url = database_url.unwrap_or("sqlite://forecourt.db");
        Ok(Gateway::Sqlite(sqlite::SqliteGateway::connect(url).await?))
    }

    #[cfg(all(feature = "memory", feature = "sqlite"))]
    pub async fn build(database_url: Option<&str>) -> anyhow::Result<Self> {
        match database_url {
            Some(url) => Ok(Gateway::Sqlite(sqlite::SqliteGateway::connect(url).await?)),
            None => Ok(Gateway::Memory(memory::MemoryGateway::new())),
        }
    }
}

macro_rules! dispatch {
    ($self:ident, $g:ident => $call:expr) => {
        match $self {
            #[cfg(feature = "memory")]
            Gateway::Memory($g) => $call,
            #[cfg(feature = "sqlite")]
            Gateway::Sqlite($g) => $call,
        }
    };
}

#[async_trait]
impl OrderGateway for Gateway {
    async fn fetch_orders(&self) -> Result<Vec<Order>, GatewayError> {
        dispatch!(self, g => g.fetch_orders().await)
    }

    async fn fetch_orders_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Order>, GatewayError> {
        dispatch!(self, g => g.fetch_orders_between(start, end).await)
    }

    async fn fetch_order_by_id(&self, id: Uuid) -> Result<Order, GatewayError> {
        dispatch!(self, g => g.fetch_order_by_id(id).await)
    }

    async fn update_order_status(
        &self,
        id: Uuid,
        status: OrderStatus,
    ) -> Result<(), GatewayError> {
        dispatch!(self, g => g.update_order_status(id, status).await)
    }

    fn subscribe_order_changes(&self) -> broadcast::Receiver<OrderChange> {
        dispatch!(self, g => g.subscribe_order_changes())
    }
}

#[async_trait]
impl ProductGateway for Gateway {
    async fn fetch_products(&self) -> Result<Vec<Product>, GatewayError> {
        dispatch!(self, g => g.fetch_products().await)
    }

    async fn fetch_product_by_id(&self, id: Uuid) -> Result<Product, GatewayError> {
        dispatch!(self, g => g.fetch_product_by_id(id).await)
    }

    async fn create_product(&self, draft: ProductDraft) -> Result<Product, GatewayError> {
        dispatch!(self, g => g.create_product(draft).await)
    }

    async fn update_product(
        &self,
        id: Uuid,
        draft: ProductDraft,
    ) -> Result<Product, GatewayError> {
        dispatch!(self, g => g.update_product(id, draft).await)
    }

    async fn delete_product(&self, id: Uuid) -> Result<(), GatewayError> {
        dispatch!(self, g => g.delete_product(id).await)
    }

    async fn update_stock(&self, id: Uuid, quantity: u32) -> Result<(), GatewayError> {
        dispatch!(self, g => g.update_stock(id, quantity).await)
    }

    async fn fetch_low_stock(&self, threshold: u32) -> Result<Vec<Product>, GatewayError> {
        dispatch!(self, g => g.fetch_low_stock(threshold).await)
    }
}

#[async_trait]
impl ProfileGateway for Gateway {
    async fn fetch_profiles(&self, role: Option<Role>) -> Result<Vec<Profile>, GatewayError> {
        dispatch!(self, g => g.fetch_profiles(role).await)
    }

    async fn fetch_profile_by_id(&self, id: Uuid) -> Result<Profile, GatewayError> {
        dispatch!(self, g => g.fetch_profile_by_id(id).await)
    }

    async fn update_profile(
        &self,
        id: Uuid,
        update: ProfileUpdate,
    ) -> Result<Profile, GatewayError> {
        dispatch!(self, g => g.update_profile(id, update).await)
    }

    async fn create_rider(&self, rider: NewRider) -> Result<Profile, GatewayError> {
        dispatch!(self, g => g.create_rider(rider).await)
    }

    async fn fetch_deliveries(&self, rider: Option<Uuid>) -> Result<Vec<Delivery>, GatewayError> {
        dispatch!(self, g => g.fetch_deliveries(rider).await)
    }
}

#[async_trait]
impl AuthGateway for Gateway {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, GatewayError> {
        dispatch!(self, g => g.sign_in(email, password).await)
    }

    async fn sign_out(&self) -> Result<(), GatewayError> {
        dispatch!(self, g => g.sign_out().await)
    }

    async fn current_user(&self) -> Result<Option<AuthUser>, GatewayError> {
        dispatch!(self, g => g.current_user().await)
    }
}
