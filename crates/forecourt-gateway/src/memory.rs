use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

use async_trait::async_trait;
use forecourt_types::domain::delivery::Delivery;
use forecourt_types::domain::order::{Order, OrderPatch, OrderStatus};
use forecourt_types::domain::product::{Product, ProductDraft};
use forecourt_types::domain::profile::{NewRider, Profile, ProfileUpdate, Role};
use forecourt_types::ports::gateway::{
    AuthGateway, AuthUser, GatewayError, OrderChange, OrderGateway, ProductGateway, ProfileGateway,
};

const CHANGE_CHANNEL_CAPACITY: usize = 64;

struct Account {
    user_id: Uuid,
    password_hash: String,
}

/// In-process stand-in for the hosted backend: DashMap collections plus a
/// broadcast hub that plays the role of the realtime change channel. Every
/// order mutation emits the matching change event, exactly as the hosted
/// backend would.
#[derive(Clone)]
pub struct MemoryGateway {
    pub orders: Arc<DashMap<Uuid, Order>>,
    pub products: Arc<DashMap<Uuid, Product>>,
    pub profiles: Arc<DashMap<Uuid, Profile>>,
    pub deliveries: Arc<DashMap<Uuid, Delivery>>,
    accounts: Arc<DashMap<String, Account>>,
    current: Arc<RwLock<Option<AuthUser>>>,
    changes: broadcast::Sender<OrderChange>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            orders: Arc::new(DashMap::new()),
            products: Arc::new(DashMap::new()),
            profiles: Arc::new(DashMap::new()),
            deliveries: Arc::new(DashMap::new()),
            accounts: Arc::new(DashMap::new()),
            current: Arc::new(RwLock::new(None)),
            changes,
        }
    }

    fn emit(&self, change: OrderChange) {
        // No receivers is fine; the console may not be watching yet.
        let _ = self.changes.send(change);
    }

    /// Place an order as the external ordering system would. The console
    /// never creates orders itself.
    pub fn insert_order(&self, order: Order) {
        self.orders.insert(order.id, order.clone());
        self.emit(OrderChange::Inserted(order));
    }

    /// Backend-side removal, visible to subscribers as a Delete event.
    pub fn remove_order(&self, id: Uuid) {
        if self.orders.remove(&id).is_some() {
            self.emit(OrderChange::Deleted(id));
        }
    }

    pub fn insert_delivery(&self, delivery: Delivery) {
        self.deliveries.insert(delivery.id, delivery);
    }

    /// Register an account the auth service will accept.
    pub fn seed_user(&self, profile: Profile, password: &str) -> anyhow::Result<()> {
        let password_hash = bcrypt::hash(password, bcrypt::DEFAULT_COST)?;
        self.accounts.insert(
            profile.email.clone(),
            Account {
                user_id: profile.id,
                password_hash,
            },
        );
        self.profiles.insert(profile.id, profile);
        Ok(())
    }
}

impl Default for MemoryGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OrderGateway for MemoryGateway {
    async fn fetch_orders(&self) -> Result<Vec<Order>, GatewayError> {
        let mut orders: Vec<Order> = self.orders.iter().map(|kv| kv.value().clone()).collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    async fn fetch_orders_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Order>, GatewayError> {
        let mut orders: Vec<Order> = self
            .orders
            .iter()
            .filter(|kv| kv.value().created_at >= start && kv.value().created_at <= end)
            .map(|kv| kv.value().clone())
            .collect();
        orders.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(orders)
    }

    async fn fetch_order_by_id(&self, id: Uuid) -> Result<Order, GatewayError> {
        self.orders
            .get(&id)
            .map(|kv| kv.value().clone())
            .ok_or_else(|| GatewayError::NotFound(format!("order {id}")))
    }

    async fn update_order_status(
        &self,
        id: Uuid,
        status: OrderStatus,
    ) -> Result<(), GatewayError> {
        let now = Utc::now();
        match self.orders.get_mut(&id) {
            Some(mut order) => {
                order.status = status;
                order.updated_at = now;
            }
            None => return Err(GatewayError::NotFound(format!("order {id}"))),
        }
        self.emit(OrderChange::Updated(OrderPatch::status_change(
            id, status, now,
        )));
        Ok(())
    }

    fn subscribe_order_changes(&self) -> broadcast::Receiver<OrderChange> {
        self.changes.subscribe()
    }
}

#[async_trait]
impl ProductGateway for MemoryGateway {
    async fn fetch_products(&self) -> Result<Vec<Product>, GatewayError> {
        let mut products: Vec<Product> =
            self.products.iter().map(|kv| kv.value().clone()).collect();
        products.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(products)
    }

    async fn fetch_product_by_id(&self, id: Uuid) -> Result<Product, GatewayError> {
        self.products
            .get(&id)
            .map(|kv| kv.value().clone())
            .ok_or_else(|| GatewayError::NotFound(format!("product {id}")))
    }

    async fn create_product(&self, draft: ProductDraft) -> Result<Product, GatewayError> {
        let product = draft.into_product(Utc::now());
        self.products.insert(product.id, product.clone());
        Ok(product)
    }

    async fn update_product(
        &self,
        id: Uuid,
        draft: ProductDraft,
    ) -> Result<Product, GatewayError> {
        match self.products.get_mut(&id) {
            Some(mut product) => {
                draft.apply_to(&mut product, Utc::now());
                Ok(product.clone())
            }
            None => Err(GatewayError::NotFound(format!("product {id}"))),
        }
    }

    async fn delete_product(&self, id: Uuid) -> Result<(), GatewayError> {
        self.products
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| GatewayError::NotFound(format!("product {id}")))
    }

    async fn update_stock(&self, id: Uuid, quantity: u32) -> Result<(), GatewayError> {
        match self.products.get_mut(&id) {
            Some(mut product) => {
                product.stock_quantity = quantity;
                product.updated_at = Utc::now();
                Ok(())
            }
            None => Err(GatewayError::NotFound(format!("product {id}"))),
        }
    }

    async fn fetch_low_stock(&self, threshold: u32) -> Result<Vec<Product>, GatewayError> {
        let mut products: Vec<Product> = self
            .products
            .iter()
            .filter(|kv| kv.value().stock_quantity < threshold)
            .map(|kv| kv.value().clone())
            .collect();
        products.sort_by_key(|p| p.stock_quantity);
        Ok(products)
    }
}

#[async_trait]
impl ProfileGateway for MemoryGateway {
    async fn fetch_profiles(&self, role: Option<Role>) -> Result<Vec<Profile>, GatewayError> {
        let mut profiles: Vec<Profile> = self
            .profiles
            .iter()
            .filter(|kv| role.is_none_or(|r| kv.value().role == r))
            .map(|kv| kv.value().clone())
            .collect();
        profiles.sort_by(|a, b| a.full_name.cmp(&b.full_name));
        Ok(profiles)
    }

    async fn fetch_profile_by_id(&self, id: Uuid) -> Result<Profile, GatewayError> {
        self.profiles
            .get(&id)
            .map(|kv| kv.value().clone())
            .ok_or_else(|| GatewayError::NotFound(format!("profile {id}")))
    }

    async fn update_profile(
        &self,
        id: Uuid,
        update: ProfileUpdate,
    ) -> Result<Profile, GatewayError> {
        match self.profiles.get_mut(&id) {
            Some(mut profile) => {
                profile.apply_update(&update, Utc::now());
                Ok(profile.clone())
            }
            None => Err(GatewayError::NotFound(format!("profile {id}"))),
        }
    }

    async fn create_rider(&self, rider: NewRider) -> Result<Profile, GatewayError> {
        let now = Utc::now();
        let profile = Profile {
            id: Uuid::new_v4(),
            full_name: rider.full_name,
            email: rider.email,
            phone_number: rider.phone_number,
            address: rider.address,
            role: Role::Rider,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        // Riders sign in from a separate app; the console only provisions the
        // account, with a generated one-time credential.
        let generated = Uuid::new_v4().simple().to_string();
        let password_hash = bcrypt::hash(&generated, bcrypt::DEFAULT_COST)
            .map_err(|e| GatewayError::Write(e.to_string()))?;
        self.accounts.insert(
            profile.email.clone(),
            Account {
                user_id: profile.id,
                password_hash,
            },
        );
        self.profiles.insert(profile.id, profile.clone());
        Ok(profile)
    }

    async fn fetch_deliveries(&self, rider: Option<Uuid>) -> Result<Vec<Delivery>, GatewayError> {
        let mut deliveries: Vec<Delivery> = self
            .deliveries
            .iter()
            .filter(|kv| rider.is_none_or(|r| kv.value().rider_id == r))
            .map(|kv| kv.value().clone())
            .collect();
        deliveries.sort_by(|a, b| b.assigned_at.cmp(&a.assigned_at));
        Ok(deliveries)
    }
}

#[async_trait]
impl AuthGateway for MemoryGateway {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, GatewayError> {
        let (user_id, password_hash) = match self.accounts.get(email) {
            Some(account) => (account.user_id, account.password_hash.clone()),
            None => return Err(GatewayError::Auth("invalid email or password".into())),
        };
        let ok = bcrypt::verify(password, &password_hash)
            .map_err(|e| GatewayError::Auth(e.to_string()))?;
        if !ok {
            return Err(GatewayError::Auth("invalid email or password".into()));
        }
        let user = AuthUser {
            id: user_id,
            email: email.to_string(),
        };
        *self.current.write().await = Some(user.clone());
        Ok(user)
    }

    async fn sign_out(&self) -> Result<(), GatewayError> {
        *self.current.write().await = None;
        Ok(())
    }

    async fn current_user(&self) -> Result<Option<AuthUser>, GatewayError> {
        Ok(self.current.read().await.clone())
    }
}
