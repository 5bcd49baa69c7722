use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{FromRow, SqlitePool};
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

use forecourt_types::domain::delivery::{Delivery, DeliveryStatus};
use forecourt_types::domain::order::{
    CustomerSummary, LineItem, Order, OrderPatch, OrderStatus, PaymentMethod,
};
use forecourt_types::domain::product::{Product, ProductCategory, ProductDraft};
use forecourt_types::domain::profile::{NewRider, Profile, ProfileUpdate, Role};
use forecourt_types::ports::gateway::{
    AuthGateway, AuthUser, GatewayError, OrderChange, OrderGateway, ProductGateway, ProfileGateway,
};

const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// SQLite-backed gateway. Enum fields are stored by their wire string, line
/// items and the customer projection as JSON columns.
#[derive(Clone)]
pub struct SqliteGateway {
    pool: SqlitePool,
    current: Arc<RwLock<Option<AuthUser>>>,
    changes: broadcast::Sender<OrderChange>,
}

fn fetch_err(e: impl std::fmt::Display) -> GatewayError {
    GatewayError::Fetch(e.to_string())
}

fn write_err(e: impl std::fmt::Display) -> GatewayError {
    GatewayError::Write(e.to_string())
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, GatewayError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(fetch_err)
}

fn parse_uuid(s: &str) -> Result<Uuid, GatewayError> {
    Uuid::parse_str(s).map_err(fetch_err)
}

#[derive(FromRow)]
struct DbOrder {
    id: String,
    status: String,
    total_cents: i64,
    delivery_address: String,
    payment_method: String,
    customer_id: Option<String>,
    customer_json: Option<String>,
    items_json: String,
    created_at: String,
    updated_at: String,
}

impl DbOrder {
    fn into_order(self) -> Result<Order, GatewayError> {
        let customer: Option<CustomerSummary> = self
            .customer_json
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
            .map_err(fetch_err)?;
        let items: Vec<LineItem> = serde_json::from_str(&self.items_json).map_err(fetch_err)?;
        Ok(Order {
            id: parse_uuid(&self.id)?,
            status: OrderStatus::from_str(&self.status).map_err(fetch_err)?,
            total_cents: self.total_cents,
            delivery_address: self.delivery_address,
            payment_method: PaymentMethod::from_str(&self.payment_method).map_err(fetch_err)?,
            customer_id: self.customer_id.as_deref().map(parse_uuid).transpose()?,
            customer,
            items,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
        })
    }
}

#[derive(FromRow)]
struct DbProduct {
    id: String,
    name: String,
    category: String,
    price_cents: i64,
    stock_quantity: i64,
    unit: String,
    is_active: bool,
    low_stock_threshold: i64,
    created_at: String,
    updated_at: String,
}

impl DbProduct {
    fn into_product(self) -> Result<Product, GatewayError> {
        Ok(Product {
            id: parse_uuid(&self.id)?,
            name: self.name,
            category: ProductCategory::from_str(&self.category).map_err(fetch_err)?,
            price_cents: self.price_cents,
            stock_quantity: u32::try_from(self.stock_quantity).map_err(fetch_err)?,
            unit: self.unit,
            is_active: self.is_active,
            low_stock_threshold: u32::try_from(self.low_stock_threshold).map_err(fetch_err)?,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
        })
    }
}

#[derive(FromRow)]
struct DbProfile {
    id: String,
    full_name: String,
    email: String,
    phone_number: String,
    address: String,
    role: String,
    is_active: bool,
    created_at: String,
    updated_at: String,
}

impl DbProfile {
    fn into_profile(self) -> Result<Profile, GatewayError> {
        Ok(Profile {
            id: parse_uuid(&self.id)?,
            full_name: self.full_name,
            email: self.email,
            phone_number: self.phone_number,
            address: self.address,
            role: Role::from_str(&self.role).map_err(fetch_err)?,
            is_active: self.is_active,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
        })
    }
}

#[derive(FromRow)]
struct DbDelivery {
    id: String,
    order_id: String,
    rider_id: String,
    status: String,
    assigned_at: String,
    delivered_at: Option<String>,
}

impl DbDelivery {
    fn into_delivery(self) -> Result<Delivery, GatewayError> {
        Ok(Delivery {
            id: parse_uuid(&self.id)?,
            order_id: parse_uuid(&self.order_id)?,
            rider_id: parse_uuid(&self.rider_id)?,
            status: DeliveryStatus::from_str(&self.status).map_err(fetch_err)?,
            assigned_at: parse_timestamp(&self.assigned_at)?,
            delivered_at: self
                .delivered_at
                .as_deref()
                .map(parse_timestamp)
                .transpose()?,
        })
    }
}

impl SqliteGateway {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        // Ensure on-disk SQLite target directory exists (no-op for in-memory).
        if let Some(path) = database_url.strip_prefix("sqlite://") {
            if path != ":memory:" {
                let p = std::path::Path::new(path);
                if let Some(parent) = p.parent() {
                    if !parent.as_os_str().is_empty() {
                        tokio::fs::create_dir_all(parent).await?;
                    }
                }
            }
        }

        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await?;

        let ddl = include_str!("../migrations/0001_create_console_tables.sql");
        for statement in ddl.split(';') {
            let statement = statement.trim();
            if !statement.is_empty() {
                sqlx::query(statement).execute(&pool).await?;
            }
        }

        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Ok(Self {
            pool,
            current: Arc::new(RwLock::new(None)),
            changes,
        })
    }

    fn emit(&self, change: OrderChange) {
        let _ = self.changes.send(change);
    }

    /// Place an order as the external ordering system would.
    pub async fn insert_order(&self, order: Order) -> Result<(), GatewayError> {
        let customer_json = order
            .customer
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(write_err)?;
        let items_json = serde_json::to_string(&order.items).map_err(write_err)?;
        sqlx::query(
            "INSERT INTO orders (id, status, total_cents, delivery_address, payment_method, customer_id, customer_json, items_json, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(order.id.to_string())
        .bind(order.status.as_str())
        .bind(order.total_cents)
        .bind(&order.delivery_address)
        .bind(order.payment_method.as_str())
        .bind(order.customer_id.map(|id| id.to_string()))
        .bind(customer_json)
        .bind(items_json)
        .bind(order.created_at.to_rfc3339())
        .bind(order.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(write_err)?;
        self.emit(OrderChange::Inserted(order));
        Ok(())
    }

    /// Backend-side removal, visible to subscribers as a Delete event.
    pub async fn remove_order(&self, id: Uuid) -> Result<(), GatewayError> {
        let res = sqlx::query("DELETE FROM orders WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(write_err)?;
        if res.rows_affected() > 0 {
            self.emit(OrderChange::Deleted(id));
        }
        Ok(())
    }

    pub async fn insert_delivery(&self, delivery: Delivery) -> Result<(), GatewayError> {
        sqlx::query(
            "INSERT INTO deliveries (id, order_id, rider_id, status, assigned_at, delivered_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(delivery.id.to_string())
        .bind(delivery.order_id.to_string())
        .bind(delivery.rider_id.to_string())
        .bind(delivery.status.as_str())
        .bind(delivery.assigned_at.to_rfc3339())
        .bind(delivery.delivered_at.map(|dt| dt.to_rfc3339()))
        .execute(&self.pool)
        .await
        .map_err(write_err)?;
        Ok(())
    }

    async fn insert_profile(&self, profile: &Profile) -> Result<(), GatewayError> {
        sqlx::query(
            "INSERT INTO profiles (id, full_name, email, phone_number, address, role, is_active, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(profile.id.to_string())
        .bind(&profile.full_name)
        .bind(&profile.email)
        .bind(&profile.phone_number)
        .bind(&profile.address)
        .bind(profile.role.as_str())
        .bind(profile.is_active)
        .bind(profile.created_at.to_rfc3339())
        .bind(profile.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(write_err)?;
        Ok(())
    }

    async fn insert_account(&self, email: &str, user_id: Uuid, password: &str) -> Result<(), GatewayError> {
        let password_hash =
            bcrypt::hash(password, bcrypt::DEFAULT_COST).map_err(write_err)?;
        sqlx::query("INSERT OR REPLACE INTO accounts (email, user_id, password_hash) VALUES (?, ?, ?)")
            .bind(email)
            .bind(user_id.to_string())
            .bind(password_hash)
            .execute(&self.pool)
            .await
            .map_err(write_err)?;
        Ok(())
    }

    /// Register an account the auth service will accept.
    pub async fn seed_user(&self, profile: Profile, password: &str) -> Result<(), GatewayError> {
        self.insert_profile(&profile).await?;
        self.insert_account(&profile.email, profile.id, password).await
    }

    async fn load_product(&self, id: Uuid) -> Result<Product, GatewayError> {
        let row: Option<DbProduct> = sqlx::query_as("SELECT * FROM products WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(fetch_err)?;
        match row {
            Some(row) => row.into_product(),
            None => Err(GatewayError::NotFound(format!("product {id}"))),
        }
    }
}

#[async_trait]
impl OrderGateway for SqliteGateway {
    async fn fetch_orders(&self) -> Result<Vec<Order>, GatewayError> {
        let rows: Vec<DbOrder> =
            sqlx::query_as("SELECT * FROM orders ORDER BY created_at DESC")
                .fetch_all(&self.pool)
                .await
                .map_err(fetch_err)?;
        rows.into_iter().map(DbOrder::into_order).collect()
    }

    async fn fetch_orders_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Order>, GatewayError> {
        let rows: Vec<DbOrder> = sqlx::query_as(
            "SELECT * FROM orders WHERE created_at >= ? AND created_at <= ? ORDER BY created_at ASC",
        )
        .bind(start.to_rfc3339())
        .bind(end.to_rfc3339())
        .fetch_all(&self.pool)
        .await
        .map_err(fetch_err)?;
        rows.into_iter().map(DbOrder::into_order).collect()
    }

    async fn fetch_order_by_id(&self, id: Uuid) -> Result<Order, GatewayError> {
        let row: Option<DbOrder> = sqlx::query_as("SELECT * FROM orders WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(fetch_err)?;
        match row {
            Some(row) => row.into_order(),
            None => Err(GatewayError::NotFound(format!("order {id}"))),
        }
    }

    async fn update_order_status(
        &self,
        id: Uuid,
        status: OrderStatus,
    ) -> Result<(), GatewayError> {
        let now = Utc::now();
        let res = sqlx::query("UPDATE orders SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(now.to_rfc3339())
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(write_err)?;
        if res.rows_affected() == 0 {
            return Err(GatewayError::NotFound(format!("order {id}")));
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
impl ProductGateway for SqliteGateway {
    async fn fetch_products(&self) -> Result<Vec<Product>, GatewayError> {
        let rows: Vec<DbProduct> = sqlx::query_as("SELECT * FROM products ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .map_err(fetch_err)?;
        rows.into_iter().map(DbProduct::into_product).collect()
    }

    async fn fetch_product_by_id(&self, id: Uuid) -> Result<Product, GatewayError> {
        self.load_product(id).await
    }

    async fn create_product(&self, draft: ProductDraft) -> Result<Product, GatewayError> {
        let product = draft.into_product(Utc::now());
        sqlx::query(
            "INSERT INTO products (id, name, category, price_cents, stock_quantity, unit, is_active, low_stock_threshold, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(product.id.to_string())
        .bind(&product.name)
        .bind(product.category.as_str())
        .bind(product.price_cents)
        .bind(i64::from(product.stock_quantity))
        .bind(&product.unit)
        .bind(product.is_active)
        .bind(i64::from(product.low_stock_threshold))
        .bind(product.created_at.to_rfc3339())
        .bind(product.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(write_err)?;
        Ok(product)
    }

    async fn update_product(
        &self,
        id: Uuid,
        draft: ProductDraft,
    ) -> Result<Product, GatewayError> {
        let mut product = self.load_product(id).await?;
        draft.apply_to(&mut product, Utc::now());
        sqlx::query(
            "UPDATE products SET name = ?, category = ?, price_cents = ?, stock_quantity = ?, unit = ?, is_active = ?, low_stock_threshold = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&product.name)
        .bind(product.category.as_str())
        .bind(product.price_cents)
        .bind(i64::from(product.stock_quantity))
        .bind(&product.unit)
        .bind(product.is_active)
        .bind(i64::from(product.low_stock_threshold))
        .bind(product.updated_at.to_rfc3339())
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(write_err)?;
        Ok(product)
    }

    async fn delete_product(&self, id: Uuid) -> Result<(), GatewayError> {
        let res = sqlx::query("DELETE FROM products WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(write_err)?;
        if res.rows_affected() == 0 {
            return Err(GatewayError::NotFound(format!("product {id}")));
        }
        Ok(())
    }

    async fn update_stock(&self, id: Uuid, quantity: u32) -> Result<(), GatewayError> {
        let res = sqlx::query("UPDATE products SET stock_quantity = ?, updated_at = ? WHERE id = ?")
            .bind(i64::from(quantity))
            .bind(Utc::now().to_rfc3339())
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(write_err)?;
        if res.rows_affected() == 0 {
            return Err(GatewayError::NotFound(format!("product {id}")));
        }
        Ok(())
    }

    async fn fetch_low_stock(&self, threshold: u32) -> Result<Vec<Product>, GatewayError> {
        let rows: Vec<DbProduct> = sqlx::query_as(
            "SELECT * FROM products WHERE stock_quantity < ? ORDER BY stock_quantity",
        )
        .bind(i64::from(threshold))
        .fetch_all(&self.pool)
        .await
        .map_err(fetch_err)?;
        rows.into_iter().map(DbProduct::into_product).collect()
    }
}

#[async_trait]
impl ProfileGateway for SqliteGateway {
    async fn fetch_profiles(&self, role: Option<Role>) -> Result<Vec<Profile>, GatewayError> {
        let rows: Vec<DbProfile> = match role {
            Some(role) => {
                sqlx::query_as("SELECT * FROM profiles WHERE role = ? ORDER BY full_name")
                    .bind(role.as_str())
                    .fetch_all(&self.pool)
                    .await
            }
            None => {
                sqlx::query_as("SELECT * FROM profiles ORDER BY full_name")
                    .fetch_all(&self.pool)
                    .await
            }
        }
        .map_err(fetch_err)?;
        rows.into_iter().map(DbProfile::into_profile).collect()
    }

    async fn fetch_profile_by_id(&self, id: Uuid) -> Result<Profile, GatewayError> {
        let row: Option<DbProfile> = sqlx::query_as("SELECT * FROM profiles WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(fetch_err)?;
        match row {
            Some(row) => row.into_profile(),
            None => Err(GatewayError::NotFound(format!("profile {id}"))),
        }
    }

    async fn update_profile(
        &self,
        id: Uuid,
        update: ProfileUpdate,
    ) -> Result<Profile, GatewayError> {
        let mut profile = self.fetch_profile_by_id(id).await?;
        profile.apply_update(&update, Utc::now());
        sqlx::query(
            "UPDATE profiles SET full_name = ?, phone_number = ?, address = ?, is_active = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&profile.full_name)
        .bind(&profile.phone_number)
        .bind(&profile.address)
        .bind(profile.is_active)
        .bind(profile.updated_at.to_rfc3339())
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(write_err)?;
        Ok(profile)
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
        self.insert_profile(&profile).await?;
        let generated = Uuid::new_v4().simple().to_string();
        self.insert_account(&profile.email, profile.id, &generated)
            .await?;
        Ok(profile)
    }

    async fn fetch_deliveries(&self, rider: Option<Uuid>) -> Result<Vec<Delivery>, GatewayError> {
        let rows: Vec<DbDelivery> = match rider {
            Some(rider) => {
                sqlx::query_as(
                    "SELECT * FROM deliveries WHERE rider_id = ? ORDER BY assigned_at DESC",
                )
                .bind(rider.to_string())
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as("SELECT * FROM deliveries ORDER BY assigned_at DESC")
                    .fetch_all(&self.pool)
                    .await
            }
        }
        .map_err(fetch_err)?;
        rows.into_iter().map(DbDelivery::into_delivery).collect()
    }
}

#[derive(FromRow)]
struct DbAccount {
    user_id: String,
    password_hash: String,
}

#[async_trait]
impl AuthGateway for SqliteGateway {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, GatewayError> {
        let row: Option<DbAccount> =
            sqlx::query_as("SELECT user_id, password_hash FROM accounts WHERE email = ?")
                .bind(email)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| GatewayError::Auth(e.to_string()))?;
        let account = row.ok_or_else(|| GatewayError::Auth("invalid email or password".into()))?;
        let ok = bcrypt::verify(password, &account.password_hash)
            .map_err(|e| GatewayError::Auth(e.to_string()))?;
        if !ok {
            return Err(GatewayError::Auth("invalid email or password".into()));
        }
        let user = AuthUser {
            id: parse_uuid(&account.user_id).map_err(|e| GatewayError::Auth(e.to_string()))?,
            email: email.to_string(),
        };
        // Sessions are held in memory only; the accounts table is just the
        // credential store.
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
