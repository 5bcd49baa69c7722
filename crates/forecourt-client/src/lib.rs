//! forecourt-client: typed reqwest client for the console's HTTP API.

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::Context;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use forecourt_types::domain::order::{Order, OrderStatus};
use forecourt_types::domain::product::{Product, ProductCategory, ProductDraft};
use forecourt_types::domain::profile::{NewRider, Profile, ProfileUpdate, Role};

#[derive(Clone)]
pub struct ConsoleClientBuilder {
    base: Url,
    headers: HeaderMap,
    timeout: Option<Duration>,
    client: Option<reqwest::Client>,
}

#[derive(Clone)]
pub struct ConsoleClient {
    base: Url,
    client: reqwest::Client,
}

impl ConsoleClient {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        Self::builder(base_url)?.build()
    }

    pub fn builder(base_url: &str) -> anyhow::Result<ConsoleClientBuilder> {
        let base = Url::parse(base_url).context("invalid base url")?;
        Ok(ConsoleClientBuilder {
            base,
            headers: HeaderMap::new(),
            timeout: None,
            client: None,
        })
    }

    fn url(&self, path: &str) -> anyhow::Result<Url> {
        self.base.join(path).context("failed to join url")
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> anyhow::Result<SessionInfo> {
        let res = self
            .client
            .post(self.url("auth/sign-in")?)
            .json(&SignInRequest {
                email: email.to_string(),
                password: password.to_string(),
            })
            .send()
            .await?
            .error_for_status()?;
        Ok(res.json().await?)
    }

    pub async fn sign_out(&self) -> anyhow::Result<()> {
        self.client
            .post(self.url("auth/sign-out")?)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    pub async fn list_orders(&self) -> anyhow::Result<Vec<Order>> {
        let res = self
            .client
            .get(self.url("orders")?)
            .send()
            .await?
            .error_for_status()?;
        Ok(res.json().await?)
    }

    pub async fn get_order(&self, id: &str) -> anyhow::Result<Order> {
        let res = self
            .client
            .get(self.url(&format!("orders/{id}"))?)
            .send()
            .await?
            .error_for_status()?;
        Ok(res.json().await?)
    }

    pub async fn update_order_status(&self, id: &str, status: OrderStatus) -> anyhow::Result<()> {
        self.client
            .patch(self.url(&format!("orders/{id}/status"))?)
            .json(&UpdateStatusRequest { status })
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    pub async fn list_products(&self) -> anyhow::Result<Vec<Product>> {
        let res = self
            .client
            .get(self.url("products")?)
            .send()
            .await?
            .error_for_status()?;
        Ok(res.json().await?)
    }

    pub async fn create_product(&self, draft: &ProductDraft) -> anyhow::Result<Product> {
        let res = self
            .client
            .post(self.url("products")?)
            .json(draft)
            .send()
            .await?
            .error_for_status()?;
        Ok(res.json().await?)
    }

    pub async fn update_product(&self, id: &str, draft: &ProductDraft) -> anyhow::Result<Product> {
        let res = self
            .client
            .put(self.url(&format!("products/{id}"))?)
            .json(draft)
            .send()
            .await?
            .error_for_status()?;
        Ok(res.json().await?)
    }

    pub async fn delete_product(&self, id: &str) -> anyhow::Result<()> {
        self.client
            .delete(self.url(&format!("products/{id}"))?)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    pub async fn set_stock(&self, id: &str, quantity: u32) -> anyhow::Result<()> {
        self.client
            .patch(self.url(&format!("products/{id}/stock"))?)
            .json(&StockRequest { quantity })
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    pub async fn low_stock(&self, threshold: Option<u32>) -> anyhow::Result<Vec<Product>> {
        let mut url = self.url("products/low-stock")?;
        if let Some(threshold) = threshold {
            url.query_pairs_mut()
                .append_pair("threshold", &threshold.to_string());
        }
        let res = self.client.get(url).send().await?.error_for_status()?;
        Ok(res.json().await?)
    }

    pub async fn list_profiles(&self, role: Option<Role>) -> anyhow::Result<Vec<Profile>> {
        let mut url = self.url("profiles")?;
        if let Some(role) = role {
            url.query_pairs_mut().append_pair("role", role.as_str());
        }
        let res = self.client.get(url).send().await?.error_for_status()?;
        Ok(res.json().await?)
    }

    pub async fn update_profile(
        &self,
        id: &str,
        update: &ProfileUpdate,
    ) -> anyhow::Result<Profile> {
        let res = self
            .client
            .patch(self.url(&format!("profiles/{id}"))?)
            .json(update)
            .send()
            .await?
            .error_for_status()?;
        Ok(res.json().await?)
    }

    pub async fn create_rider(&self, rider: &NewRider) -> anyhow::Result<Profile> {
        let res = self
            .client
            .post(self.url("riders")?)
            .json(rider)
            .send()
            .await?
            .error_for_status()?;
        Ok(res.json().await?)
    }

    pub async fn rider_stats(&self, id: &str) -> anyhow::Result<RiderStatsSummary> {
        let res = self
            .client
            .get(self.url(&format!("riders/{id}/stats"))?)
            .send()
            .await?
            .error_for_status()?;
        Ok(res.json().await?)
    }

    /// `range` is one of week | month | quarter | year; the server defaults
    /// to month.
    pub async fn sales_report(&self, range: Option<&str>) -> anyhow::Result<SalesReportData> {
        let mut url = self.url("reports/sales")?;
        if let Some(range) = range {
            url.query_pairs_mut().append_pair("range", range);
        }
        let res = self.client.get(url).send().await?.error_for_status()?;
        Ok(res.json().await?)
    }

    pub async fn dashboard_stats(&self) -> anyhow::Result<DashboardSnapshot> {
        let res = self
            .client
            .get(self.url("dashboard/stats")?)
            .send()
            .await?
            .error_for_status()?;
        Ok(res.json().await?)
    }
}

impl ConsoleClientBuilder {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_header(
        mut self,
        key: impl AsRef<str>,
        value: impl AsRef<str>,
    ) -> anyhow::Result<Self> {
        let header_name =
            HeaderName::from_bytes(key.as_ref().as_bytes()).context("invalid header name")?;
        let header_value = HeaderValue::from_str(value.as_ref()).context("invalid header value")?;
        self.headers.insert(header_name, header_value);
        Ok(self)
    }

    pub fn with_reqwest_client(mut self, client: reqwest::Client) -> Self {
        self.client = Some(client);
        self
    }

    pub fn build(self) -> anyhow::Result<ConsoleClient> {
        if let Some(client) = self.client {
            return Ok(ConsoleClient {
                base: self.base,
                client,
            });
        }

        let mut builder = reqwest::Client::builder();
        if !self.headers.is_empty() {
            builder = builder.default_headers(self.headers);
        }
        if let Some(t) = self.timeout {
            builder = builder.timeout(t);
        }
        let client = builder.build()?;
        Ok(ConsoleClient {
            base: self.base,
            client,
        })
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct SignInRequest {
    email: String,
    password: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SessionInfo {
    pub user_id: String,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub signed_in_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct UpdateStatusRequest {
    status: OrderStatus,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct StockRequest {
    quantity: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SalesReportData {
    pub summary: ReportSummaryData,
    pub category_sales: BTreeMap<ProductCategory, CategorySalesData>,
    pub time_series: Vec<TimeBucketData>,
    pub top_customers: Vec<CustomerSpendData>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ReportSummaryData {
    pub total_revenue_cents: i64,
    pub total_orders: u64,
    pub completed_orders: u64,
    pub status_counts: BTreeMap<OrderStatus, u64>,
    pub average_order_cents: f64,
    pub unique_customers: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CategorySalesData {
    pub revenue_cents: i64,
    pub quantity: u64,
    pub order_count: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TimeBucketData {
    pub period: String,
    pub revenue_cents: i64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CustomerSpendData {
    pub customer_id: Uuid,
    pub name: String,
    pub total_spent_cents: i64,
    pub order_count: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DashboardSnapshot {
    pub total_revenue_cents: i64,
    pub today_revenue_cents: i64,
    pub pending_orders: u64,
    pub processing_orders: u64,
    pub completed_orders: u64,
    pub low_stock_products: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RiderStatsSummary {
    pub total: u64,
    pub completed: u64,
    pub pending: u64,
    pub failed: u64,
    pub avg_delivery_minutes: Option<i64>,
}
