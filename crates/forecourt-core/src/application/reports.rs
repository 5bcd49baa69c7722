use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Duration, Months, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use forecourt_types::domain::delivery::{Delivery, DeliveryStatus};
use forecourt_types::domain::order::{Order, OrderStatus};
use forecourt_types::domain::product::{Product, ProductCategory};
use forecourt_types::domain::UnknownVariant;
use forecourt_types::ports::gateway::{OrderGateway, ProductGateway};

use crate::errors::AppError;

pub const TOP_CUSTOMER_LIMIT: usize = 5;

/// Reporting window selected in the console. A year-long window switches the
/// time series from daily to monthly buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportRange {
    #[serde(rename = "week")]
    Week,
    #[serde(rename = "month")]
    Month,
    #[serde(rename = "quarter")]
    Quarter,
    #[serde(rename = "year")]
    Year,
}

impl ReportRange {
    pub fn as_str(self) -> &'static str {
        match self {
            ReportRange::Week => "week",
            ReportRange::Month => "month",
            ReportRange::Quarter => "quarter",
            ReportRange::Year => "year",
        }
    }

    pub fn window(self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        let start = match self {
            ReportRange::Week => now - Duration::days(7),
            ReportRange::Month => now.checked_sub_months(Months::new(1)).unwrap_or(now),
            ReportRange::Quarter => now.checked_sub_months(Months::new(3)).unwrap_or(now),
            ReportRange::Year => now.checked_sub_months(Months::new(12)).unwrap_or(now),
        };
        (start, now)
    }

    pub fn bucket(self) -> Bucket {
        match self {
            ReportRange::Year => Bucket::Monthly,
            _ => Bucket::Daily,
        }
    }
}

impl std::fmt::Display for ReportRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ReportRange {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            ReportRange::Week,
            ReportRange::Month,
            ReportRange::Quarter,
            ReportRange::Year,
        ]
        .into_iter()
        .find(|v| v.as_str() == s)
        .ok_or_else(|| UnknownVariant::new("report range", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    Daily,
    Monthly,
}

impl Bucket {
    /// Sortable period key, so ascending string order is chronological.
    fn key(self, at: DateTime<Utc>) -> String {
        match self {
            Bucket::Daily => at.format("%Y-%m-%d").to_string(),
            Bucket::Monthly => at.format("%Y-%m").to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportSummary {
    pub total_revenue_cents: i64,
    pub total_orders: u64,
    pub completed_orders: u64,
    /// Every status appears, including zero counts.
    pub status_counts: BTreeMap<OrderStatus, u64>,
    /// 0.0 when no completed orders exist.
    pub average_order_cents: f64,
    pub unique_customers: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CategorySales {
    pub revenue_cents: i64,
    pub quantity: u64,
    /// Distinct orders containing at least one item of the category.
    pub order_count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeBucket {
    pub period: String,
    pub revenue_cents: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CustomerSpend {
    pub customer_id: Uuid,
    pub name: String,
    pub total_spent_cents: i64,
    pub order_count: u64,
}

/// Sales report over a batch of orders fetched for a date window. All
/// derivation is pure; the batch is recomputed in full on every refresh.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SalesReport {
    pub summary: ReportSummary,
    pub category_sales: BTreeMap<ProductCategory, CategorySales>,
    /// Ascending by period.
    pub time_series: Vec<TimeBucket>,
    /// Top spenders by completed orders, descending, ties in first-seen order.
    pub top_customers: Vec<CustomerSpend>,
}

impl SalesReport {
    pub fn build(orders: &[Order], bucket: Bucket) -> Self {
        let mut status_counts: BTreeMap<OrderStatus, u64> =
            OrderStatus::ALL.into_iter().map(|s| (s, 0)).collect();
        let mut total_revenue_cents = 0i64;
        let mut completed_orders = 0u64;
        let mut unique_customers: HashSet<Option<Uuid>> = HashSet::new();
        let mut category_sales: BTreeMap<ProductCategory, CategorySales> = BTreeMap::new();
        let mut category_orders: BTreeMap<ProductCategory, HashSet<Uuid>> = BTreeMap::new();
        let mut series: BTreeMap<String, i64> = BTreeMap::new();
        let mut spenders: Vec<CustomerSpend> = Vec::new();
        let mut spender_index: HashMap<Uuid, usize> = HashMap::new();

        for order in orders {
            if let Some(count) = status_counts.get_mut(&order.status) {
                *count += 1;
            }
            unique_customers.insert(order.customer_id);

            for item in &order.items {
                let entry = category_sales.entry(item.product.category).or_default();
                entry.revenue_cents += item.subtotal_cents();
                entry.quantity += u64::from(item.quantity);
                category_orders
                    .entry(item.product.category)
                    .or_default()
                    .insert(order.id);
            }

            if order.status != OrderStatus::Completed {
                continue;
            }
            total_revenue_cents += order.total_cents;
            completed_orders += 1;
            *series.entry(bucket.key(order.created_at)).or_insert(0) += order.total_cents;

            if let Some(customer_id) = order.customer_id {
                let slot = *spender_index.entry(customer_id).or_insert_with(|| {
                    spenders.push(CustomerSpend {
                        customer_id,
                        name: order
                            .customer
                            .as_ref()
                            .map(|c| c.full_name.clone())
                            .unwrap_or_else(|| "Unknown Customer".to_string()),
                        total_spent_cents: 0,
                        order_count: 0,
                    });
                    spenders.len() - 1
                });
                spenders[slot].total_spent_cents += order.total_cents;
                spenders[slot].order_count += 1;
            }
        }

        for (category, order_ids) in category_orders {
            if let Some(entry) = category_sales.get_mut(&category) {
                entry.order_count = order_ids.len() as u64;
            }
        }

        let average_order_cents = if completed_orders > 0 {
            total_revenue_cents as f64 / completed_orders as f64
        } else {
            0.0
        };

        // Vec::sort_by is stable, so equal spenders keep first-seen order.
        spenders.sort_by(|a, b| b.total_spent_cents.cmp(&a.total_spent_cents));
        spenders.truncate(TOP_CUSTOMER_LIMIT);

        SalesReport {
            summary: ReportSummary {
                total_revenue_cents,
                total_orders: orders.len() as u64,
                completed_orders,
                status_counts,
                average_order_cents,
                unique_customers: unique_customers.len() as u64,
            },
            category_sales,
            time_series: series
                .into_iter()
                .map(|(period, revenue_cents)| TimeBucket {
                    period,
                    revenue_cents,
                })
                .collect(),
            top_customers: spenders,
        }
    }

    /// Flat export matching the console's download format.
    pub fn to_csv(&self) -> String {
        fn money(cents: i64) -> String {
            format!("{}.{:02}", cents / 100, (cents % 100).abs())
        }

        let mut rows = vec![
            "Date,Revenue,Category,Category Revenue,Category Quantity".to_string()
        ];
        for bucket in &self.time_series {
            rows.push(format!("{},{},,,", bucket.period, money(bucket.revenue_cents)));
        }
        for (category, sales) in &self.category_sales {
            rows.push(format!(
                ",,{},{},{}",
                category,
                money(sales.revenue_cents),
                sales.quantity
            ));
        }
        rows.push(",,SUMMARY,,".to_string());
        rows.push(format!(
            "Total Revenue,{},,,",
            money(self.summary.total_revenue_cents)
        ));
        rows.push(format!("Total Orders,{},,,", self.summary.total_orders));
        rows.push(format!(
            "Completed Orders,{},,,",
            self.summary.completed_orders
        ));
        rows.push(format!(
            "Avg Order Value,{:.2},,,",
            self.summary.average_order_cents / 100.0
        ));
        rows.join("\n")
    }
}

/// Headline numbers for the dashboard landing page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DashboardStats {
    pub total_revenue_cents: i64,
    pub today_revenue_cents: i64,
    pub pending_orders: u64,
    pub processing_orders: u64,
    pub completed_orders: u64,
    pub low_stock_products: u64,
}

impl DashboardStats {
    pub fn build(orders: &[Order], products: &[Product], now: DateTime<Utc>) -> Self {
        let today = now.date_naive();
        let mut stats = DashboardStats {
            total_revenue_cents: 0,
            today_revenue_cents: 0,
            pending_orders: 0,
            processing_orders: 0,
            completed_orders: 0,
            low_stock_products: products.iter().filter(|p| p.is_low_stock()).count() as u64,
        };
        for order in orders {
            match order.status {
                OrderStatus::Pending => stats.pending_orders += 1,
                OrderStatus::Processing => stats.processing_orders += 1,
                OrderStatus::Completed => {
                    stats.completed_orders += 1;
                    stats.total_revenue_cents += order.total_cents;
                    if order.created_at.date_naive() == today {
                        stats.today_revenue_cents += order.total_cents;
                    }
                }
                OrderStatus::OutForDelivery | OrderStatus::Cancelled => {}
            }
        }
        stats
    }
}

/// Per-customer order history rollup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CustomerActivity {
    pub total_orders: u64,
    pub completed_orders: u64,
    pub pending_orders: u64,
    /// Completed spend only.
    pub total_spent_cents: i64,
    pub last_order_at: Option<DateTime<Utc>>,
}

impl CustomerActivity {
    pub fn build(orders: &[Order]) -> Self {
        let mut activity = CustomerActivity {
            total_orders: orders.len() as u64,
            completed_orders: 0,
            pending_orders: 0,
            total_spent_cents: 0,
            last_order_at: None,
        };
        for order in orders {
            match order.status {
                OrderStatus::Completed => {
                    activity.completed_orders += 1;
                    activity.total_spent_cents += order.total_cents;
                }
                OrderStatus::Pending => activity.pending_orders += 1,
                _ => {}
            }
            if activity.last_order_at.is_none_or(|at| order.created_at > at) {
                activity.last_order_at = Some(order.created_at);
            }
        }
        activity
    }
}

/// Delivery performance rollup for one rider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RiderStats {
    pub total: u64,
    pub completed: u64,
    pub pending: u64,
    pub failed: u64,
    pub avg_delivery_minutes: Option<i64>,
}

impl RiderStats {
    pub fn build(deliveries: &[Delivery]) -> Self {
        let mut stats = RiderStats {
            total: deliveries.len() as u64,
            completed: 0,
            pending: 0,
            failed: 0,
            avg_delivery_minutes: None,
        };
        let mut timed: Vec<i64> = Vec::new();
        for delivery in deliveries {
            match delivery.status {
                DeliveryStatus::Delivered => stats.completed += 1,
                DeliveryStatus::Failed => stats.failed += 1,
                DeliveryStatus::Assigned | DeliveryStatus::PickedUp => stats.pending += 1,
            }
            if let Some(minutes) = delivery.delivery_minutes() {
                timed.push(minutes);
            }
        }
        if !timed.is_empty() {
            let sum: i64 = timed.iter().sum();
            stats.avg_delivery_minutes =
                Some((sum as f64 / timed.len() as f64).round() as i64);
        }
        stats
    }
}

/// Fetch-then-derive wrapper the HTTP layer calls into.
pub struct ReportService<G> {
    gateway: Arc<G>,
}

impl<G: OrderGateway + ProductGateway> ReportService<G> {
    pub fn new(gateway: Arc<G>) -> Self {
        Self { gateway }
    }

    pub async fn sales_report(
        &self,
        range: ReportRange,
        now: DateTime<Utc>,
    ) -> Result<SalesReport, AppError> {
        let (start, end) = range.window(now);
        let orders = self.gateway.fetch_orders_between(start, end).await?;
        Ok(SalesReport::build(&orders, range.bucket()))
    }

    pub async fn dashboard(&self, now: DateTime<Utc>) -> Result<DashboardStats, AppError> {
        let orders = self.gateway.fetch_orders().await?;
        let products = self.gateway.fetch_products().await?;
        Ok(DashboardStats::build(&orders, &products, now))
    }

    pub async fn customer_activity(&self, customer: Uuid) -> Result<CustomerActivity, AppError> {
        let orders = self.gateway.fetch_orders().await?;
        let theirs: Vec<Order> = orders
            .into_iter()
            .filter(|o| o.customer_id == Some(customer))
            .collect();
        Ok(CustomerActivity::build(&theirs))
    }
}
