use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::UnknownVariant;

/// Threshold applied when a product does not configure its own.
pub const DEFAULT_LOW_STOCK_THRESHOLD: u32 = 10;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ProductCategory {
    Fuel,
    #[serde(rename = "Motor Oil")]
    MotorOil,
    #[serde(rename = "Engine Oil")]
    EngineOil,
}

impl ProductCategory {
    pub const ALL: [ProductCategory; 3] = [
        ProductCategory::Fuel,
        ProductCategory::MotorOil,
        ProductCategory::EngineOil,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ProductCategory::Fuel => "Fuel",
            ProductCategory::MotorOil => "Motor Oil",
            ProductCategory::EngineOil => "Engine Oil",
        }
    }
}

impl std::fmt::Display for ProductCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProductCategory {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| UnknownVariant::new("product category", s))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub category: ProductCategory,
    pub price_cents: i64,
    pub stock_quantity: u32,
    pub unit: String,
    pub is_active: bool,
    pub low_stock_threshold: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Low stock is derived, never stored. The boundary is strict: a product
    /// holding exactly its threshold is not low.
    pub fn is_low_stock(&self) -> bool {
        self.stock_quantity < self.low_stock_threshold
    }
}

/// Input for creating or updating a product. Validated before any write
/// leaves the console.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductDraft {
    pub name: String,
    pub category: ProductCategory,
    pub price_cents: i64,
    pub stock_quantity: u32,
    pub unit: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub low_stock_threshold: Option<u32>,
}

fn default_true() -> bool {
    true
}

impl ProductDraft {
    /// Client-side precondition check. Empty means the draft is acceptable.
    pub fn issues(&self) -> Vec<String> {
        let mut issues = Vec::new();
        let name = self.name.trim();
        if name.is_empty() {
            issues.push("name is required".to_string());
        } else if name.chars().count() < 3 {
            issues.push("name must be at least 3 characters".to_string());
        }
        if self.price_cents <= 0 {
            issues.push("price must be greater than 0".to_string());
        }
        if self.unit.trim().is_empty() {
            issues.push("unit is required".to_string());
        }
        issues
    }

    pub fn into_product(self, now: DateTime<Utc>) -> Product {
        Product {
            id: Uuid::new_v4(),
            name: self.name,
            category: self.category,
            price_cents: self.price_cents,
            stock_quantity: self.stock_quantity,
            unit: self.unit,
            is_active: self.is_active,
            low_stock_threshold: self
                .low_stock_threshold
                .unwrap_or(DEFAULT_LOW_STOCK_THRESHOLD),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply_to(&self, product: &mut Product, now: DateTime<Utc>) {
        product.name = self.name.clone();
        product.category = self.category;
        product.price_cents = self.price_cents;
        product.stock_quantity = self.stock_quantity;
        product.unit = self.unit.clone();
        product.is_active = self.is_active;
        if let Some(threshold) = self.low_stock_threshold {
            product.low_stock_threshold = threshold;
        }
        product.updated_at = now;
    }
}
