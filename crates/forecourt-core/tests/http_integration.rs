use std::time::Duration;

use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use forecourt_core::application::Console;
use forecourt_core::inbound::http::{HttpServer, HttpServerConfig};
use forecourt_gateway::memory::MemoryGateway;
use forecourt_types::domain::order::{
    CustomerSummary, LineItem, Order, OrderStatus, PaymentMethod, ProductRef,
};
use forecourt_types::domain::product::ProductCategory;
use forecourt_types::domain::profile::{Profile, Role};

fn find_free_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

fn sample_order() -> Order {
    Order::new(
        Some(Uuid::new_v4()),
        Some(CustomerSummary {
            full_name: "Ana Cruz".into(),
            phone_number: "0917".into(),
            address: "12 Main St".into(),
        }),
        "12 Main St".into(),
        PaymentMethod::CashOnDelivery,
        vec![LineItem {
            quantity: 2,
            price_at_order_cents: 6550,
            product: ProductRef {
                id: Uuid::new_v4(),
                name: "Premium Diesel".into(),
                category: ProductCategory::Fuel,
                unit: "liters".into(),
            },
        }],
    )
    .unwrap()
}

fn admin_profile() -> Profile {
    let now = Utc::now();
    Profile {
        id: Uuid::new_v4(),
        full_name: "Site Admin".into(),
        email: "admin@station.ph".into(),
        phone_number: "0917".into(),
        address: "Head office".into(),
        role: Role::Admin,
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}

// MemoryGateway clones share their maps and change hub, so the test keeps
// one handle while the server owns another.
async fn start_server(gateway: MemoryGateway) -> (String, tokio::task::JoinHandle<()>) {
    let port = find_free_port();
    let console = Console::new(gateway, 10);
    let server = HttpServer::new(
        console,
        HttpServerConfig {
            port: port.to_string(),
        },
    )
    .await
    .unwrap();
    let handle = tokio::spawn(async move {
        server.run().await.expect("server run");
    });
    // Give the server a moment to start.
    tokio::time::sleep(Duration::from_millis(50)).await;
    (format!("http://127.0.0.1:{}", port), handle)
}

#[tokio::test]
async fn order_lifecycle_over_http() {
    let gateway = MemoryGateway::new();
    let order = sample_order();
    gateway.insert_order(order.clone());
    let (addr, handle) = start_server(gateway.clone()).await;
    let client = reqwest::Client::new();

    let list: Vec<Order> = client
        .get(format!("{}/orders", addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].id, order.id);

    let fetched: Order = client
        .get(format!("{}/orders/{}", addr, order.id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(fetched.customer.unwrap().full_name, "Ana Cruz");

    let res = client
        .patch(format!("{}/orders/{}/status", addr, order.id))
        .json(&json!({ "status": "Processing" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::NO_CONTENT);

    // The cached list catches up through the change stream.
    let mut status = OrderStatus::Pending;
    for _ in 0..100 {
        let list: Vec<Order> = client
            .get(format!("{}/orders", addr))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        status = list[0].status;
        if status == OrderStatus::Processing {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(status, OrderStatus::Processing);

    // Processing -> Pending walks the lifecycle backwards and must be rejected.
    let res = client
        .patch(format!("{}/orders/{}/status", addr, order.id))
        .json(&json!({ "status": "Pending" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::CONFLICT);

    let res = client
        .patch(format!("{}/orders/{}/status", addr, Uuid::new_v4()))
        .json(&json!({ "status": "Processing" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::NOT_FOUND);

    handle.abort();
}

#[tokio::test]
async fn product_routes_validate_and_report_low_stock() {
    let gateway = MemoryGateway::new();
    let (addr, handle) = start_server(gateway).await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/products", addr))
        .json(&json!({
            "name": "Premium Diesel",
            "category": "Fuel",
            "price_cents": 6550,
            "stock_quantity": 4,
            "unit": "liters"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::CREATED);
    let created: serde_json::Value = res.json().await.unwrap();
    assert_eq!(created["low_stock_threshold"], 10);

    let res = client
        .post(format!("{}/products", addr))
        .json(&json!({
            "name": "ab",
            "category": "Fuel",
            "price_cents": 0,
            "stock_quantity": 4,
            "unit": ""
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::BAD_REQUEST);

    let low: Vec<serde_json::Value> = client
        .get(format!("{}/products/low-stock", addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(low.len(), 1);
    assert_eq!(low[0]["name"], "Premium Diesel");

    let none: Vec<serde_json::Value> = client
        .get(format!("{}/products/low-stock?threshold=2", addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(none.is_empty());

    handle.abort();
}

#[tokio::test]
async fn sign_in_reports_and_dashboard() {
    let gateway = MemoryGateway::new();
    gateway.seed_user(admin_profile(), "secret").unwrap();

    let mut completed = sample_order();
    completed.status = OrderStatus::Completed;
    gateway.insert_order(completed);
    gateway.insert_order(sample_order());

    let (addr, handle) = start_server(gateway).await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/auth/sign-in", addr))
        .json(&json!({ "email": "admin@station.ph", "password": "wrong" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::UNAUTHORIZED);

    let res = client
        .post(format!("{}/auth/sign-in", addr))
        .json(&json!({ "email": "admin@station.ph", "password": "secret" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::OK);
    let session: serde_json::Value = res.json().await.unwrap();
    assert_eq!(session["role"], "admin");
    assert_eq!(session["full_name"], "Site Admin");

    let report: serde_json::Value = client
        .get(format!("{}/reports/sales?range=month", addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(report["summary"]["completed_orders"], 1);
    assert_eq!(report["summary"]["total_revenue_cents"], 13100);
    assert_eq!(report["category_sales"]["Fuel"]["order_count"], 2);

    let res = client
        .get(format!("{}/reports/sales?range=decade", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::BAD_REQUEST);

    let stats: serde_json::Value = client
        .get(format!("{}/dashboard/stats", addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats["total_revenue_cents"], 13100);
    assert_eq!(stats["pending_orders"], 1);
    assert_eq!(stats["completed_orders"], 1);

    let res = client
        .post(format!("{}/auth/sign-out", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::NO_CONTENT);

    handle.abort();
}
