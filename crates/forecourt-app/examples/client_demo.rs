///  To run :
///  cargo r --example client_demo
use chrono::Utc;
use tempfile::tempdir;
use uuid::Uuid;

use forecourt_client::ConsoleClient;
use forecourt_core::application::Console;
use forecourt_core::inbound::http::{HttpServer, HttpServerConfig};
use forecourt_gateway::sqlite::SqliteGateway;
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

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Start server on an ephemeral port against a temp file-backed SQLite DB
    // so multiple connections see the same data.
    let port = find_free_port();
    let addr = format!("http://127.0.0.1:{port}/");
    let tmp = tempdir()?;
    let db_path = tmp.path().join("forecourt.db");
    let db_url = format!("sqlite://{}", db_path.display());

    let backend = SqliteGateway::connect(&db_url).await?;

    let now = Utc::now();
    let admin = Profile {
        id: Uuid::new_v4(),
        full_name: "Site Admin".into(),
        email: "admin@station.ph".into(),
        phone_number: "0917".into(),
        address: "Head office".into(),
        role: Role::Admin,
        is_active: true,
        created_at: now,
        updated_at: now,
    };
    backend.seed_user(admin, "secret").await?;

    // An order placed by the external ordering flow.
    let order = Order::new(
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
    )?;
    backend.insert_order(order.clone()).await?;

    let console = Console::new(backend.clone(), 10);
    let server = HttpServer::new(
        console,
        HttpServerConfig {
            port: port.to_string(),
        },
    )
    .await?;
    let handle = tokio::spawn(async move {
        server.run().await.expect("server run");
    });
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    // Drive the console API as the admin frontend would.
    let client = ConsoleClient::new(&addr)?;
    let session = client.sign_in("admin@station.ph", "secret").await?;
    println!("Signed in as {} ({})", session.full_name, session.role);

    let orders = client.list_orders().await?;
    println!("Open orders: {}", orders.len());
    assert_eq!(orders.len(), 1);

    client
        .update_order_status(&order.id.to_string(), OrderStatus::Processing)
        .await?;
    let fetched = client.get_order(&order.id.to_string()).await?;
    println!("Order {} is now {}", fetched.id, fetched.status);
    assert_eq!(fetched.status, OrderStatus::Processing);

    let stats = client.dashboard_stats().await?;
    println!(
        "Dashboard: {} pending / {} processing",
        stats.pending_orders, stats.processing_orders
    );

    client.sign_out().await?;
    println!("Signed out");

    handle.abort();
    Ok(())
}
