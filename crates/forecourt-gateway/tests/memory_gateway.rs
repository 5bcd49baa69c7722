#![cfg(feature = "memory")]

use chrono::{Duration, Utc};
use uuid::Uuid;

use forecourt_gateway::memory::MemoryGateway;
use forecourt_types::domain::order::{
    CustomerSummary, LineItem, Order, OrderStatus, PaymentMethod, ProductRef,
};
use forecourt_types::domain::product::{ProductCategory, ProductDraft};
use forecourt_types::domain::profile::{NewRider, Profile, ProfileUpdate, Role};
use forecourt_types::ports::gateway::{
    AuthGateway, GatewayError, OrderChange, OrderGateway, ProductGateway, ProfileGateway,
};

fn sample_order(name: &str) -> Order {
    Order::new(
        Some(Uuid::new_v4()),
        Some(CustomerSummary {
            full_name: name.into(),
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

fn sample_draft(name: &str, stock: u32) -> ProductDraft {
    ProductDraft {
        name: name.into(),
        category: ProductCategory::MotorOil,
        price_cents: 45000,
        stock_quantity: stock,
        unit: "pcs".into(),
        is_active: true,
        low_stock_threshold: None,
    }
}

fn admin_profile(email: &str) -> Profile {
    let now = Utc::now();
    Profile {
        id: Uuid::new_v4(),
        full_name: "Site Admin".into(),
        email: email.into(),
        phone_number: "0917".into(),
        address: "Head office".into(),
        role: Role::Admin,
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}

#[tokio::test]
async fn orders_list_most_recent_first() {
    let gw = MemoryGateway::new();
    let mut older = sample_order("Ana Cruz");
    older.created_at = Utc::now() - Duration::hours(2);
    let newer = sample_order("Ben Reyes");
    gw.insert_order(older.clone());
    gw.insert_order(newer.clone());

    let listed = gw.fetch_orders().await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].id, newer.id);
    assert_eq!(listed[1].id, older.id);

    let fetched = gw.fetch_order_by_id(older.id).await.unwrap();
    assert_eq!(fetched.customer.unwrap().full_name, "Ana Cruz");
}

#[tokio::test]
async fn order_mutations_emit_change_events() {
    let gw = MemoryGateway::new();
    let mut rx = gw.subscribe_order_changes();

    let order = sample_order("Ana Cruz");
    gw.insert_order(order.clone());
    match rx.recv().await.unwrap() {
        OrderChange::Inserted(inserted) => assert_eq!(inserted.id, order.id),
        other => panic!("expected insert event, got {other:?}"),
    }

    gw.update_order_status(order.id, OrderStatus::Processing)
        .await
        .unwrap();
    match rx.recv().await.unwrap() {
        OrderChange::Updated(patch) => {
            assert_eq!(patch.id, order.id);
            assert_eq!(patch.status, Some(OrderStatus::Processing));
        }
        other => panic!("expected update event, got {other:?}"),
    }

    gw.remove_order(order.id);
    match rx.recv().await.unwrap() {
        OrderChange::Deleted(id) => assert_eq!(id, order.id),
        other => panic!("expected delete event, got {other:?}"),
    }
}

#[tokio::test]
async fn status_update_for_missing_order_is_not_found() {
    let gw = MemoryGateway::new();
    let res = gw
        .update_order_status(Uuid::new_v4(), OrderStatus::Processing)
        .await;
    assert!(matches!(res, Err(GatewayError::NotFound(_))));
}

#[tokio::test]
async fn product_crud_and_low_stock() {
    let gw = MemoryGateway::new();
    let full = gw.create_product(sample_draft("Motor Oil 1L", 40)).await.unwrap();
    let low = gw.create_product(sample_draft("Motor Oil 4L", 3)).await.unwrap();
    let lower = gw.create_product(sample_draft("Grease Tub", 1)).await.unwrap();

    let listed = gw.fetch_products().await.unwrap();
    assert_eq!(listed.len(), 3);

    let low_stock = gw.fetch_low_stock(10).await.unwrap();
    let ids: Vec<_> = low_stock.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![lower.id, low.id]);

    gw.update_stock(low.id, 50).await.unwrap();
    let restocked = gw.fetch_product_by_id(low.id).await.unwrap();
    assert_eq!(restocked.stock_quantity, 50);

    let mut draft = sample_draft("Motor Oil 1L Gold", 40);
    draft.price_cents = 52000;
    let updated = gw.update_product(full.id, draft).await.unwrap();
    assert_eq!(updated.name, "Motor Oil 1L Gold");
    assert_eq!(updated.price_cents, 52000);

    gw.delete_product(full.id).await.unwrap();
    assert!(matches!(
        gw.fetch_product_by_id(full.id).await,
        Err(GatewayError::NotFound(_))
    ));
}

#[tokio::test]
async fn profiles_filter_by_role_and_update() {
    let gw = MemoryGateway::new();
    gw.seed_user(admin_profile("admin@station.ph"), "secret")
        .unwrap();
    let rider = gw
        .create_rider(NewRider {
            full_name: "Carlo Diaz".into(),
            email: "carlo@station.ph".into(),
            phone_number: "0918".into(),
            address: "Rider barracks".into(),
        })
        .await
        .unwrap();
    assert_eq!(rider.role, Role::Rider);
    assert!(rider.is_active);

    let riders = gw.fetch_profiles(Some(Role::Rider)).await.unwrap();
    assert_eq!(riders.len(), 1);
    let everyone = gw.fetch_profiles(None).await.unwrap();
    assert_eq!(everyone.len(), 2);

    let updated = gw
        .update_profile(
            rider.id,
            ProfileUpdate {
                is_active: Some(false),
                ..ProfileUpdate::default()
            },
        )
        .await
        .unwrap();
    assert!(!updated.is_active);
    assert_eq!(updated.full_name, "Carlo Diaz");
}

#[tokio::test]
async fn sign_in_tracks_current_user() {
    let gw = MemoryGateway::new();
    let profile = admin_profile("admin@station.ph");
    gw.seed_user(profile.clone(), "secret").unwrap();

    let wrong = gw.sign_in("admin@station.ph", "wrong").await;
    assert!(matches!(wrong, Err(GatewayError::Auth(_))));
    assert!(gw.current_user().await.unwrap().is_none());

    let user = gw.sign_in("admin@station.ph", "secret").await.unwrap();
    assert_eq!(user.id, profile.id);
    assert_eq!(gw.current_user().await.unwrap(), Some(user));

    gw.sign_out().await.unwrap();
    assert!(gw.current_user().await.unwrap().is_none());
}
