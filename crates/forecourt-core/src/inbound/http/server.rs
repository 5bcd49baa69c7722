use axum::{
    extract::{Path, Query, State},
    routing::{get, patch, post, put},
    serve, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::application::reports::{
    CustomerActivity, DashboardStats, ReportRange, RiderStats, SalesReport,
};
use crate::application::session::Session;
use crate::application::Console;
use crate::errors::AppError;
use forecourt_types::domain::order::{Order, OrderStatus};
use forecourt_types::domain::product::{Product, ProductDraft};
use forecourt_types::domain::profile::{NewRider, Profile, ProfileUpdate, Role};
use forecourt_types::ports::gateway::DataGateway;

#[derive(Clone)]
pub struct HttpServerConfig {
    pub port: String,
}

pub struct HttpServer<G: DataGateway> {
    pub console: Arc<Console<G>>,
    pub config: HttpServerConfig,
}

#[derive(Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct SessionResponse {
    pub user_id: String,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub signed_in_at: DateTime<Utc>,
}

impl From<Session> for SessionResponse {
    fn from(session: Session) -> Self {
        Self {
            user_id: session.user.id.to_string(),
            email: session.user.email,
            full_name: session.profile.full_name,
            role: session.profile.role,
            signed_in_at: session.signed_in_at,
        }
    }
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
}

#[derive(Deserialize)]
pub struct StockRequest {
    pub quantity: u32,
}

#[derive(Deserialize)]
struct RoleQuery {
    role: Option<String>,
}

#[derive(Deserialize)]
struct LowStockQuery {
    threshold: Option<u32>,
}

#[derive(Deserialize)]
struct ReportQuery {
    range: Option<String>,
}

fn parse_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|e| AppError::Validation(e.to_string()))
}

impl<G: DataGateway> HttpServer<G> {
    pub async fn new(console: Console<G>, config: HttpServerConfig) -> anyhow::Result<Self> {
        Ok(Self {
            console: Arc::new(console),
            config,
        })
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let trace_layer = TraceLayer::new_for_http()
            .make_span_with(|request: &axum::extract::Request<_>| {
                let uri = request.uri().to_string();
                let request_id = Uuid::new_v4();
                tracing::info_span!(
                    "http_request",
                    %request_id,
                    method = %request.method(),
                    uri
                )
            })
            .on_request(
                |request: &axum::extract::Request<_>, span: &tracing::Span| {
                    tracing::info!(
                        parent: span,
                        method = %request.method(),
                        uri = %request.uri(),
                        "request"
                    );
                },
            )
            .on_response(
                |response: &axum::response::Response, latency: Duration, span: &tracing::Span| {
                    tracing::info!(
                        parent: span,
                        status = %response.status(),
                        latency_ms = %latency.as_millis(),
                        "response"
                    );
                },
            );

        // Prime the order cache, then stay attached to the live change
        // stream for as long as the server runs; the guard drops (and
        // unsubscribes) on every exit path.
        self.console.orders.refresh().await?;
        let _watch = self.console.orders.watch();

        let console = self.console.clone();
        let app = Router::new()
            .route("/health", get(health))
            .route("/auth/sign-in", post(sign_in::<G>))
            .route("/auth/sign-out", post(sign_out::<G>))
            .route("/orders", get(list_orders::<G>))
            .route("/orders/{id}", get(get_order::<G>))
            .route("/orders/{id}/status", patch(update_order_status::<G>))
            .route("/products", get(list_products::<G>).post(create_product::<G>))
            .route("/products/low-stock", get(low_stock::<G>))
            .route(
                "/products/{id}",
                put(update_product::<G>).delete(delete_product::<G>),
            )
            .route("/products/{id}/stock", patch(update_stock::<G>))
            .route("/profiles", get(list_profiles::<G>))
            .route("/profiles/{id}", patch(update_profile::<G>))
            .route("/riders", post(create_rider::<G>))
            .route("/riders/{id}/stats", get(rider_stats::<G>))
            .route("/customers/{id}/activity", get(customer_activity::<G>))
            .route("/reports/sales", get(sales_report::<G>))
            .route("/dashboard/stats", get(dashboard_stats::<G>))
            .layer(CorsLayer::permissive())
            .layer(trace_layer)
            .with_state(console);

        let addr: SocketAddr = format!("0.0.0.0:{}", self.config.port).parse()?;
        tracing::info!("starting console server on {}", addr);
        let listener = tokio::net::TcpListener::bind(addr).await?;
        serve(listener, app.into_make_service()).await?;
        Ok(())
    }
}

async fn health() -> (axum::http::StatusCode, Json<serde_json::Value>) {
    (
        axum::http::StatusCode::OK,
        Json(serde_json::json!({ "status": "ok" })),
    )
}

async fn sign_in<G: DataGateway>(
    State(console): State<Arc<Console<G>>>,
    Json(payload): Json<SignInRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    let session = console
        .sessions
        .sign_in(&payload.email, &payload.password)
        .await?;
    Ok(Json(session.into()))
}

async fn sign_out<G: DataGateway>(
    State(console): State<Arc<Console<G>>>,
) -> Result<axum::http::StatusCode, AppError> {
    if let Some(session) = console.sessions.resume().await? {
        console.sessions.sign_out(session).await?;
    }
    Ok(axum::http::StatusCode::NO_CONTENT)
}

async fn list_orders<G: DataGateway>(
    State(console): State<Arc<Console<G>>>,
) -> Json<Vec<Order>> {
    Json(console.orders.list())
}

async fn get_order<G: DataGateway>(
    State(console): State<Arc<Console<G>>>,
    Path(id): Path<String>,
) -> Result<Json<Order>, AppError> {
    let order = console.orders.view_details(parse_id(&id)?).await?;
    Ok(Json(order))
}

async fn update_order_status<G: DataGateway>(
    State(console): State<Arc<Console<G>>>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<axum::http::StatusCode, AppError> {
    console
        .orders
        .update_status(parse_id(&id)?, payload.status)
        .await?;
    // The cached list catches up through the change stream.
    Ok(axum::http::StatusCode::NO_CONTENT)
}

async fn list_products<G: DataGateway>(
    State(console): State<Arc<Console<G>>>,
) -> Result<Json<Vec<Product>>, AppError> {
    Ok(Json(console.catalog.list().await?))
}

async fn create_product<G: DataGateway>(
    State(console): State<Arc<Console<G>>>,
    Json(draft): Json<ProductDraft>,
) -> Result<(axum::http::StatusCode, Json<Product>), AppError> {
    let product = console.catalog.create(draft).await?;
    Ok((axum::http::StatusCode::CREATED, Json(product)))
}

async fn update_product<G: DataGateway>(
    State(console): State<Arc<Console<G>>>,
    Path(id): Path<String>,
    Json(draft): Json<ProductDraft>,
) -> Result<Json<Product>, AppError> {
    Ok(Json(console.catalog.update(parse_id(&id)?, draft).await?))
}

async fn delete_product<G: DataGateway>(
    State(console): State<Arc<Console<G>>>,
    Path(id): Path<String>,
) -> Result<axum::http::StatusCode, AppError> {
    console.catalog.delete(parse_id(&id)?).await?;
    Ok(axum::http::StatusCode::NO_CONTENT)
}

async fn update_stock<G: DataGateway>(
    State(console): State<Arc<Console<G>>>,
    Path(id): Path<String>,
    Json(payload): Json<StockRequest>,
) -> Result<axum::http::StatusCode, AppError> {
    console
        .catalog
        .set_stock(parse_id(&id)?, payload.quantity)
        .await?;
    Ok(axum::http::StatusCode::NO_CONTENT)
}

async fn low_stock<G: DataGateway>(
    State(console): State<Arc<Console<G>>>,
    Query(query): Query<LowStockQuery>,
) -> Result<Json<Vec<Product>>, AppError> {
    Ok(Json(console.catalog.low_stock(query.threshold).await?))
}

async fn list_profiles<G: DataGateway>(
    State(console): State<Arc<Console<G>>>,
    Query(query): Query<RoleQuery>,
) -> Result<Json<Vec<Profile>>, AppError> {
    let profiles = match query.role.as_deref() {
        Some("customer") => console.directory.customers().await?,
        Some("rider") => console.directory.riders().await?,
        Some(other) => {
            return Err(AppError::Validation(format!("unrecognized role {other:?}")))
        }
        None => {
            let mut all = console.directory.customers().await?;
            all.extend(console.directory.riders().await?);
            all
        }
    };
    Ok(Json(profiles))
}

async fn update_profile<G: DataGateway>(
    State(console): State<Arc<Console<G>>>,
    Path(id): Path<String>,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<Profile>, AppError> {
    Ok(Json(
        console.directory.update_profile(parse_id(&id)?, update).await?,
    ))
}

async fn create_rider<G: DataGateway>(
    State(console): State<Arc<Console<G>>>,
    Json(rider): Json<NewRider>,
) -> Result<(axum::http::StatusCode, Json<Profile>), AppError> {
    let profile = console.directory.add_rider(rider).await?;
    Ok((axum::http::StatusCode::CREATED, Json(profile)))
}

async fn rider_stats<G: DataGateway>(
    State(console): State<Arc<Console<G>>>,
    Path(id): Path<String>,
) -> Result<Json<RiderStats>, AppError> {
    Ok(Json(console.directory.rider_stats(parse_id(&id)?).await?))
}

async fn customer_activity<G: DataGateway>(
    State(console): State<Arc<Console<G>>>,
    Path(id): Path<String>,
) -> Result<Json<CustomerActivity>, AppError> {
    Ok(Json(
        console.reports.customer_activity(parse_id(&id)?).await?,
    ))
}

async fn sales_report<G: DataGateway>(
    State(console): State<Arc<Console<G>>>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<SalesReport>, AppError> {
    let range = match query.range.as_deref() {
        Some(raw) => raw
            .parse::<ReportRange>()
            .map_err(|e| AppError::Validation(e.to_string()))?,
        None => ReportRange::Month,
    };
    Ok(Json(console.reports.sales_report(range, Utc::now()).await?))
}

async fn dashboard_stats<G: DataGateway>(
    State(console): State<Arc<Console<G>>>,
) -> Result<Json<DashboardStats>, AppError> {
    Ok(Json(console.reports.dashboard(Utc::now()).await?))
}
