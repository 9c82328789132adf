//! HTTP surface
//!
//! Thin axum handlers over the services. Every handler builds its service
//! from [`AppState`], runs one call and maps [`CommerceError`] to a status.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::domain::aggregates::{
    ContractStatus, InvoiceFilter, InvoiceStatus, NewCartItem, OrderFilter, OrderStatus, PaymentMethod, ProductFilter,
    Selection, REGIONS,
};
use crate::services::billing::CreateContractRequest;
use crate::services::orders::{CartAdjustment, CheckoutRequest};
use crate::services::storefronts::CreateStorefrontRequest;
use crate::services::subscriptions::CreateSubscriptionRequest;
use crate::services::{
    BillingService, CatalogService, EventBus, OrderService, Store, StorefrontService, SubscriptionService,
};
use crate::{CommerceError, Result};

#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub events: EventBus,
    pub base_domain: String,
}

impl AppState {
    fn catalog(&self) -> CatalogService { CatalogService::new(self.store.clone(), self.events.clone()) }
    fn storefronts(&self) -> StorefrontService {
        StorefrontService::new(self.store.clone(), self.events.clone(), self.base_domain.clone())
    }
    fn subscriptions(&self) -> SubscriptionService { SubscriptionService::new(self.store.clone(), self.events.clone()) }
    fn billing(&self) -> BillingService { BillingService::new(self.store.clone()) }
    fn orders(&self) -> OrderService { OrderService::new(self.store.clone(), self.events.clone()) }
}

impl IntoResponse for CommerceError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Validation(_) | Self::Import(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidTransition(_) => StatusCode::CONFLICT,
            Self::Backend(_) => StatusCode::BAD_GATEWAY,
        };
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "toprest-commerce"})) }))
        .route("/api/v1/regions", get(list_regions))
        .route("/api/v1/payment-methods", get(list_payment_methods))
        .route("/api/v1/cart/quote", post(quote_cart))
        .route("/api/v1/cart/adjust", post(adjust_cart))
        .route("/api/v1/checkout", post(checkout))
        .route("/api/v1/products", get(list_products))
        .route("/api/v1/products/import", post(import_products))
        .route("/api/v1/products/:id", delete(delete_product))
        .route("/api/v1/products/:id/active", put(set_product_active))
        .route("/api/v1/storefront/products", get(storefront_products))
        .route("/api/v1/categories", get(list_categories))
        .route("/api/v1/suppliers", get(list_suppliers))
        .route("/api/v1/storefronts", get(list_storefronts).post(create_storefront))
        .route("/api/v1/storefronts/stats", get(storefront_stats))
        .route("/api/v1/storefronts/:id", delete(delete_storefront))
        .route("/api/v1/storefronts/:id/activate", post(activate_storefront))
        .route("/api/v1/storefronts/:id/suspend", post(suspend_storefront))
        .route("/api/v1/plans", get(list_plans))
        .route("/api/v1/subscriptions", get(list_subscriptions).post(create_subscription))
        .route("/api/v1/permissions", get(list_permissions))
        .route("/api/v1/invoices", get(list_invoices))
        .route("/api/v1/invoices/summary", get(invoice_summary))
        .route("/api/v1/invoices/:id/status", put(set_invoice_status))
        .route("/api/v1/contracts", get(list_contracts).post(create_contract))
        .route("/api/v1/contracts/counts", get(contract_counts))
        .route("/api/v1/contracts/:id/status", put(set_contract_status))
        .route("/api/v1/orders", get(list_orders))
        .route("/api/v1/orders/:id/status", put(set_order_status))
        .with_state(state)
}

/// Status values in request bodies must name a known status exactly.
fn strict_status<T>(raw: &str, name: fn(&T) -> &'static str) -> Result<T>
where
    T: From<Option<String>>,
{
    let raw = raw.trim();
    let status = T::from(Some(raw.to_string()));
    if name(&status) == raw {
        Ok(status)
    } else {
        Err(CommerceError::validation(format!("unknown status: {raw}")))
    }
}

#[derive(Debug, Deserialize)]
pub struct StatusBody { pub status: String }

async fn list_regions() -> impl IntoResponse { Json(REGIONS) }

#[derive(Serialize)]
struct PaymentMethodView { id: PaymentMethod, label_ar: &'static str, bnpl: bool }

async fn list_payment_methods() -> impl IntoResponse {
    let methods: Vec<_> = PaymentMethod::ALL
        .iter()
        .map(|m| PaymentMethodView { id: *m, label_ar: m.label_ar(), bnpl: m.is_bnpl() })
        .collect();
    Json(methods)
}

async fn quote_cart(Json(items): Json<Vec<NewCartItem>>) -> Result<impl IntoResponse> {
    Ok(Json(OrderService::quote(items)?))
}

async fn adjust_cart(Json(req): Json<CartAdjustment>) -> Result<impl IntoResponse> {
    Ok(Json(OrderService::adjust(req)?))
}

async fn checkout(State(s): State<AppState>, Json(r): Json<CheckoutRequest>) -> Result<impl IntoResponse> {
    Ok((StatusCode::CREATED, Json(s.orders().checkout(r).await?)))
}

#[derive(Debug, Default, Deserialize)]
pub struct ProductParams { pub search: Option<String>, pub category: Option<String>, pub supplier: Option<String> }

impl ProductParams {
    fn filter(&self) -> Result<ProductFilter> {
        Ok(ProductFilter {
            search_term: self.search.clone().unwrap_or_default(),
            category: Selection::parse(self.category.as_deref()).map_err(|_| invalid_id("category"))?,
            supplier: Selection::parse(self.supplier.as_deref()).map_err(|_| invalid_id("supplier"))?,
        })
    }
}

fn invalid_id(field: &str) -> CommerceError { CommerceError::validation(format!("{field} is not a valid id")) }

async fn list_products(State(s): State<AppState>, Query(p): Query<ProductParams>) -> Result<impl IntoResponse> {
    Ok(Json(s.catalog().list(&p.filter()?).await?))
}

async fn storefront_products(State(s): State<AppState>, Query(p): Query<ProductParams>) -> Result<impl IntoResponse> {
    Ok(Json(s.catalog().storefront_view(&p.filter()?).await?))
}

#[derive(Debug, Deserialize)]
pub struct ImportParams { pub supplier: Option<String> }

async fn import_products(
    State(s): State<AppState>,
    Query(p): Query<ImportParams>,
    body: String,
) -> Result<impl IntoResponse> {
    Ok(Json(s.catalog().import_csv(&body, p.supplier.as_deref()).await?))
}

#[derive(Debug, Deserialize)]
pub struct ActiveBody { pub active: bool }

async fn set_product_active(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
    Json(b): Json<ActiveBody>,
) -> Result<impl IntoResponse> {
    s.catalog().set_active(id, b.active).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_product(State(s): State<AppState>, Path(id): Path<Uuid>) -> Result<impl IntoResponse> {
    s.catalog().delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_categories(State(s): State<AppState>) -> Result<impl IntoResponse> {
    Ok(Json(s.catalog().categories().await?))
}

async fn list_suppliers(State(s): State<AppState>) -> Result<impl IntoResponse> {
    Ok(Json(s.catalog().suppliers().await?))
}

async fn list_storefronts(State(s): State<AppState>) -> Result<impl IntoResponse> {
    Ok(Json(s.storefronts().list().await?))
}

async fn storefront_stats(State(s): State<AppState>) -> Result<impl IntoResponse> {
    Ok(Json(s.storefronts().stats().await?))
}

async fn create_storefront(State(s): State<AppState>, Json(r): Json<CreateStorefrontRequest>) -> Result<impl IntoResponse> {
    Ok((StatusCode::CREATED, Json(s.storefronts().create(r).await?)))
}

async fn activate_storefront(State(s): State<AppState>, Path(id): Path<Uuid>) -> Result<impl IntoResponse> {
    let status = s.storefronts().activate(id).await?;
    Ok(Json(serde_json::json!({ "id": id, "status": status })))
}

async fn suspend_storefront(State(s): State<AppState>, Path(id): Path<Uuid>) -> Result<impl IntoResponse> {
    let status = s.storefronts().suspend(id).await?;
    Ok(Json(serde_json::json!({ "id": id, "status": status })))
}

async fn delete_storefront(State(s): State<AppState>, Path(id): Path<Uuid>) -> Result<impl IntoResponse> {
    s.storefronts().delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_plans(State(s): State<AppState>) -> Result<impl IntoResponse> {
    Ok(Json(s.subscriptions().plans().await?))
}

async fn list_subscriptions(State(s): State<AppState>) -> Result<impl IntoResponse> {
    Ok(Json(s.subscriptions().list().await?))
}

async fn create_subscription(
    State(s): State<AppState>,
    Json(r): Json<CreateSubscriptionRequest>,
) -> Result<impl IntoResponse> {
    Ok((StatusCode::CREATED, Json(s.subscriptions().create(r).await?)))
}

async fn list_permissions(State(s): State<AppState>) -> Result<impl IntoResponse> {
    Ok(Json(s.subscriptions().permissions().await?))
}

#[derive(Debug, Deserialize)]
pub struct InvoiceParams { pub status: Option<String> }

async fn list_invoices(State(s): State<AppState>, Query(p): Query<InvoiceParams>) -> Result<impl IntoResponse> {
    let filter = match p.status.as_deref().map(str::trim) {
        None | Some("") | Some("all") => InvoiceFilter::All,
        Some(raw) => InvoiceFilter::Status(strict_status(raw, InvoiceStatus::as_str)?),
    };
    Ok(Json(s.billing().invoices(filter).await?))
}

async fn invoice_summary(State(s): State<AppState>) -> Result<impl IntoResponse> {
    Ok(Json(s.billing().invoice_summary().await?))
}

async fn set_invoice_status(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
    Json(b): Json<StatusBody>,
) -> Result<impl IntoResponse> {
    s.billing().set_invoice_status(id, strict_status(&b.status, InvoiceStatus::as_str)?).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_contracts(State(s): State<AppState>) -> Result<impl IntoResponse> {
    Ok(Json(s.billing().contracts().await?))
}

async fn contract_counts(State(s): State<AppState>) -> Result<impl IntoResponse> {
    Ok(Json(s.billing().contract_counts().await?))
}

async fn create_contract(State(s): State<AppState>, Json(r): Json<CreateContractRequest>) -> Result<impl IntoResponse> {
    Ok((StatusCode::CREATED, Json(s.billing().create_contract(r).await?)))
}

async fn set_contract_status(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
    Json(b): Json<StatusBody>,
) -> Result<impl IntoResponse> {
    s.billing().set_contract_status(id, strict_status(&b.status, ContractStatus::as_str)?).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct OrderParams { pub search: Option<String>, pub status: Option<String> }

async fn list_orders(State(s): State<AppState>, Query(p): Query<OrderParams>) -> Result<impl IntoResponse> {
    let status = match p.status.as_deref().map(str::trim) {
        None | Some("") | Some("all") => None,
        Some(raw) => Some(strict_status(raw, OrderStatus::as_str)?),
    };
    let filter = OrderFilter { search_term: p.search.unwrap_or_default(), status };
    Ok(Json(s.orders().list(&filter).await?))
}

async fn set_order_status(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
    Json(b): Json<StatusBody>,
) -> Result<impl IntoResponse> {
    let status = s.orders().set_status(id, strict_status(&b.status, OrderStatus::as_str)?).await?;
    Ok(Json(serde_json::json!({ "id": id, "status": status })))
}
