//! Request DTOs and the success envelope.
//!
//! Success bodies are `{"success": true, "data": ...}`; list endpoints add
//! `"pagination": {page, limit, total, total_pages}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;

use shopfloor_core::pagination::MAX_PAGE_LIMIT;
use shopfloor_core::{Page, PageRequest, ProductionOrderId};
use shopfloor_inventory::{InventoryItemId, TransactionType};
use shopfloor_production::{Priority, ProductionOrderStatus};
use shopfloor_products::{BomComponent, ProductId};

// -------------------------
// Envelope
// -------------------------

pub fn ok<T: Serialize>(data: T) -> Response {
    envelope(StatusCode::OK, data)
}

pub fn created<T: Serialize>(data: T) -> Response {
    envelope(StatusCode::CREATED, data)
}

fn envelope<T: Serialize>(status: StatusCode, data: T) -> Response {
    (status, axum::Json(json!({ "success": true, "data": data }))).into_response()
}

pub fn paginated<T: Serialize>(page: Page<T>) -> Response {
    let pagination = json!({
        "page": page.request.page(),
        "limit": page.request.limit(),
        "total": page.total,
        "total_pages": page.total_pages(),
    });
    (
        StatusCode::OK,
        axum::Json(json!({
            "success": true,
            "data": page.items,
            "pagination": pagination,
        })),
    )
        .into_response()
}

// -------------------------
// Query DTOs
// -------------------------

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl PageQuery {
    pub fn request(&self) -> PageRequest {
        PageRequest::new(self.page, self.limit, MAX_PAGE_LIMIT)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListOrdersQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub status: Option<ProductionOrderStatus>,
    pub priority: Option<Priority>,
    pub product_id: Option<ProductId>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListItemsQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub category: Option<String>,
    #[serde(default)]
    pub low_stock: bool,
    pub search: Option<String>,
}

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub display_name: String,
    pub password: String,
    pub roles: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub product_id: ProductId,
    pub quantity_planned: i64,
    pub start_date: Option<NaiveDate>,
    pub due_date: NaiveDate,
    pub priority: Option<Priority>,
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateOrderRequest {
    pub priority: Option<Priority>,
    pub start_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub quantity_produced: Option<i64>,
    pub status: Option<ProductionOrderStatus>,
}

#[derive(Debug, Deserialize)]
pub struct CreateItemRequest {
    pub sku: String,
    pub name: String,
    pub category: Option<String>,
    #[serde(default)]
    pub minimum_stock: i64,
    #[serde(default)]
    pub unit_cost: u64,
    #[serde(default)]
    pub opening_stock: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateItemRequest {
    pub name: Option<String>,
    pub category: Option<String>,
    pub minimum_stock: Option<i64>,
    pub unit_cost: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct TransactionRequest {
    pub item_id: InventoryItemId,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub quantity: i64,
    pub production_order_id: Option<ProductionOrderId>,
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub sku: String,
    pub name: String,
    #[serde(default)]
    pub components: Vec<BomComponent>,
    pub finished_item_id: Option<InventoryItemId>,
}
