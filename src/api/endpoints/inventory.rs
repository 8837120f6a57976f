//! Medicine inventory endpoints.
//!
//! - `GET /api/inventory`: all items by name
//! - `POST /api/inventory`
//! - `GET /api/inventory/:id`
//! - `PUT /api/inventory/:id`: quantity-only body is a stock edit,
//!   anything more replaces the item
//! - `DELETE /api/inventory/:id`

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Deserialize;

use super::{non_blank, MessageResponse};
use crate::api::error::ApiError;
use crate::api::types::{ApiContext, UserContext};
use crate::authorization::Capability;
use crate::db;
use crate::models::{InventoryFields, InventoryItem, DEFAULT_UNIT};

#[derive(Debug, Default, Deserialize)]
pub struct InventoryRequest {
    pub name: Option<String>,
    pub dosage: Option<String>,
    pub unit: Option<String>,
    pub quantity: Option<i64>,
    pub price: Option<f64>,
}

impl InventoryRequest {
    fn is_quantity_only(&self) -> bool {
        self.quantity.is_some()
            && self.name.is_none()
            && self.dosage.is_none()
            && self.unit.is_none()
            && self.price.is_none()
    }

    fn into_fields(self) -> Result<InventoryFields, ApiError> {
        let (Some(name), Some(quantity), Some(price)) = (non_blank(self.name), self.quantity, self.price)
        else {
            return Err(ApiError::BadRequest(
                "Name, quantity, and price are required".into(),
            ));
        };
        if quantity < 0 || price < 0.0 || !price.is_finite() {
            return Err(ApiError::BadRequest(
                "Quantity and price must be non-negative".into(),
            ));
        }
        Ok(InventoryFields {
            name,
            dosage: non_blank(self.dosage),
            unit: Some(non_blank(self.unit).unwrap_or_else(|| DEFAULT_UNIT.to_string())),
            quantity,
            price,
        })
    }
}

fn item_not_found() -> ApiError {
    ApiError::NotFound("Item not found".into())
}

/// `GET /api/inventory`
pub async fn list(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<UserContext>,
) -> Result<Json<Vec<InventoryItem>>, ApiError> {
    caller.require(Capability::ListInventory)?;
    let conn = ctx.core.open_db()?;
    Ok(Json(db::list_inventory(&conn)?))
}

/// `GET /api/inventory/:id`
pub async fn detail(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<UserContext>,
    Path(id): Path<i64>,
) -> Result<Json<InventoryItem>, ApiError> {
    caller.require(Capability::ListInventory)?;
    let conn = ctx.core.open_db()?;
    db::get_inventory_item(&conn, id)?
        .map(Json)
        .ok_or_else(item_not_found)
}

/// `POST /api/inventory`
pub async fn create(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<UserContext>,
    Json(request): Json<InventoryRequest>,
) -> Result<(StatusCode, Json<InventoryItem>), ApiError> {
    caller.require(Capability::ManageInventory)?;
    let fields = request.into_fields()?;

    let conn = ctx.core.open_db()?;
    let item = db::insert_inventory_item(&conn, &fields)?;

    tracing::info!(id = item.id, name = %item.name, quantity = item.quantity, "Inventory item added");
    Ok((StatusCode::CREATED, Json(item)))
}

/// `PUT /api/inventory/:id`
pub async fn update(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<UserContext>,
    Path(id): Path<i64>,
    Json(request): Json<InventoryRequest>,
) -> Result<Json<InventoryItem>, ApiError> {
    caller.require(Capability::ManageInventory)?;
    let conn = ctx.core.open_db()?;

    let updated = if request.is_quantity_only() {
        let quantity = request.quantity.filter(|q| *q >= 0).ok_or_else(|| {
            ApiError::BadRequest("Valid quantity is required".into())
        })?;
        db::update_inventory_quantity(&conn, id, quantity)?
    } else {
        let fields = request.into_fields()?;
        db::update_inventory_item(&conn, id, &fields)?
    };
    if !updated {
        return Err(item_not_found());
    }

    let item = db::get_inventory_item(&conn, id)?.ok_or_else(item_not_found)?;
    tracing::info!(id, quantity = item.quantity, "Inventory item updated");
    Ok(Json(item))
}

/// `DELETE /api/inventory/:id`
///
/// Prescriptions that reference the item keep their snapshot; later
/// edits skip crediting it back.
pub async fn delete(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<UserContext>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    caller.require(Capability::ManageInventory)?;
    let conn = ctx.core.open_db()?;
    if !db::delete_inventory_item(&conn, id)? {
        return Err(item_not_found());
    }

    tracing::info!(id, "Inventory item deleted");
    Ok(Json(MessageResponse {
        message: "Item deleted successfully",
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantity_only_body_is_detected() {
        let req = InventoryRequest {
            quantity: Some(5),
            ..Default::default()
        };
        assert!(req.is_quantity_only());

        let req = InventoryRequest {
            quantity: Some(5),
            price: Some(1.0),
            ..Default::default()
        };
        assert!(!req.is_quantity_only());
    }

    #[test]
    fn fields_default_unit_to_mg() {
        let fields = InventoryRequest {
            name: Some("Paracetamol".into()),
            quantity: Some(10),
            price: Some(2.5),
            ..Default::default()
        }
        .into_fields()
        .unwrap();
        assert_eq!(fields.unit.as_deref(), Some(DEFAULT_UNIT));
    }

    #[test]
    fn negative_values_are_rejected() {
        let err = InventoryRequest {
            name: Some("X".into()),
            quantity: Some(-1),
            price: Some(1.0),
            ..Default::default()
        }
        .into_fields()
        .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[test]
    fn missing_price_is_rejected() {
        let err = InventoryRequest {
            name: Some("X".into()),
            quantity: Some(1),
            ..Default::default()
        }
        .into_fields()
        .unwrap_err();
        assert_eq!(err.to_string(), "Invalid request: Name, quantity, and price are required");
    }
}
