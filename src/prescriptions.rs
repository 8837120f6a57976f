//! Prescription ↔ inventory reconciliation.
//!
//! A prescription dispenses stock. Creating a record consumes every
//! prescribed quantity; editing one consumes or returns only the net
//! difference between the stored and the new prescription, per item.
//!
//! Reconciliation is planned first and applied second: every item is
//! checked before any quantity is written, so a shortage anywhere in the
//! list leaves all stock untouched. Callers run plan + apply + the record
//! write inside one transaction.

use std::collections::HashMap;
use std::fmt;

use rusqlite::Connection;
use serde::Serialize;

use crate::db::{self, DatabaseError};
use crate::models::PrescribedMedicine;

// ═══════════════════════════════════════════════════════════
// Stock access
// ═══════════════════════════════════════════════════════════

/// Current stock for one inventory item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockLevel {
    pub id: i64,
    pub name: String,
    pub quantity: i64,
}

/// Read/write access to stock levels.
pub trait StockLedger {
    fn stock_level(&self, item_id: i64) -> Result<Option<StockLevel>, DatabaseError>;
    fn set_stock(&self, item_id: i64, quantity: i64) -> Result<(), DatabaseError>;
}

impl StockLedger for Connection {
    fn stock_level(&self, item_id: i64) -> Result<Option<StockLevel>, DatabaseError> {
        Ok(db::get_inventory_item(self, item_id)?.map(|item| StockLevel {
            id: item.id,
            name: item.name,
            quantity: item.quantity,
        }))
    }

    fn set_stock(&self, item_id: i64, quantity: i64) -> Result<(), DatabaseError> {
        if db::update_inventory_quantity(self, item_id, quantity)? {
            Ok(())
        } else {
            Err(DatabaseError::not_found("inventory item", item_id))
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Types
// ═══════════════════════════════════════════════════════════

/// Net stock movement for one item. Negative consumes, positive returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockDelta {
    pub item_id: i64,
    pub delta: i64,
}

/// One planned (and, after `apply`, committed) stock change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryUpdate {
    pub id: i64,
    pub name: String,
    pub previous_quantity: i64,
    pub new_quantity: i64,
    pub change: i64,
}

/// Detail for an insufficient-stock rejection.
///
/// Exactly one of `required` (new prescription) or `additional_needed`
/// (edited prescription) is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockShortage {
    pub item_id: i64,
    pub item_name: String,
    pub available: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_needed: Option<i64>,
    pub shortage: i64,
}

impl fmt::Display for StockShortage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Insufficient stock for {}. Currently available: {}",
            self.item_name, self.available
        )?;
        if let Some(required) = self.required {
            write!(f, ", Required: {required}")?;
        }
        if let Some(additional) = self.additional_needed {
            write!(f, ", Additional needed: {additional}")?;
        }
        write!(f, ", Short by: {}", self.shortage)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("Invalid quantity {quantity} for medicine {item_id}: must be at least 1")]
    InvalidQuantity { item_id: i64, quantity: i64 },

    #[error("Medicine not found in inventory: {0}")]
    ItemNotFound(i64),

    #[error("{0}")]
    InsufficientStock(StockShortage),

    #[error("Quantity for medicine {item_id} is out of range")]
    QuantityOverflow { item_id: i64 },

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

#[derive(Debug, Clone, Copy)]
enum Demand {
    Required,
    Additional,
}

// ═══════════════════════════════════════════════════════════
// Planning
// ═══════════════════════════════════════════════════════════

/// Per-item `old − new`, merged by inventory id.
///
/// Items keep the order of first appearance (stored prescription first,
/// then items only in the new one). Items whose quantities cancel out
/// are dropped. A sum that leaves the `i64` range is rejected.
pub fn net_deltas(
    old: &[PrescribedMedicine],
    new: &[PrescribedMedicine],
) -> Result<Vec<StockDelta>, ReconcileError> {
    let mut order: Vec<i64> = Vec::new();
    let mut totals: HashMap<i64, i64> = HashMap::new();

    let signed = old
        .iter()
        .map(|m| (m.id, Some(m.quantity)))
        .chain(new.iter().map(|m| (m.id, m.quantity.checked_neg())));
    for (id, qty) in signed {
        let total = totals.entry(id).or_insert_with(|| {
            order.push(id);
            0
        });
        let current = *total;
        *total = qty
            .and_then(|q| current.checked_add(q))
            .ok_or(ReconcileError::QuantityOverflow { item_id: id })?;
    }

    Ok(order
        .into_iter()
        .filter_map(|id| {
            let delta = totals.get(&id).copied().unwrap_or(0);
            (delta != 0).then_some(StockDelta { item_id: id, delta })
        })
        .collect())
}

fn validate_quantities(items: &[PrescribedMedicine]) -> Result<(), ReconcileError> {
    match items.iter().find(|m| m.quantity <= 0) {
        Some(bad) => Err(ReconcileError::InvalidQuantity {
            item_id: bad.id,
            quantity: bad.quantity,
        }),
        None => Ok(()),
    }
}

/// Plan the stock changes for a brand-new prescription.
pub fn plan_create<L: StockLedger + ?Sized>(
    ledger: &L,
    prescribed: &[PrescribedMedicine],
) -> Result<Vec<InventoryUpdate>, ReconcileError> {
    validate_quantities(prescribed)?;
    plan(ledger, &net_deltas(&[], prescribed)?, Demand::Required)
}

/// Plan the stock changes for replacing `old` with `new`.
///
/// The stored prescription is trusted as-is; only the new one is
/// validated.
pub fn plan_update<L: StockLedger + ?Sized>(
    ledger: &L,
    old: &[PrescribedMedicine],
    new: &[PrescribedMedicine],
) -> Result<Vec<InventoryUpdate>, ReconcileError> {
    validate_quantities(new)?;
    plan(ledger, &net_deltas(old, new)?, Demand::Additional)
}

fn plan<L: StockLedger + ?Sized>(
    ledger: &L,
    deltas: &[StockDelta],
    demand: Demand,
) -> Result<Vec<InventoryUpdate>, ReconcileError> {
    let mut updates = Vec::with_capacity(deltas.len());

    for d in deltas {
        let Some(level) = ledger.stock_level(d.item_id)? else {
            if d.delta > 0 {
                // Returning stock to an item that was deleted since.
                tracing::warn!(item_id = d.item_id, units = d.delta, "Cannot credit deleted inventory item");
                continue;
            }
            return Err(ReconcileError::ItemNotFound(d.item_id));
        };

        let overflow = || ReconcileError::QuantityOverflow { item_id: d.item_id };
        let new_quantity = level.quantity.checked_add(d.delta).ok_or_else(overflow)?;
        if new_quantity < 0 {
            let needed = d.delta.checked_neg().ok_or_else(overflow)?;
            let short_by = new_quantity.checked_neg().ok_or_else(overflow)?;
            let (required, additional_needed) = match demand {
                Demand::Required => (Some(needed), None),
                Demand::Additional => (None, Some(needed)),
            };
            return Err(ReconcileError::InsufficientStock(StockShortage {
                item_id: level.id,
                item_name: level.name,
                available: level.quantity,
                required,
                additional_needed,
                shortage: short_by,
            }));
        }

        updates.push(InventoryUpdate {
            id: level.id,
            name: level.name,
            previous_quantity: level.quantity,
            new_quantity,
            change: d.delta,
        });
    }

    Ok(updates)
}

/// Write planned quantities.
pub fn apply<L: StockLedger + ?Sized>(
    ledger: &L,
    updates: &[InventoryUpdate],
) -> Result<(), DatabaseError> {
    for update in updates {
        ledger.set_stock(update.id, update.new_quantity)?;
        tracing::info!(
            item_id = update.id,
            previous = update.previous_quantity,
            new = update.new_quantity,
            "Inventory reconciled"
        );
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════
