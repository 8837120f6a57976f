use rusqlite::{params, Connection, OptionalExtension};

use super::now_timestamp;
use crate::db::DatabaseError;
use crate::models::{InventoryFields, InventoryItem};

const INVENTORY_COLUMNS: &str =
    "id, name, dosage, unit, quantity, price, created_at, updated_at";

pub fn insert_inventory_item(
    conn: &Connection,
    fields: &InventoryFields,
) -> Result<InventoryItem, DatabaseError> {
    conn.execute(
        "INSERT INTO inventory (name, dosage, unit, quantity, price, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            fields.name,
            fields.dosage,
            fields.unit,
            fields.quantity,
            fields.price,
            now_timestamp(),
        ],
    )?;
    let id = conn.last_insert_rowid();
    get_inventory_item(conn, id)?.ok_or_else(|| DatabaseError::not_found("inventory item", id))
}

pub fn get_inventory_item(
    conn: &Connection,
    id: i64,
) -> Result<Option<InventoryItem>, DatabaseError> {
    Ok(conn
        .query_row(
            &format!("SELECT {INVENTORY_COLUMNS} FROM inventory WHERE id = ?1"),
            params![id],
            inventory_from_row,
        )
        .optional()?)
}

/// All items, alphabetical.
pub fn list_inventory(conn: &Connection) -> Result<Vec<InventoryItem>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {INVENTORY_COLUMNS} FROM inventory ORDER BY name ASC, id ASC"
    ))?;
    let rows = stmt.query_map([], inventory_from_row)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

/// Quick stock edit: touches only `quantity` and `updated_at`.
/// Returns `false` when no row had that id.
pub fn update_inventory_quantity(
    conn: &Connection,
    id: i64,
    quantity: i64,
) -> Result<bool, DatabaseError> {
    let affected = conn.execute(
        "UPDATE inventory SET quantity = ?1, updated_at = ?2 WHERE id = ?3",
        params![quantity, now_timestamp(), id],
    )?;
    Ok(affected > 0)
}

/// Full edit of every writable column.
pub fn update_inventory_item(
    conn: &Connection,
    id: i64,
    fields: &InventoryFields,
) -> Result<bool, DatabaseError> {
    let affected = conn.execute(
        "UPDATE inventory
         SET name = ?1, dosage = ?2, unit = ?3, quantity = ?4, price = ?5, updated_at = ?6
         WHERE id = ?7",
        params![
            fields.name,
            fields.dosage,
            fields.unit,
            fields.quantity,
            fields.price,
            now_timestamp(),
            id,
        ],
    )?;
    Ok(affected > 0)
}

pub fn delete_inventory_item(conn: &Connection, id: i64) -> Result<bool, DatabaseError> {
    let affected = conn.execute("DELETE FROM inventory WHERE id = ?1", params![id])?;
    Ok(affected > 0)
}

pub fn count_inventory(conn: &Connection) -> Result<i64, DatabaseError> {
    Ok(conn.query_row("SELECT COUNT(*) FROM inventory", [], |row| row.get(0))?)
}

/// Stock value across all items: `SUM(quantity * price)`, 0 when empty.
pub fn total_inventory_value(conn: &Connection) -> Result<f64, DatabaseError> {
    Ok(conn.query_row(
        "SELECT COALESCE(SUM(quantity * price), 0.0) FROM inventory",
        [],
        |row| row.get(0),
    )?)
}

fn inventory_from_row(row: &rusqlite::Row<'_>) -> Result<InventoryItem, rusqlite::Error> {
    Ok(InventoryItem {
        id: row.get(0)?,
        name: row.get(1)?,
        dosage: row.get(2)?,
        unit: row.get(3)?,
        quantity: row.get(4)?,
        price: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}
