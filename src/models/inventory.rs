use serde::{Deserialize, Serialize};

pub const DEFAULT_UNIT: &str = "mg";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    pub id: i64,
    pub name: String,
    pub dosage: Option<String>,
    pub unit: Option<String>,
    pub quantity: i64,
    pub price: f64,
    pub created_at: String,
    pub updated_at: Option<String>,
}

/// Writable inventory fields, shared by create and full update.
#[derive(Debug, Clone)]
pub struct InventoryFields {
    pub name: String,
    pub dosage: Option<String>,
    pub unit: Option<String>,
    pub quantity: i64,
    pub price: f64,
}
