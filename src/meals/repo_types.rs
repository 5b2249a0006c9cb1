use serde::Deserialize;

use crate::foods::Provenance;
use crate::meals::dto::{LineItemId, MealLineItem};

/// Line item ids arrive as strings or integers depending on the backend.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RawLineItemId {
    Text(String),
    Number(i64),
}

#[derive(Debug, Deserialize)]
pub struct MealLineItemRow {
    pub id: RawLineItemId,
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub quantity: Option<f64>,
    #[serde(default)]
    pub serving: Option<String>,
    #[serde(default)]
    pub calories: Option<f64>,
    #[serde(default)]
    pub protein: Option<f64>,
    #[serde(default)]
    pub carbohydrates: Option<f64>,
    #[serde(default)]
    pub fat: Option<f64>,
    #[serde(default)]
    pub source: Provenance,
}

impl From<MealLineItemRow> for MealLineItem {
    fn from(r: MealLineItemRow) -> Self {
        Self {
            id: match r.id {
                RawLineItemId::Text(s) => LineItemId(s),
                RawLineItemId::Number(n) => LineItemId(n.to_string()),
            },
            name: r.name,
            display_name: r.display_name,
            quantity: r.quantity.unwrap_or(1.0),
            serving: r.serving.unwrap_or_else(|| "serving".into()),
            calories: r.calories.unwrap_or(0.0),
            protein: r.protein.unwrap_or(0.0),
            carbohydrates: r.carbohydrates.unwrap_or(0.0),
            fat: r.fat.unwrap_or(0.0),
            source: r.source,
        }
    }
}
