use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::foods::{FoodItem, Nutrients, Provenance, ScaledFoodItem};

/// Daily bucket a food log entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealSlot {
    Breakfast,
    Lunch,
    Dinner,
    #[serde(alias = "snack")]
    Snacks,
}

impl MealSlot {
    pub const ALL: [MealSlot; 4] = [
        MealSlot::Breakfast,
        MealSlot::Lunch,
        MealSlot::Dinner,
        MealSlot::Snacks,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            MealSlot::Breakfast => "breakfast",
            MealSlot::Lunch => "lunch",
            MealSlot::Dinner => "dinner",
            MealSlot::Snacks => "snacks",
        }
    }
}

impl fmt::Display for MealSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MealSlot {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "breakfast" => Ok(MealSlot::Breakfast),
            "lunch" => Ok(MealSlot::Lunch),
            "dinner" => Ok(MealSlot::Dinner),
            "snack" | "snacks" => Ok(MealSlot::Snacks),
            other => Err(format!("unknown meal slot: {other}")),
        }
    }
}

/// Server-assigned line item identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineItemId(pub String);

impl fmt::Display for LineItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LineItemId {
    fn from(s: &str) -> Self {
        LineItemId(s.to_string())
    }
}

/// A food committed to the session's meal slot for the active day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MealLineItem {
    pub id: LineItemId,
    pub name: String,
    pub display_name: Option<String>,
    pub quantity: f64,
    pub serving: String,
    pub calories: f64,
    pub protein: f64,
    pub carbohydrates: f64,
    pub fat: f64,
    pub source: Provenance,
}

impl MealLineItem {
    pub fn nutrients(&self) -> Nutrients {
        Nutrients {
            calories: self.calories,
            protein: self.protein,
            carbohydrates: self.carbohydrates,
            fat: self.fat,
        }
    }
}

/// Field-wise sum over the line items.
pub fn totals(items: &[MealLineItem]) -> Nutrients {
    items.iter().map(MealLineItem::nutrients).sum()
}

/// Nutrient snapshot sent with a commit, scaled or as fetched.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommittedFood {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub calories: f64,
    pub protein: f64,
    pub carbohydrates: f64,
    pub fat: f64,
    pub quantity: f64,
    pub serving: String,
    pub source: Provenance,
}

impl CommittedFood {
    pub fn as_fetched(food: &FoodItem, serving: String) -> Self {
        Self {
            name: food.name.clone(),
            display_name: None,
            calories: food.calories,
            protein: food.protein,
            carbohydrates: food.carbohydrates,
            fat: food.fat,
            quantity: 1.0,
            serving,
            source: food.provenance,
        }
    }

    pub fn scaled(food: &FoodItem, scaled: ScaledFoodItem, quantity: f64, serving: String) -> Self {
        Self {
            name: food.name.clone(),
            display_name: scaled.display_name,
            calories: scaled.calories,
            protein: scaled.protein,
            carbohydrates: scaled.carbohydrates,
            fat: scaled.fat,
            quantity,
            serving,
            source: food.provenance,
        }
    }

    pub fn nutrients(&self) -> Nutrients {
        Nutrients {
            calories: self.calories,
            protein: self.protein,
            carbohydrates: self.carbohydrates,
            fat: self.fat,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct CurrentMealRequest<'a> {
    pub user_id: &'a str,
    pub meal: MealSlot,
    pub date: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct CommitRequest<'a> {
    pub user_id: &'a str,
    pub meal: MealSlot,
    pub food: &'a CommittedFood,
}

#[derive(Debug, Serialize)]
pub(crate) struct RemoveRequest<'a> {
    pub user_id: &'a str,
    pub line_item_id: &'a LineItemId,
}
