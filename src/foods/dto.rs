use std::iter::Sum;
use std::ops::Add;

use serde::{Deserialize, Serialize};

use crate::error::ClientError;

/// Where a food came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    #[default]
    #[serde(alias = "usda")]
    Catalog,
    Custom,
    #[serde(alias = "user-custom")]
    UserCustom,
}

/// Calories plus the three macros, all non-negative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Nutrients {
    pub calories: f64,
    pub protein: f64,
    pub carbohydrates: f64,
    pub fat: f64,
}

impl Add for Nutrients {
    type Output = Nutrients;

    fn add(self, rhs: Nutrients) -> Nutrients {
        Nutrients {
            calories: self.calories + rhs.calories,
            protein: self.protein + rhs.protein,
            carbohydrates: self.carbohydrates + rhs.carbohydrates,
            fat: self.fat + rhs.fat,
        }
    }
}

impl Sum for Nutrients {
    fn sum<I: Iterator<Item = Nutrients>>(iter: I) -> Nutrients {
        iter.fold(Nutrients::default(), Add::add)
    }
}

fn default_serving() -> String {
    "serving".into()
}

/// A food as returned by search, autocomplete or suggestions. Never mutated,
/// only replaced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodItem {
    pub name: String,
    #[serde(default)]
    pub calories: f64,
    #[serde(default)]
    pub protein: f64,
    #[serde(default)]
    pub carbohydrates: f64,
    #[serde(default)]
    pub fat: f64,
    #[serde(default = "default_serving")]
    pub serving: String,
    #[serde(default)]
    pub available_servings: Vec<String>,
    #[serde(default, rename = "source")]
    pub provenance: Provenance,
}

impl FoodItem {
    pub fn nutrients(&self) -> Nutrients {
        Nutrients {
            calories: self.calories,
            protein: self.protein,
            carbohydrates: self.carbohydrates,
            fat: self.fat,
        }
    }

    /// Native serving or one of the listed alternatives.
    pub fn offers_serving(&self, serving: &str) -> bool {
        self.serving == serving || self.available_servings.iter().any(|s| s == serving)
    }
}

/// A food re-derived by the nutrition service for a quantity and serving.
///
/// Only the nutrients are relied on. The service may answer with a plain
/// food, so the echoed quantity and serving are optional.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScaledFoodItem {
    pub name: String,
    #[serde(default)]
    pub calories: f64,
    #[serde(default)]
    pub protein: f64,
    #[serde(default)]
    pub carbohydrates: f64,
    #[serde(default)]
    pub fat: f64,
    #[serde(default)]
    pub quantity: Option<f64>,
    #[serde(default)]
    pub serving_used: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl ScaledFoodItem {
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
pub(crate) struct QueryRequest<'a> {
    pub user_id: &'a str,
    pub query: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct ScaleRequest<'a> {
    pub food: &'a FoodItem,
    pub quantity: f64,
    pub serving: &'a str,
}

/// User-entered custom food, before validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomFoodDraft {
    pub name: String,
    pub serving: String,
    pub calories: Option<f64>,
    pub protein: Option<f64>,
    pub carbohydrates: Option<f64>,
    pub fat: Option<f64>,
}

/// A custom food that passed validation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomFood {
    pub name: String,
    pub serving: String,
    pub calories: f64,
    pub protein: f64,
    pub carbohydrates: f64,
    pub fat: f64,
    pub source: Provenance,
}

impl CustomFoodDraft {
    pub fn validate(&self) -> Result<CustomFood, ClientError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ClientError::validation("food name is required"));
        }
        let serving = self.serving.trim();
        if serving.is_empty() {
            return Err(ClientError::validation("serving size is required"));
        }
        let calories = self
            .calories
            .ok_or_else(|| ClientError::validation("calories are required"))?;
        Ok(CustomFood {
            name: name.to_string(),
            serving: serving.to_string(),
            calories: non_negative("calories", calories)?,
            protein: non_negative("protein", self.protein.unwrap_or(0.0))?,
            carbohydrates: non_negative("carbohydrates", self.carbohydrates.unwrap_or(0.0))?,
            fat: non_negative("fat", self.fat.unwrap_or(0.0))?,
            source: Provenance::UserCustom,
        })
    }
}

fn non_negative(field: &str, value: f64) -> Result<f64, ClientError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(ClientError::validation(format!(
            "{field} must be a non-negative number"
        )))
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct CustomFoodRequest<'a> {
    pub user_id: &'a str,
    pub food: &'a CustomFood,
}
