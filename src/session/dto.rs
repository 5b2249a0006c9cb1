use serde::Serialize;
use uuid::Uuid;

use crate::daily::DailySummary;
use crate::foods::{FoodItem, Nutrients};
use crate::meals::{parse_quantity, MealLineItem, MealSlot};
use crate::typeahead::TypeaheadView;

/// The food picked for adding, with the user's still-unparsed quantity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Selection {
    pub food: FoodItem,
    pub quantity_text: String,
    pub serving: String,
    pub from_suggestion: bool,
}

impl Selection {
    pub fn new(food: FoodItem, from_suggestion: bool) -> Self {
        let serving = food.serving.clone();
        Self {
            food,
            quantity_text: "1".into(),
            serving,
            from_suggestion,
        }
    }

    pub fn quantity(&self) -> f64 {
        parse_quantity(&self.quantity_text)
    }

    /// Switch serving if the food offers it. Returns whether it was applied.
    pub fn choose_serving(&mut self, serving: &str) -> bool {
        let serving = serving.trim();
        if self.food.offers_serving(serving) {
            self.serving = serving.to_string();
            true
        } else {
            false
        }
    }
}

/// One flag per panel so partial content can render.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PanelLoading {
    pub meal_items: bool,
    pub suggestions: bool,
    pub search: bool,
    pub daily_summary: bool,
    pub adding_food: bool,
    pub removing_food: bool,
}

/// Snapshot handed to the presentation layer.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub session_id: Uuid,
    pub meal: MealSlot,
    pub active_day: String,
    pub meal_items: Vec<MealLineItem>,
    pub totals: Nutrients,
    pub suggestions: Vec<FoodItem>,
    pub pending_feedback: Vec<String>,
    pub search_results: Vec<FoodItem>,
    pub autocomplete: TypeaheadView,
    pub selection: Option<Selection>,
    pub daily: Option<DailySummary>,
    pub loading: PanelLoading,
}
