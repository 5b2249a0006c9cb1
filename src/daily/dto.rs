use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::meals::dto::MealSlot;

#[derive(Debug, Serialize)]
pub(crate) struct UserRequest<'a> {
    pub user_id: &'a str,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct DailyTotalReply {
    #[serde(default)]
    pub total_eaten: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MacroTotals {
    #[serde(default)]
    pub protein: f64,
    #[serde(default)]
    pub carbohydrates: f64,
    #[serde(default)]
    pub fat: f64,
}

/// Per-slot calorie budget and what has been eaten against it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MealProgress {
    pub calories_eaten: f64,
    pub calories_allocated: f64,
    pub calories_remaining: f64,
    pub protein_eaten: f64,
    pub carbohydrates_eaten: f64,
    pub fat_eaten: f64,
    pub progress_percentage: f64,
}

impl MealProgress {
    pub fn is_over_budget(&self) -> bool {
        self.calories_remaining <= 0.0
    }
}

/// Meal progress keyed by raw slot name. Slots this client does not know
/// are dropped.
#[derive(Debug, Default, Deserialize)]
#[serde(transparent)]
pub(crate) struct MealProgressReply(pub BTreeMap<String, MealProgress>);

impl MealProgressReply {
    pub fn into_slots(self) -> BTreeMap<MealSlot, MealProgress> {
        self.0
            .into_iter()
            .filter_map(|(key, progress)| match key.parse::<MealSlot>() {
                Ok(slot) => Some((slot, progress)),
                Err(_) => {
                    debug!(slot = %key, "ignoring progress for unknown meal slot");
                    None
                }
            })
            .collect()
    }
}

/// Read-only summary of the whole day across every meal slot.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DailySummary {
    pub total_calories: f64,
    #[serde(flatten)]
    pub macros: MacroTotals,
    pub meals: BTreeMap<MealSlot, MealProgress>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn progress_map_skips_unknown_slots() {
        let reply: MealProgressReply = serde_json::from_value(json!({
            "breakfast": { "calories_eaten": 320.0, "calories_allocated": 500.0, "calories_remaining": 180.0 },
            "snack": { "calories_eaten": 250.0, "calories_allocated": 200.0, "calories_remaining": -50.0 },
            "brunch": { "calories_eaten": 1.0 }
        }))
        .expect("progress");
        let slots = reply.into_slots();

        assert_eq!(slots.len(), 2);
        assert!(!slots[&MealSlot::Breakfast].is_over_budget());
        assert!(slots[&MealSlot::Snacks].is_over_budget());
        assert_eq!(slots[&MealSlot::Breakfast].progress_percentage, 0.0);
    }

    #[test]
    fn exactly_spent_budget_counts_as_over() {
        let progress = MealProgress {
            calories_allocated: 600.0,
            calories_eaten: 600.0,
            ..MealProgress::default()
        };
        assert!(progress.is_over_budget());
    }
}
