use serde::Serialize;

use crate::meals::dto::MealSlot;

#[derive(Debug, Serialize)]
pub(crate) struct SuggestionsRequest<'a> {
    pub user_id: &'a str,
    pub meal: MealSlot,
}

/// Like/dislike signal for one food, scoped to the session's meal slot.
#[derive(Debug, Serialize)]
pub(crate) struct PreferenceRequest<'a> {
    pub user_id: &'a str,
    pub meal: MealSlot,
    pub food: &'a str,
    pub liked: bool,
    pub calories: f64,
}
