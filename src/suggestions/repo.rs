use serde_json::Value;

use crate::error::ClientError;
use crate::foods::FoodItem;
use crate::gateway::{Channel, Endpoint};
use crate::state::SessionContext;
use crate::suggestions::dto::{PreferenceRequest, SuggestionsRequest};

pub async fn fetch_suggestions(ctx: &SessionContext) -> Result<Vec<FoodItem>, ClientError> {
    let body = SuggestionsRequest {
        user_id: &ctx.user_id,
        meal: ctx.meal_slot,
    };
    ctx.gateway
        .issue(Endpoint::Suggestions, &body, Some(Channel::SUGGESTIONS))
        .await
}

/// The acknowledgement body is not interpreted; any 2xx JSON counts.
pub async fn submit_preference(
    ctx: &SessionContext,
    food: &FoodItem,
    liked: bool,
) -> Result<(), ClientError> {
    let body = PreferenceRequest {
        user_id: &ctx.user_id,
        meal: ctx.meal_slot,
        food: &food.name,
        liked,
        calories: food.calories,
    };
    let _ack: Value = ctx
        .gateway
        .issue(Endpoint::SubmitPreference, &body, None)
        .await?;
    Ok(())
}
