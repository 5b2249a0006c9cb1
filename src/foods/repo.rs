use crate::error::ClientError;
use crate::foods::dto::{
    CustomFood, CustomFoodRequest, FoodItem, QueryRequest, ScaleRequest, ScaledFoodItem,
};
use crate::gateway::{Channel, Endpoint};
use crate::state::SessionContext;

pub async fn autocomplete(ctx: &SessionContext, query: &str) -> Result<Vec<FoodItem>, ClientError> {
    let body = QueryRequest {
        user_id: &ctx.user_id,
        query,
    };
    ctx.gateway
        .issue(Endpoint::Autocomplete, &body, Some(Channel::AUTOCOMPLETE))
        .await
}

pub async fn search(ctx: &SessionContext, query: &str) -> Result<Vec<FoodItem>, ClientError> {
    let body = QueryRequest {
        user_id: &ctx.user_id,
        query,
    };
    ctx.gateway
        .issue(Endpoint::Search, &body, Some(Channel::SEARCH))
        .await
}

pub async fn scale_food(
    ctx: &SessionContext,
    food: &FoodItem,
    quantity: f64,
    serving: &str,
) -> Result<ScaledFoodItem, ClientError> {
    let body = ScaleRequest {
        food,
        quantity,
        serving,
    };
    ctx.gateway.issue(Endpoint::ScaleFood, &body, None).await
}

pub async fn add_custom_food(ctx: &SessionContext, food: &CustomFood) -> Result<(), ClientError> {
    let body = CustomFoodRequest {
        user_id: &ctx.user_id,
        food,
    };
    ctx.gateway.issue_status(Endpoint::AddCustomFood, &body).await
}
