use crate::error::ClientError;
use crate::gateway::{Channel, Endpoint};
use crate::meals::dto::{
    CommitRequest, CommittedFood, CurrentMealRequest, LineItemId, MealLineItem, RemoveRequest,
};
use crate::meals::repo_types::MealLineItemRow;
use crate::state::SessionContext;

pub async fn fetch_current_meal(ctx: &SessionContext) -> Result<Vec<MealLineItem>, ClientError> {
    let body = CurrentMealRequest {
        user_id: &ctx.user_id,
        meal: ctx.meal_slot,
        date: ctx.active_day.to_string(),
    };
    let rows: Vec<MealLineItemRow> = ctx
        .gateway
        .issue(Endpoint::CurrentMeal, &body, Some(Channel::CURRENT_MEAL))
        .await?;
    Ok(rows.into_iter().map(MealLineItem::from).collect())
}

pub async fn commit_to_meal(ctx: &SessionContext, food: &CommittedFood) -> Result<(), ClientError> {
    let body = CommitRequest {
        user_id: &ctx.user_id,
        meal: ctx.meal_slot,
        food,
    };
    ctx.gateway.issue_status(Endpoint::CommitToMeal, &body).await
}

pub async fn remove_from_meal(ctx: &SessionContext, id: &LineItemId) -> Result<(), ClientError> {
    let body = RemoveRequest {
        user_id: &ctx.user_id,
        line_item_id: id,
    };
    ctx.gateway.issue_status(Endpoint::RemoveFromMeal, &body).await
}
