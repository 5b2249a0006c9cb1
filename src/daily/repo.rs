use std::collections::BTreeMap;

use serde_json::Value;

use crate::daily::dto::{DailyTotalReply, MacroTotals, MealProgress, MealProgressReply, UserRequest};
use crate::error::ClientError;
use crate::gateway::Endpoint;
use crate::meals::dto::MealSlot;
use crate::state::SessionContext;

fn user(ctx: &SessionContext) -> UserRequest<'_> {
    UserRequest {
        user_id: &ctx.user_id,
    }
}

pub async fn fetch_daily_total(ctx: &SessionContext) -> Result<f64, ClientError> {
    let reply: DailyTotalReply = ctx
        .gateway
        .issue(Endpoint::DailyTotal, &user(ctx), None)
        .await?;
    Ok(reply.total_eaten)
}

pub async fn fetch_daily_nutrients(ctx: &SessionContext) -> Result<MacroTotals, ClientError> {
    ctx.gateway
        .issue(Endpoint::DailyNutrients, &user(ctx), None)
        .await
}

pub async fn fetch_meal_progress(
    ctx: &SessionContext,
) -> Result<BTreeMap<MealSlot, MealProgress>, ClientError> {
    let reply: MealProgressReply = ctx
        .gateway
        .issue(Endpoint::MealProgress, &user(ctx), None)
        .await?;
    Ok(reply.into_slots())
}

/// Reset the user's daily log on the service.
pub async fn start_next_day(ctx: &SessionContext) -> Result<(), ClientError> {
    let _ack: Value = ctx
        .gateway
        .issue(Endpoint::NextDay, &user(ctx), None)
        .await?;
    Ok(())
}
