use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, error, info, instrument, warn};

use crate::error::ClientError;
use crate::foods::{self, FoodItem, Nutrients};
use crate::meals::dto::{self, CommittedFood, LineItemId, MealLineItem};
use crate::meals::repo;
use crate::scheduler::{ExclusiveFlag, LoadingFlag};
use crate::state::SessionContext;

/// Quantity from free-form user text. Anything that is not a positive
/// finite number becomes `1`.
pub fn parse_quantity(text: &str) -> f64 {
    text.trim()
        .parse::<f64>()
        .map(sanitize_quantity)
        .unwrap_or(1.0)
}

pub fn sanitize_quantity(quantity: f64) -> f64 {
    if quantity.is_finite() && quantity > 0.0 {
        quantity
    } else {
        1.0
    }
}

fn needs_scaling(food: &FoodItem, quantity: f64, serving: &str) -> bool {
    (quantity - 1.0).abs() > f64::EPSILON || serving != food.serving
}

/// Owns the current meal list for the session's slot and the add/remove
/// protocols. The list is only ever replaced by a full re-fetch.
#[derive(Clone)]
pub struct MealComposer {
    inner: Arc<Inner>,
}

struct Inner {
    ctx: SessionContext,
    items: RwLock<Vec<MealLineItem>>,
    loading: LoadingFlag,
    adding: ExclusiveFlag,
    removing: ExclusiveFlag,
}

impl MealComposer {
    pub fn new(ctx: SessionContext) -> Self {
        Self {
            inner: Arc::new(Inner {
                ctx,
                items: RwLock::new(Vec::new()),
                loading: LoadingFlag::default(),
                adding: ExclusiveFlag::default(),
                removing: ExclusiveFlag::default(),
            }),
        }
    }

    /// Replace the local list with the server's. A load superseded by a newer
    /// one returns `Ok` without touching the list.
    #[instrument(skip(self), fields(meal = %self.inner.ctx.meal_slot))]
    pub async fn load_current_meal(&self) -> Result<(), ClientError> {
        let _loading = self.inner.loading.enter();
        match repo::fetch_current_meal(&self.inner.ctx).await {
            Ok(items) => {
                debug!(count = items.len(), "meal items loaded");
                *self.inner.items.write().await = items;
                Ok(())
            }
            Err(e) if e.is_cancelled() => Ok(()),
            Err(e) => {
                error!(error = %e, "loading meal items failed");
                Err(e)
            }
        }
    }

    /// Scale if needed, commit, then re-fetch the meal list.
    ///
    /// Rejected with `Busy` while another add is in flight. A failure in the
    /// scale or commit step leaves the local list untouched.
    #[instrument(skip(self, food), fields(food = %food.name, meal = %self.inner.ctx.meal_slot))]
    pub async fn add_to_meal(
        &self,
        food: &FoodItem,
        quantity: f64,
        serving: Option<&str>,
    ) -> Result<CommittedFood, ClientError> {
        let Some(_adding) = self.inner.adding.try_enter() else {
            warn!("add to meal already in progress");
            return Err(ClientError::Busy("add to meal"));
        };

        let quantity = sanitize_quantity(quantity);
        let serving = serving
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(&food.serving)
            .to_string();

        let committed = if needs_scaling(food, quantity, &serving) {
            let scaled = foods::repo::scale_food(&self.inner.ctx, food, quantity, &serving)
                .await
                .map_err(|e| log_primary_failure("scale", e))?;
            CommittedFood::scaled(food, scaled, quantity, serving)
        } else {
            CommittedFood::as_fetched(food, serving)
        };

        repo::commit_to_meal(&self.inner.ctx, &committed)
            .await
            .map_err(|e| log_primary_failure("commit", e))?;
        info!(quantity = committed.quantity, serving = %committed.serving, "food committed");

        // The commit already landed server-side; a failed refresh only leaves
        // the mirror stale until the next load.
        if let Err(e) = self.load_current_meal().await {
            warn!(error = %e, "meal refresh after commit failed");
        }
        Ok(committed)
    }

    #[instrument(skip(self), fields(meal = %self.inner.ctx.meal_slot))]
    pub async fn remove_from_meal(&self, id: &LineItemId) -> Result<(), ClientError> {
        let Some(_removing) = self.inner.removing.try_enter() else {
            return Err(ClientError::Busy("remove from meal"));
        };
        repo::remove_from_meal(&self.inner.ctx, id)
            .await
            .map_err(|e| log_primary_failure("remove", e))?;
        info!(%id, "line item removed");

        if let Err(e) = self.load_current_meal().await {
            warn!(error = %e, "meal refresh after remove failed");
        }
        Ok(())
    }

    pub async fn items(&self) -> Vec<MealLineItem> {
        self.inner.items.read().await.clone()
    }

    /// Recomputed from the current list on every call.
    pub async fn totals(&self) -> Nutrients {
        dto::totals(&self.inner.items.read().await)
    }

    pub fn is_loading(&self) -> bool {
        self.inner.loading.is_set()
    }

    pub fn is_adding(&self) -> bool {
        self.inner.adding.is_set()
    }

    pub fn is_removing(&self) -> bool {
        self.inner.removing.is_set()
    }
}

fn log_primary_failure(step: &'static str, e: ClientError) -> ClientError {
    if e.is_cancelled() {
        debug!(step, "meal operation cancelled");
    } else {
        error!(step, error = %e, "meal operation failed");
    }
    e
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meals::dto::MealSlot;
    use serde_json::json;

    fn oatmeal() -> FoodItem {
        serde_json::from_value(json!({
            "name": "Oatmeal",
            "calories": 100.0,
            "protein": 4.0,
            "carbohydrates": 18.0,
            "fat": 2.0,
            "serving": "1 cup",
            "available_servings": ["1 cup", "serving"],
            "source": "catalog"
        }))
        .unwrap()
    }

    fn line(id: &str, calories: f64, protein: f64) -> serde_json::Value {
        json!({
            "id": id, "name": format!("item {id}"), "quantity": 1.0, "serving": "serving",
            "calories": calories, "protein": protein, "carbohydrates": 1.0, "fat": 0.5,
            "source": "catalog"
        })
    }

    #[test]
    fn quantity_falls_back_to_one() {
        for raw in ["", "abc", "0", "-2", "NaN", "inf", "  "] {
            assert_eq!(parse_quantity(raw), 1.0, "input {raw:?}");
        }
        assert_eq!(parse_quantity(" 2.5 "), 2.5);
        assert_eq!(sanitize_quantity(-0.5), 1.0);
        assert_eq!(sanitize_quantity(f64::NAN), 1.0);
        assert_eq!(sanitize_quantity(3.0), 3.0);
    }

    #[tokio::test]
    async fn non_positive_quantity_commits_one_without_scaling() {
        let (transport, ctx) = SessionContext::fake(MealSlot::Breakfast);
        transport.reply("/add_food_to_meal", json!({ "success": true }));
        transport.reply("/get_meal_items", json!([line("1", 100.0, 4.0)]));
        let meals = MealComposer::new(ctx);

        let committed = meals.add_to_meal(&oatmeal(), -3.0, None).await.expect("add");

        assert_eq!(committed.quantity, 1.0);
        assert_eq!(transport.count("/scale_food"), 0);
        let sent = &transport.calls_to("/add_food_to_meal")[0];
        assert_eq!(sent["food"]["quantity"], 1.0);
        assert_eq!(sent["food"]["calories"], 100.0);
        assert_eq!(sent["meal"], "breakfast");
        assert_eq!(sent["user_id"], "user_123");
    }

    #[tokio::test]
    async fn quantity_other_than_one_scales_even_with_native_serving() {
        let (transport, ctx) = SessionContext::fake(MealSlot::Breakfast);
        transport.reply(
            "/scale_food",
            json!({
                "name": "Oatmeal", "calories": 200.0, "protein": 8.0,
                "carbohydrates": 36.0, "fat": 4.0, "quantity": 2.0,
                "serving_used": "1 cup", "display_name": "2 1 cups of Oatmeal"
            }),
        );
        transport.reply("/add_food_to_meal", json!({ "success": true }));
        transport.reply("/get_meal_items", json!([line("1", 200.0, 8.0)]));
        let meals = MealComposer::new(ctx);

        let committed = meals
            .add_to_meal(&oatmeal(), 2.0, Some("1 cup"))
            .await
            .expect("add");

        assert_eq!(transport.count("/scale_food"), 1);
        let scale = &transport.calls_to("/scale_food")[0];
        assert_eq!(scale["quantity"], 2.0);
        assert_eq!(scale["serving"], "1 cup");
        let sent = &transport.calls_to("/add_food_to_meal")[0];
        assert_eq!(sent["food"]["calories"], 200.0);
        assert_eq!(sent["food"]["quantity"], 2.0);
        assert_eq!(committed.nutrients().calories, 200.0);
        assert_eq!(meals.totals().await.calories, 200.0);
    }

    #[tokio::test]
    async fn different_serving_triggers_scaling() {
        let (transport, ctx) = SessionContext::fake(MealSlot::Breakfast);
        transport.reply(
            "/scale_food",
            json!({
                "name": "Oatmeal", "calories": 125.0, "protein": 5.0,
                "carbohydrates": 22.5, "fat": 2.5, "quantity": 1.0, "serving_used": "serving"
            }),
        );
        transport.reply("/add_food_to_meal", json!({ "success": true }));
        transport.reply("/get_meal_items", json!([]));
        let meals = MealComposer::new(ctx);

        meals
            .add_to_meal(&oatmeal(), 1.0, Some("serving"))
            .await
            .expect("add");
        assert_eq!(transport.count("/scale_food"), 1);
        assert_eq!(transport.calls_to("/add_food_to_meal")[0]["food"]["serving"], "serving");
    }

    #[tokio::test]
    async fn commit_failure_after_scale_leaves_list_unchanged() {
        let (transport, ctx) = SessionContext::fake(MealSlot::Lunch);
        transport.reply("/get_meal_items", json!([line("1", 300.0, 20.0)]));
        let meals = MealComposer::new(ctx);
        meals.load_current_meal().await.expect("initial load");
        let before = meals.items().await;

        transport.reply(
            "/scale_food",
            json!({
                "name": "Oatmeal", "calories": 300.0, "protein": 12.0,
                "carbohydrates": 54.0, "fat": 6.0, "quantity": 3.0, "serving_used": "1 cup"
            }),
        );
        transport.reply_once(
            "/add_food_to_meal",
            Err(ClientError::Http { status: 500, body: "db down".into() }),
        );

        let err = meals.add_to_meal(&oatmeal(), 3.0, None).await.unwrap_err();
        assert!(matches!(err, ClientError::Http { status: 500, .. }));
        assert_eq!(meals.items().await, before);
        assert_eq!(transport.count("/get_meal_items"), 1);
        assert!(!meals.is_adding());
    }

    #[tokio::test]
    async fn food_shaped_scale_reply_still_commits() {
        let (transport, ctx) = SessionContext::fake(MealSlot::Dinner);
        transport.reply(
            "/scale_food",
            json!({
                "name": "Oatmeal", "calories": 200.0, "protein": 8.0,
                "carbohydrates": 36.0, "fat": 4.0, "serving": "1 cup"
            }),
        );
        transport.reply("/add_food_to_meal", json!({ "success": true }));
        transport.reply("/get_meal_items", json!([line("1", 200.0, 8.0)]));
        let meals = MealComposer::new(ctx);

        let committed = meals.add_to_meal(&oatmeal(), 2.0, None).await.expect("add");

        assert_eq!(committed.quantity, 2.0);
        assert_eq!(committed.serving, "1 cup");
        assert_eq!(committed.calories, 200.0);
        let sent = &transport.calls_to("/add_food_to_meal");
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0]["food"]["calories"], 200.0);
        assert_eq!(sent[0]["food"]["quantity"], 2.0);
    }

    #[tokio::test]
    async fn scale_failure_skips_commit() {
        let (transport, ctx) = SessionContext::fake(MealSlot::Lunch);
        transport.reply_once("/scale_food", Err(ClientError::Network("offline".into())));
        let meals = MealComposer::new(ctx);

        let err = meals.add_to_meal(&oatmeal(), 2.0, None).await.unwrap_err();
        assert!(matches!(err, ClientError::Network(_)));
        assert_eq!(transport.count("/add_food_to_meal"), 0);
    }

    #[tokio::test]
    async fn rejected_commit_is_a_failure() {
        let (transport, ctx) = SessionContext::fake(MealSlot::Lunch);
        transport.reply(
            "/add_food_to_meal",
            json!({ "success": false, "message": "meal locked" }),
        );
        let meals = MealComposer::new(ctx);
        let err = meals.add_to_meal(&oatmeal(), 1.0, None).await.unwrap_err();
        assert!(matches!(err, ClientError::Rejected(_)));
        assert_eq!(transport.count("/get_meal_items"), 0);
    }

    #[tokio::test]
    async fn concurrent_add_is_rejected_while_first_is_pending() {
        let (transport, ctx) = SessionContext::fake(MealSlot::Dinner);
        let release_commit = transport.hold("/add_food_to_meal");
        transport.reply("/get_meal_items", json!([line("7", 100.0, 4.0)]));
        let meals = MealComposer::new(ctx);

        let first = {
            let meals = meals.clone();
            tokio::spawn(async move { meals.add_to_meal(&oatmeal(), 1.0, None).await })
        };
        tokio::task::yield_now().await;
        assert!(meals.is_adding());

        let second = meals.add_to_meal(&oatmeal(), 1.0, None).await;
        assert!(matches!(second, Err(ClientError::Busy(_))));

        release_commit
            .send(Ok(json!({ "success": true })))
            .expect("commit pending");
        first.await.expect("join").expect("first add");

        assert_eq!(transport.count("/add_food_to_meal"), 1);
        assert_eq!(meals.items().await.len(), 1);
        assert!(!meals.is_adding());
    }

    #[tokio::test]
    async fn remove_refreshes_list_and_totals() {
        let (transport, ctx) = SessionContext::fake(MealSlot::Snacks);
        transport.reply_once(
            "/get_meal_items",
            Ok(json!([line("1", 150.0, 3.0), line("2", 90.0, 1.0)])),
        );
        transport.reply_once("/get_meal_items", Ok(json!([line("2", 90.0, 1.0)])));
        transport.reply("/remove_food_from_meal", json!({ "success": true }));
        let meals = MealComposer::new(ctx);

        meals.load_current_meal().await.expect("load");
        assert_eq!(meals.totals().await.calories, 240.0);

        meals.remove_from_meal(&LineItemId::from("1")).await.expect("remove");
        assert_eq!(
            transport.calls_to("/remove_food_from_meal")[0]["line_item_id"],
            "1"
        );
        let items = meals.items().await;
        assert_eq!(items.len(), 1);
        assert_eq!(meals.totals().await, dto::totals(&items));
        assert_eq!(meals.totals().await.calories, 90.0);
    }

    #[tokio::test]
    async fn newer_load_wins_over_slower_older_load() {
        let (transport, ctx) = SessionContext::fake(MealSlot::Lunch);
        let slow = transport.hold("/get_meal_items");
        transport.reply("/get_meal_items", json!([line("new", 500.0, 30.0)]));
        let meals = MealComposer::new(ctx);

        let older = {
            let meals = meals.clone();
            tokio::spawn(async move { meals.load_current_meal().await })
        };
        tokio::task::yield_now().await;
        meals.load_current_meal().await.expect("newer load");
        let _ = slow.send(Ok(json!([line("old", 1.0, 1.0)])));
        older.await.expect("join").expect("superseded load is not an error");

        let items = meals.items().await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, LineItemId::from("new"));
        assert!(!meals.is_loading());
    }
}
