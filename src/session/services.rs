use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::{debug, error, info, instrument, warn};

use crate::daily::DailyTracker;
use crate::error::ClientError;
use crate::foods::{self, CustomFood, CustomFoodDraft, FoodItem, FoodSearch};
use crate::meals::{CommittedFood, LineItemId, MealComposer};
use crate::scheduler::{ExclusiveFlag, TaskSlot};
use crate::session::dto::{PanelLoading, Selection, SessionView};
use crate::state::SessionContext;
use crate::suggestions::PreferenceLoop;
use crate::typeahead::TypeaheadController;

/// One meal slot's session: wires the panels together and sequences the
/// work that spans more than one of them.
#[derive(Clone)]
pub struct NutritionSession {
    inner: Arc<Inner>,
}

struct Inner {
    ctx: SessionContext,
    typeahead: TypeaheadController,
    search: FoodSearch,
    meals: MealComposer,
    suggestions: PreferenceLoop,
    daily: DailyTracker,
    selection: RwLock<Option<Selection>>,
    /// Held from the scale call until the dependent panels are updated.
    adding: ExclusiveFlag,
    meal_load: TaskSlot,
    suggestions_load: TaskSlot,
    daily_refresh: TaskSlot,
}

impl NutritionSession {
    pub fn new(ctx: SessionContext) -> Self {
        Self {
            inner: Arc::new(Inner {
                typeahead: TypeaheadController::new(ctx.clone()),
                search: FoodSearch::new(ctx.clone()),
                meals: MealComposer::new(ctx.clone()),
                suggestions: PreferenceLoop::new(ctx.clone()),
                daily: DailyTracker::new(ctx.clone()),
                selection: RwLock::new(None),
                adding: ExclusiveFlag::default(),
                meal_load: TaskSlot::new("meal-load"),
                suggestions_load: TaskSlot::new("suggestions-load"),
                daily_refresh: TaskSlot::new("daily-refresh"),
                ctx,
            }),
        }
    }

    /// Open the session: the meal list loads at once, suggestions after the
    /// stagger delay.
    #[instrument(skip(ctx), fields(session_id = %ctx.session_id, meal = %ctx.meal_slot))]
    pub async fn start(ctx: SessionContext) -> Self {
        let session = Self::new(ctx);

        let meals = session.inner.meals.clone();
        session
            .inner
            .meal_load
            .schedule(Duration::ZERO, async move {
                if let Err(e) = meals.load_current_meal().await {
                    debug!(error = %e, "initial meal load failed");
                }
            })
            .await;

        let suggestions = session.inner.suggestions.clone();
        session
            .inner
            .suggestions_load
            .schedule(session.inner.ctx.timing().suggestions_stagger(), async move {
                suggestions.load_suggestions().await;
            })
            .await;

        session.schedule_daily_refresh().await;
        info!("session started");
        session
    }

    pub fn context(&self) -> &SessionContext {
        &self.inner.ctx
    }

    pub async fn on_search_input(&self, text: &str) {
        self.inner.typeahead.on_keystroke(text).await;
    }

    pub async fn dismiss_autocomplete(&self) {
        self.inner.typeahead.dismiss().await;
    }

    pub async fn search(&self, query: &str) -> Result<(), ClientError> {
        self.inner.typeahead.dismiss().await;
        self.inner.search.search(query).await
    }

    pub async fn select_food(&self, food: FoodItem, from_suggestion: bool) {
        self.inner.typeahead.dismiss().await;
        debug!(food = %food.name, from_suggestion, "food selected");
        *self.inner.selection.write().await = Some(Selection::new(food, from_suggestion));
    }

    pub async fn set_quantity(&self, text: &str) -> Result<(), ClientError> {
        let mut selection = self.inner.selection.write().await;
        let selection = selection
            .as_mut()
            .ok_or_else(|| ClientError::validation("no food selected"))?;
        selection.quantity_text = text.to_string();
        Ok(())
    }

    /// Returns `false` and keeps the current serving when the food does not
    /// offer `serving`.
    pub async fn set_serving(&self, serving: &str) -> Result<bool, ClientError> {
        let mut selection = self.inner.selection.write().await;
        let selection = selection
            .as_mut()
            .ok_or_else(|| ClientError::validation("no food selected"))?;
        Ok(selection.choose_serving(serving))
    }

    pub async fn clear_selection(&self) {
        *self.inner.selection.write().await = None;
    }

    /// Add the current selection with its parsed quantity and serving.
    pub async fn add_selection(&self) -> Result<CommittedFood, ClientError> {
        let selection = self
            .inner
            .selection
            .read()
            .await
            .clone()
            .ok_or_else(|| ClientError::validation("no food selected"))?;
        self.add_to_meal(
            &selection.food,
            selection.quantity(),
            Some(selection.serving.as_str()),
            selection.from_suggestion,
        )
        .await
    }

    /// Scale, commit and refresh through the composer, then update the
    /// panels that depend on the meal list. A second add before all of that
    /// finishes fails with `Busy`.
    pub async fn add_to_meal(
        &self,
        food: &FoodItem,
        quantity: f64,
        serving: Option<&str>,
        from_suggestion: bool,
    ) -> Result<CommittedFood, ClientError> {
        let Some(_adding) = self.inner.adding.try_enter() else {
            warn!(food = %food.name, "add to meal already in progress");
            return Err(ClientError::Busy("add to meal"));
        };
        let committed = self.inner.meals.add_to_meal(food, quantity, serving).await?;
        if from_suggestion {
            self.inner.suggestions.remove_entry(&food.name).await;
        }
        self.reset_transient().await;
        self.schedule_daily_refresh().await;
        Ok(committed)
    }

    pub async fn remove_from_meal(&self, id: &LineItemId) -> Result<(), ClientError> {
        self.inner.meals.remove_from_meal(id).await?;
        self.schedule_daily_refresh().await;
        Ok(())
    }

    pub async fn submit_preference(&self, food: &FoodItem, liked: bool) -> Result<(), ClientError> {
        self.inner.suggestions.submit_preference(food, liked).await
    }

    pub async fn refresh_suggestions(&self) {
        self.inner.suggestions.refresh().await;
    }

    pub async fn refresh_daily_summary(&self) {
        self.inner.daily_refresh.cancel().await;
        self.inner.daily.refresh().await;
    }

    /// Validate locally, then create the food on the service.
    #[instrument(skip(self, draft), fields(name = %draft.name))]
    pub async fn add_custom_food(&self, draft: &CustomFoodDraft) -> Result<CustomFood, ClientError> {
        let food = draft.validate()?;
        match foods::repo::add_custom_food(&self.inner.ctx, &food).await {
            Ok(()) => {
                info!(calories = food.calories, "custom food added");
                Ok(food)
            }
            Err(e) => {
                if !e.is_cancelled() {
                    error!(error = %e, "adding custom food failed");
                }
                Err(e)
            }
        }
    }

    /// Reload every panel concurrently. Only the meal list is a primary
    /// read, so only its failure is returned.
    #[instrument(skip(self), fields(meal = %self.inner.ctx.meal_slot))]
    pub async fn refresh_all(&self) -> Result<(), ClientError> {
        let (meals, (), ()) = tokio::join!(
            self.inner.meals.load_current_meal(),
            self.inner.suggestions.load_suggestions(),
            self.inner.daily.refresh(),
        );
        meals
    }

    pub async fn start_next_day(&self) -> Result<(), ClientError> {
        self.inner.daily.start_next_day().await?;
        self.reset_transient().await;
        self.refresh_all().await
    }

    pub async fn view(&self) -> SessionView {
        let inner = &self.inner;
        SessionView {
            session_id: inner.ctx.session_id,
            meal: inner.ctx.meal_slot,
            active_day: inner.ctx.active_day.to_string(),
            meal_items: inner.meals.items().await,
            totals: inner.meals.totals().await,
            suggestions: inner.suggestions.entries().await,
            pending_feedback: inner.suggestions.pending_feedback().await,
            search_results: inner.search.results().await,
            autocomplete: inner.typeahead.view().await,
            selection: inner.selection.read().await.clone(),
            daily: inner.daily.summary().await,
            loading: PanelLoading {
                meal_items: inner.meals.is_loading(),
                suggestions: inner.suggestions.is_loading(),
                search: inner.search.is_searching(),
                daily_summary: inner.daily.is_loading(),
                adding_food: inner.adding.is_set() || inner.meals.is_adding(),
                removing_food: inner.meals.is_removing(),
            },
        }
    }

    /// Cancel scheduled work and every outstanding request. The session is
    /// unusable afterwards: new requests fail with `Cancelled`.
    #[instrument(skip(self), fields(session_id = %self.inner.ctx.session_id))]
    pub async fn shutdown(&self) {
        self.inner.ctx.gateway.shutdown().await;
        self.inner.meal_load.cancel().await;
        self.inner.suggestions_load.cancel().await;
        self.inner.daily_refresh.cancel().await;
        self.inner.typeahead.teardown().await;
        self.inner.suggestions.teardown().await;
        info!("session closed");
    }

    async fn reset_transient(&self) {
        *self.inner.selection.write().await = None;
        self.inner.typeahead.dismiss().await;
        self.inner.search.clear().await;
    }

    async fn schedule_daily_refresh(&self) {
        let daily = self.inner.daily.clone();
        self.inner
            .daily_refresh
            .schedule(Duration::ZERO, async move { daily.refresh().await })
            .await;
    }
}
