use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use crate::error::ClientError;
use crate::foods::FoodItem;
use crate::gateway::Channel;
use crate::scheduler::{DetachedTasks, LoadingFlag, TaskSlot};
use crate::state::SessionContext;
use crate::suggestions::repo;

#[derive(Default)]
struct LoopState {
    entries: Vec<FoodItem>,
    /// Disliked names whose preference call has not resolved yet. Loaded
    /// lists are filtered against this set.
    unacknowledged_dislikes: HashSet<String>,
    pending_feedback: BTreeSet<String>,
}

/// Suggestion list for the session's meal slot plus the like/dislike loop
/// that reshapes it.
#[derive(Clone)]
pub struct PreferenceLoop {
    inner: Arc<Inner>,
}

struct Inner {
    ctx: SessionContext,
    state: RwLock<LoopState>,
    loading: LoadingFlag,
    backfill: TaskSlot,
    feedback: DetachedTasks,
}

impl PreferenceLoop {
    pub fn new(ctx: SessionContext) -> Self {
        Self {
            inner: Arc::new(Inner {
                ctx,
                state: RwLock::new(LoopState::default()),
                loading: LoadingFlag::default(),
                backfill: TaskSlot::new("suggestion-backfill"),
                feedback: DetachedTasks::default(),
            }),
        }
    }

    /// Replace the list with the server's current suggestions. Failures
    /// leave an empty list; a superseded load leaves the list untouched.
    #[instrument(skip(self), fields(meal = %self.inner.ctx.meal_slot))]
    pub async fn load_suggestions(&self) {
        let _loading = self.inner.loading.enter();
        let fetched = match repo::fetch_suggestions(&self.inner.ctx).await {
            Ok(fetched) => fetched,
            Err(e) if e.is_cancelled() => {
                debug!("suggestion load superseded");
                return;
            }
            Err(e) => {
                warn!(error = %e, "suggestion load failed, showing none");
                Vec::new()
            }
        };

        let mut st = self.inner.state.write().await;
        let LoopState {
            entries,
            unacknowledged_dislikes,
            ..
        } = &mut *st;
        *entries = fetched
            .into_iter()
            .filter(|food| !unacknowledged_dislikes.contains(&food.name))
            .collect();
        debug!(count = entries.len(), "suggestions loaded");
    }

    /// "Get new suggestions": reload at once.
    pub async fn refresh(&self) {
        self.inner.backfill.cancel().await;
        self.load_suggestions().await;
    }

    /// Send a like/dislike for `food` without waiting for the answer.
    ///
    /// A dislike drops the entry right away. Either way a backfill load is
    /// scheduled after the backfill delay. A second signal for the same food
    /// while the first is unresolved fails with `Busy`.
    #[instrument(skip(self, food), fields(food = %food.name))]
    pub async fn submit_preference(&self, food: &FoodItem, liked: bool) -> Result<(), ClientError> {
        {
            let mut st = self.inner.state.write().await;
            if !st.pending_feedback.insert(food.name.clone()) {
                return Err(ClientError::Busy("preference for this food"));
            }
            if !liked {
                st.entries.retain(|entry| entry.name != food.name);
                st.unacknowledged_dislikes.insert(food.name.clone());
            }
        }
        if !liked {
            // A list already on its way may predate the dislike.
            self.inner.ctx.gateway.cancel(Channel::SUGGESTIONS).await;
        }

        let this = self.clone();
        let food = food.clone();
        self.inner
            .feedback
            .spawn(async move { this.send_preference(food, liked).await })
            .await;
        self.schedule_backfill().await;
        Ok(())
    }

    /// Drop the entry named `name` (the user ate it) and schedule a backfill.
    pub async fn remove_entry(&self, name: &str) {
        let removed = {
            let mut st = self.inner.state.write().await;
            let before = st.entries.len();
            st.entries.retain(|entry| entry.name != name);
            before != st.entries.len()
        };
        debug!(food = name, removed, "suggestion consumed");
        self.schedule_backfill().await;
    }

    pub async fn entries(&self) -> Vec<FoodItem> {
        self.inner.state.read().await.entries.clone()
    }

    pub async fn pending_feedback(&self) -> Vec<String> {
        self.inner
            .state
            .read()
            .await
            .pending_feedback
            .iter()
            .cloned()
            .collect()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.loading.is_set()
    }

    pub async fn teardown(&self) {
        self.inner.backfill.cancel().await;
        self.inner.feedback.abort_all().await;
    }

    async fn send_preference(&self, food: FoodItem, liked: bool) {
        match repo::submit_preference(&self.inner.ctx, &food, liked).await {
            Ok(()) => info!(food = %food.name, liked, "preference recorded"),
            Err(e) if e.is_cancelled() => debug!(food = %food.name, "preference call cancelled"),
            Err(e) => warn!(error = %e, food = %food.name, liked, "preference not recorded"),
        }
        let mut st = self.inner.state.write().await;
        st.pending_feedback.remove(&food.name);
        st.unacknowledged_dislikes.remove(&food.name);
    }

    async fn schedule_backfill(&self) {
        let this = self.clone();
        self.inner
            .backfill
            .schedule(self.inner.ctx.timing().backfill_delay(), async move {
                this.load_suggestions().await;
            })
            .await;
    }
}
