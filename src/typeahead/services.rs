use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use crate::foods::{repo, FoodItem};
use crate::gateway::Channel;
use crate::scheduler::TaskSlot;
use crate::state::SessionContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeaheadPhase {
    Idle,
    Debouncing,
    Awaiting,
    Showing,
    Hidden,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeaheadView {
    pub phase: TypeaheadPhase,
    pub query: String,
    pub results: Vec<FoodItem>,
    pub visible: bool,
}

struct TypeaheadState {
    phase: TypeaheadPhase,
    query: String,
    results: Vec<FoodItem>,
    /// Bumped on every keystroke and dismissal; responses for an older
    /// generation are dropped.
    generation: u64,
}

/// Debounced autocomplete dropdown.
#[derive(Clone)]
pub struct TypeaheadController {
    inner: Arc<Inner>,
}

struct Inner {
    ctx: SessionContext,
    state: RwLock<TypeaheadState>,
    debounce: TaskSlot,
}

impl TypeaheadController {
    pub fn new(ctx: SessionContext) -> Self {
        Self {
            inner: Arc::new(Inner {
                ctx,
                state: RwLock::new(TypeaheadState {
                    phase: TypeaheadPhase::Idle,
                    query: String::new(),
                    results: Vec::new(),
                    generation: 0,
                }),
                debounce: TaskSlot::new("typeahead-debounce"),
            }),
        }
    }

    /// Register the current input text. Restarts the quiet period; queries
    /// under the minimum length hide the dropdown without a request.
    pub async fn on_keystroke(&self, text: &str) {
        let min_chars = self.inner.ctx.timing().min_query_chars;
        let generation = {
            let mut st = self.inner.state.write().await;
            st.generation += 1;
            st.query = text.to_string();
            if text.trim().chars().count() < min_chars {
                st.phase = TypeaheadPhase::Hidden;
                st.results.clear();
                None
            } else {
                st.phase = TypeaheadPhase::Debouncing;
                Some(st.generation)
            }
        };

        // Whatever was in flight belongs to an older query.
        self.inner.ctx.gateway.cancel(Channel::AUTOCOMPLETE).await;

        match generation {
            None => self.inner.debounce.cancel().await,
            Some(generation) => {
                let this = self.clone();
                self.inner
                    .debounce
                    .schedule(self.inner.ctx.timing().debounce(), async move {
                        this.fire(generation).await;
                    })
                    .await;
            }
        }
    }

    /// Selection made, outside interaction, or full search invoked.
    pub async fn dismiss(&self) {
        {
            let mut st = self.inner.state.write().await;
            st.generation += 1;
            st.phase = TypeaheadPhase::Hidden;
            st.results.clear();
        }
        self.inner.debounce.cancel().await;
        self.inner.ctx.gateway.cancel(Channel::AUTOCOMPLETE).await;
    }

    pub async fn view(&self) -> TypeaheadView {
        let st = self.inner.state.read().await;
        TypeaheadView {
            phase: st.phase,
            query: st.query.clone(),
            results: st.results.clone(),
            visible: st.phase == TypeaheadPhase::Showing,
        }
    }

    pub async fn teardown(&self) {
        self.inner.debounce.cancel().await;
    }

    #[instrument(skip(self))]
    async fn fire(&self, generation: u64) {
        let query = {
            let mut st = self.inner.state.write().await;
            if st.generation != generation {
                return;
            }
            st.phase = TypeaheadPhase::Awaiting;
            st.query.trim().to_string()
        };

        let results = match repo::autocomplete(&self.inner.ctx, &query).await {
            Ok(results) => results,
            Err(e) if e.is_cancelled() => {
                debug!(%query, "autocomplete superseded");
                return;
            }
            Err(e) => {
                warn!(error = %e, %query, "autocomplete failed, showing no suggestions");
                Vec::new()
            }
        };

        let mut st = self.inner.state.write().await;
        if st.generation != generation {
            return;
        }
        st.phase = if results.is_empty() {
            TypeaheadPhase::Hidden
        } else {
            TypeaheadPhase::Showing
        };
        st.results = results;
    }
}
