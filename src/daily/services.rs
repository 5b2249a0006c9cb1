use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, error, info, instrument, warn};

use crate::daily::dto::DailySummary;
use crate::daily::repo;
use crate::error::ClientError;
use crate::scheduler::LoadingFlag;
use crate::state::SessionContext;

/// Daily summary panel. Read-only; refreshed after meal mutations.
#[derive(Clone)]
pub struct DailyTracker {
    inner: Arc<Inner>,
}

struct Inner {
    ctx: SessionContext,
    summary: RwLock<Option<DailySummary>>,
    loading: LoadingFlag,
    /// Issued refreshes; only the latest one may write the summary.
    generation: AtomicU64,
}

impl DailyTracker {
    pub fn new(ctx: SessionContext) -> Self {
        Self {
            inner: Arc::new(Inner {
                ctx,
                summary: RwLock::new(None),
                loading: LoadingFlag::default(),
                generation: AtomicU64::new(0),
            }),
        }
    }

    /// Fetch total, macros and per-slot progress concurrently. If any of the
    /// three fails the previous summary stays in place. A refresh overtaken
    /// by a later one discards its result.
    #[instrument(skip(self), fields(user_id = %self.inner.ctx.user_id))]
    pub async fn refresh(&self) {
        let _loading = self.inner.loading.enter();
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let ctx = &self.inner.ctx;
        let (total, macros, meals) = tokio::join!(
            repo::fetch_daily_total(ctx),
            repo::fetch_daily_nutrients(ctx),
            repo::fetch_meal_progress(ctx),
        );

        match (total, macros, meals) {
            (Ok(total_calories), Ok(macros), Ok(meals)) => {
                let mut summary = self.inner.summary.write().await;
                if self.inner.generation.load(Ordering::SeqCst) != generation {
                    debug!(generation, "stale daily summary dropped");
                    return;
                }
                debug!(total_calories, slots = meals.len(), "daily summary refreshed");
                *summary = Some(DailySummary {
                    total_calories,
                    macros,
                    meals,
                });
            }
            (Err(e), _, _) | (_, Err(e), _) | (_, _, Err(e)) => {
                if e.is_cancelled() {
                    debug!("daily summary refresh cancelled");
                } else {
                    warn!(error = %e, "daily summary refresh failed, keeping previous");
                }
            }
        }
    }

    /// Ask the service to start a new day. Callers reload the other panels.
    #[instrument(skip(self), fields(user_id = %self.inner.ctx.user_id))]
    pub async fn start_next_day(&self) -> Result<(), ClientError> {
        match repo::start_next_day(&self.inner.ctx).await {
            Ok(()) => {
                info!("new day started");
                Ok(())
            }
            Err(e) => {
                if !e.is_cancelled() {
                    error!(error = %e, "could not start next day");
                }
                Err(e)
            }
        }
    }

    pub async fn summary(&self) -> Option<DailySummary> {
        self.inner.summary.read().await.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.loading.is_set()
    }
}
