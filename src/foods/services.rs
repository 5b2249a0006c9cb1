use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, error, instrument};

use crate::error::ClientError;
use crate::foods::dto::FoodItem;
use crate::foods::repo;
use crate::gateway::Channel;
use crate::scheduler::LoadingFlag;
use crate::state::SessionContext;

/// Full-query search panel.
#[derive(Clone)]
pub struct FoodSearch {
    inner: Arc<Inner>,
}

struct Inner {
    ctx: SessionContext,
    results: RwLock<Vec<FoodItem>>,
    searching: LoadingFlag,
}

impl FoodSearch {
    pub fn new(ctx: SessionContext) -> Self {
        Self {
            inner: Arc::new(Inner {
                ctx,
                results: RwLock::new(Vec::new()),
                searching: LoadingFlag::default(),
            }),
        }
    }

    #[instrument(skip(self), fields(user_id = %self.inner.ctx.user_id))]
    pub async fn search(&self, query: &str) -> Result<(), ClientError> {
        let query = query.trim();
        if query.is_empty() {
            self.clear().await;
            return Ok(());
        }

        let _searching = self.inner.searching.enter();
        match repo::search(&self.inner.ctx, query).await {
            Ok(found) => {
                debug!(count = found.len(), "search results");
                *self.inner.results.write().await = found;
                Ok(())
            }
            Err(e) if e.is_cancelled() => Ok(()),
            Err(e) => {
                error!(error = %e, "food search failed");
                self.inner.results.write().await.clear();
                Err(e)
            }
        }
    }

    pub async fn clear(&self) {
        self.inner.ctx.gateway.cancel(Channel::SEARCH).await;
        self.inner.results.write().await.clear();
    }

    pub async fn results(&self) -> Vec<FoodItem> {
        self.inner.results.read().await.clone()
    }

    pub fn is_searching(&self) -> bool {
        self.inner.searching.is_set()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meals::dto::MealSlot;
    use serde_json::json;

    #[tokio::test]
    async fn search_replaces_results() {
        let (transport, ctx) = SessionContext::fake(MealSlot::Lunch);
        transport.reply(
            "/search_food",
            json!([{ "name": "Chicken Breast", "calories": 165.0, "serving": "100 g" }]),
        );
        let search = FoodSearch::new(ctx);
        search.search("chicken").await.expect("search");
        let results = search.results().await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].name, "Chicken Breast");
        assert_eq!(transport.calls_to("/search_food")[0]["query"], "chicken");
        assert!(!search.is_searching());
    }

    #[tokio::test]
    async fn blank_query_clears_without_request() {
        let (transport, ctx) = SessionContext::fake(MealSlot::Lunch);
        transport.reply("/search_food", json!([{ "name": "Rice" }]));
        let search = FoodSearch::new(ctx);
        search.search("rice").await.expect("search");
        search.search("   ").await.expect("blank");
        assert!(search.results().await.is_empty());
        assert_eq!(transport.count("/search_food"), 1);
    }

    #[tokio::test]
    async fn failure_clears_and_propagates() {
        let (transport, ctx) = SessionContext::fake(MealSlot::Lunch);
        transport.reply_once("/search_food", Ok(json!([{ "name": "Rice" }])));
        transport.reply_once("/search_food", Err(ClientError::Network("offline".into())));
        let search = FoodSearch::new(ctx);
        search.search("rice").await.expect("first search");
        let err = search.search("rice").await.unwrap_err();
        assert!(matches!(err, ClientError::Network(_)));
        assert!(search.results().await.is_empty());
    }
}
