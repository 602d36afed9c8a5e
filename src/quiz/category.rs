use std::sync::Arc;

use log::{debug, info, warn};
use serde::Deserialize;
use tokio::sync::Mutex;

use super::api::{TriviaApi, TriviaError};
use super::query::CATEGORY_ENDPOINT;
use super::store::FetchOutcome;
use super::{Category, Progress};

#[derive(Debug, Deserialize)]
struct TriviaCategories {
    trivia_categories: Vec<Category>,
}

/// Fetches the category list, adds the "any category" entry and sorts everything by id.
pub async fn load(api: &dyn TriviaApi) -> Result<Vec<Category>, TriviaError> {
    let body = api.get(CATEGORY_ENDPOINT).await?;
    let mut categories = serde_json::from_value::<TriviaCategories>(body)?.trivia_categories;

    categories.push(Category::any());
    categories.sort_by_key(|category| category.id);

    Ok(categories)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryState {
    pub progress: Progress,
    pub categories: Vec<Category>,
}

#[derive(Default)]
struct Inner {
    state: CategoryState,
    generation: u64,
}

/// Fetch lifecycle of the category directory, shared by every quiz session.
pub struct CategoryStore {
    api: Arc<dyn TriviaApi>,
    inner: Mutex<Inner>,
}

impl CategoryStore {
    pub fn new(api: Arc<dyn TriviaApi>) -> Self {
        Self {
            api,
            inner: Mutex::new(Inner::default()),
        }
    }

    pub async fn progress(&self) -> Progress {
        self.inner.lock().await.state.progress
    }

    pub async fn categories(&self) -> Vec<Category> {
        self.inner.lock().await.state.categories.clone()
    }

    pub async fn find_by_name(&self, name: &str) -> Option<Category> {
        self.inner
            .lock()
            .await
            .state
            .categories
            .iter()
            .find(|category| category.name == name)
            .cloned()
    }

    /// Loads the directory unless a load is in flight or has already succeeded.
    pub async fn fetch(&self) -> FetchOutcome {
        let generation = {
            let mut inner = self.inner.lock().await;
            if !inner.state.progress.allows_category_fetch() {
                debug!(
                    "Category fetch suppressed while {:?}",
                    inner.state.progress
                );
                return FetchOutcome::Suppressed;
            }
            inner.state.progress = Progress::Pending;
            inner.generation += 1;
            inner.generation
        };

        let result = load(self.api.as_ref()).await;

        let mut inner = self.inner.lock().await;
        if inner.generation != generation {
            info!("Discarding stale category response");
            return FetchOutcome::Stale;
        }

        match result {
            Ok(categories) => {
                info!("Loaded {} categories", categories.len());
                inner.state.categories = categories;
                inner.state.progress = Progress::Success;
            }
            Err(err) => {
                warn!("Failed to load categories: {}", err);
                inner.state.progress = Progress::Error;
            }
        }

        FetchOutcome::Finished(inner.state.progress)
    }

    pub async fn reset(&self) {
        let mut inner = self.inner.lock().await;
        inner.state = CategoryState::default();
        inner.generation += 1;
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::quiz::api::mock::MockApi;

    fn body() -> serde_json::Value {
        json!({
            "trivia_categories": [
                { "id": 11, "name": "Entertainment: Film" },
                { "id": 9, "name": "General Knowledge" },
                { "id": 23, "name": "History" }
            ]
        })
    }

    #[tokio::test]
    async fn load_adds_sentinel_and_sorts_by_id() {
        let api = MockApi::ok(body());

        let categories = load(&api).await.unwrap();

        assert_eq!(api.requests(), vec!["api_category.php".to_string()]);
        assert_eq!(categories.len(), 4);
        assert_eq!(categories[0], Category::any());
        let ids: Vec<u32> = categories.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![0, 9, 11, 23]);
        assert_eq!(categories.iter().filter(|c| c.is_any()).count(), 1);
    }

    #[tokio::test]
    async fn load_of_empty_directory_still_has_sentinel() {
        let api = MockApi::ok(json!({ "trivia_categories": [] }));
        assert_eq!(load(&api).await.unwrap(), vec![Category::any()]);
    }

    #[tokio::test]
    async fn load_rejects_unexpected_shape() {
        let api = MockApi::ok(json!({ "categories": [] }));
        assert!(matches!(
            load(&api).await,
            Err(TriviaError::MalformedResponse(_))
        ));
    }

    #[tokio::test]
    async fn successful_fetch_is_not_reissued() {
        let api = Arc::new(MockApi::ok(body()));
        let store = CategoryStore::new(api.clone());

        assert_eq!(store.fetch().await, FetchOutcome::Finished(Progress::Success));
        assert_eq!(store.categories().await.len(), 4);

        assert_eq!(store.fetch().await, FetchOutcome::Suppressed);
        assert_eq!(api.calls(), 1);
    }

    #[tokio::test]
    async fn failed_fetch_can_be_retried() {
        let api = Arc::new(MockApi::err(TriviaError::Network("offline".to_string())));
        let store = CategoryStore::new(api.clone());

        assert_eq!(store.fetch().await, FetchOutcome::Finished(Progress::Error));
        assert!(store.categories().await.is_empty());

        assert_eq!(store.fetch().await, FetchOutcome::Finished(Progress::Error));
        assert_eq!(api.calls(), 2);
    }

    #[tokio::test]
    async fn pending_fetch_is_not_duplicated() {
        let (api, gate) = MockApi::ok(body()).gated();
        let api = Arc::new(api);
        let store = Arc::new(CategoryStore::new(api.clone()));

        let in_flight = tokio::spawn({
            let store = store.clone();
            async move { store.fetch().await }
        });
        while store.progress().await != Progress::Pending {
            tokio::task::yield_now().await;
        }

        assert_eq!(store.fetch().await, FetchOutcome::Suppressed);
        assert_eq!(store.fetch().await, FetchOutcome::Suppressed);

        gate.notify_one();
        assert_eq!(
            in_flight.await.unwrap(),
            FetchOutcome::Finished(Progress::Success)
        );
        assert_eq!(api.calls(), 1);
    }

    #[tokio::test]
    async fn response_after_reset_is_discarded() {
        let (api, gate) = MockApi::ok(body()).gated();
        let store = Arc::new(CategoryStore::new(Arc::new(api)));

        let in_flight = tokio::spawn({
            let store = store.clone();
            async move { store.fetch().await }
        });
        while store.progress().await != Progress::Pending {
            tokio::task::yield_now().await;
        }

        store.reset().await;
        gate.notify_one();

        assert_eq!(in_flight.await.unwrap(), FetchOutcome::Stale);
        assert_eq!(store.progress().await, Progress::Idle);
        assert!(store.categories().await.is_empty());
    }

    #[tokio::test]
    async fn reset_allows_a_new_fetch() {
        let api = Arc::new(MockApi::ok(body()));
        let store = CategoryStore::new(api.clone());

        store.fetch().await;
        store.reset().await;
        assert_eq!(store.progress().await, Progress::Idle);
        assert!(store.categories().await.is_empty());

        assert_eq!(store.fetch().await, FetchOutcome::Finished(Progress::Success));
        assert_eq!(api.calls(), 2);
        assert_eq!(
            store.find_by_name("History").await,
            Some(Category::new(23, "History"))
        );
    }
}
