//! Shared handle to a listing flow for interactive front-ends

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::task::JoinHandle;

use super::{Completion, ListingFlow};
use crate::client::ContentApi;

/// The listing as owned by one displayed page
///
/// Next-page requests run on the tokio runtime and only keep a weak
/// reference to the flow: once every clone of the view is dropped, or
/// [`ListingView::dispose`] is called, the response is thrown away.
#[derive(Debug, Clone)]
pub struct ListingView {
    inner: Arc<Mutex<ListingFlow>>,
}

impl ListingView {
    pub fn new(flow: ListingFlow) -> Self {
        Self {
            inner: Arc::new(Mutex::new(flow)),
        }
    }

    /// Read the current state
    pub fn read<R>(&self, f: impl FnOnce(&ListingFlow) -> R) -> R {
        f(&lock(&self.inner))
    }

    /// Start loading the next page in the background
    ///
    /// Returns `None` when a request is already in flight or there is no
    /// next page. The handle resolves once the response has been applied
    /// (or discarded).
    pub fn request_next_page<C>(&self, client: Arc<C>) -> Option<JoinHandle<Completion>>
    where
        C: ContentApi + 'static,
    {
        let request = lock(&self.inner).begin_next_page()?;
        let flow = Arc::downgrade(&self.inner);

        Some(tokio::spawn(async move {
            let result = client.fetch_page_url(&request.cursor).await;
            match flow.upgrade() {
                Some(flow) => {
                    let outcome = lock(&flow).complete(&request, result);
                    outcome
                }
                None => {
                    tracing::debug!("Listing closed, dropping page {}", request.cursor);
                    Completion::Discarded
                }
            }
        }))
    }

    /// Detach from the page; in-flight responses will be discarded
    pub fn dispose(&self) {
        lock(&self.inner).dispose();
    }
}

fn lock(flow: &Mutex<ListingFlow>) -> MutexGuard<'_, ListingFlow> {
    flow.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::testing::{raw_post, ScriptedApi};
    use crate::client::RawPage;
    use crate::content::normalize_page;
    use crate::listing::ListingState;
    use tokio::sync::Notify;

    const PAGE_2: &str = "https://api/x?page=2";

    fn view() -> ListingView {
        let first = normalize_page(&RawPage {
            next_page: Some(PAGE_2.to_string()),
            results: vec![raw_post("a", None), raw_post("b", None)],
            ..Default::default()
        })
        .unwrap();
        ListingView::new(ListingFlow::new(first))
    }

    fn gated_api(gate: Arc<Notify>) -> Arc<ScriptedApi> {
        Arc::new(
            ScriptedApi::new()
                .with_cursor(
                    PAGE_2,
                    Ok(RawPage {
                        results: vec![raw_post("c", None)],
                        ..Default::default()
                    }),
                )
                .with_gate(gate),
        )
    }

    #[tokio::test]
    async fn test_background_request_applies_result() {
        let gate = Arc::new(Notify::new());
        let api = gated_api(gate.clone());
        let view = view();

        let handle = view.request_next_page(api.clone()).unwrap();
        assert!(view.read(|f| f.is_loading()));
        assert!(view.request_next_page(api.clone()).is_none());

        gate.notify_one();
        assert_eq!(handle.await.unwrap(), Completion::Applied { appended: 1 });
        assert_eq!(view.read(|f| f.state()), ListingState::Idle);
        assert_eq!(view.read(|f| f.posts().results.len()), 3);
        assert!(!view.read(|f| f.has_more()));
        assert_eq!(api.page_calls(), 1);
    }

    #[tokio::test]
    async fn test_disposed_view_ignores_late_response() {
        let gate = Arc::new(Notify::new());
        let view = view();

        let handle = view.request_next_page(gated_api(gate.clone())).unwrap();
        view.dispose();
        gate.notify_one();

        assert_eq!(handle.await.unwrap(), Completion::Discarded);
        assert_eq!(view.read(|f| f.posts().results.len()), 2);
    }

    #[tokio::test]
    async fn test_dropped_view_ignores_late_response() {
        let gate = Arc::new(Notify::new());
        let view = view();

        let handle = view.request_next_page(gated_api(gate.clone())).unwrap();
        drop(view);
        gate.notify_one();

        assert_eq!(handle.await.unwrap(), Completion::Discarded);
    }
}
