//! Listing page pagination
//!
//! [`ListingFlow`] owns the posts shown on the listing page and the cursor
//! to the next page. It is `Idle` while it has data and nothing in flight,
//! and `Fetching` while a next-page request runs. Only one request may be
//! in flight; triggers during `Fetching`, or once the cursor is gone, are
//! ignored.

mod view;

pub use view::ListingView;

use crate::client::{ContentApi, RawPage};
use crate::content::{normalize_page, PaginatedPosts};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingState {
    Idle,
    Fetching,
}

/// Ticket for one in-flight next-page request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NextPageRequest {
    /// Cursor URL to fetch, exactly as the API returned it
    pub cursor: String,
    ticket: u64,
}

/// What happened to a finished request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The page was appended
    Applied { appended: usize },
    /// The request failed; posts and cursor are untouched and the
    /// error is available through [`ListingFlow::last_error`]
    Failed,
    /// The response arrived for a disposed flow or a superseded request
    Discarded,
}

#[derive(Debug)]
pub struct ListingFlow {
    posts: PaginatedPosts,
    state: ListingState,
    ticket: u64,
    last_error: Option<Error>,
    dedup_by_uid: bool,
    disposed: bool,
}

impl ListingFlow {
    /// Start `Idle` with the first page rendered by the generator
    pub fn new(initial: PaginatedPosts) -> Self {
        Self {
            posts: initial,
            state: ListingState::Idle,
            ticket: 0,
            last_error: None,
            dedup_by_uid: false,
            disposed: false,
        }
    }

    /// Drop posts whose uid was already listed when appending
    pub fn with_dedup(mut self, dedup_by_uid: bool) -> Self {
        self.dedup_by_uid = dedup_by_uid;
        self
    }

    pub fn posts(&self) -> &PaginatedPosts {
        &self.posts
    }

    pub fn state(&self) -> ListingState {
        self.state
    }

    pub fn is_loading(&self) -> bool {
        self.state == ListingState::Fetching
    }

    /// Whether the "load more" control should be shown at all
    pub fn has_more(&self) -> bool {
        self.posts.has_next_page()
    }

    /// Whether a trigger right now would start a request
    pub fn can_load_more(&self) -> bool {
        !self.disposed && self.state == ListingState::Idle && self.posts.has_next_page()
    }

    /// Error from the last failed request, cleared when a new one starts
    pub fn last_error(&self) -> Option<&Error> {
        self.last_error.as_ref()
    }

    /// `Idle` → `Fetching`; `None` when the trigger must be ignored
    pub fn begin_next_page(&mut self) -> Option<NextPageRequest> {
        if !self.can_load_more() {
            return None;
        }
        let cursor = self.posts.next_page.clone()?;

        self.state = ListingState::Fetching;
        self.ticket += 1;
        self.last_error = None;
        tracing::debug!("Fetching next page: {}", cursor);

        Some(NextPageRequest {
            cursor,
            ticket: self.ticket,
        })
    }

    /// `Fetching` → `Idle`, applying the outcome of `request`
    pub fn complete(&mut self, request: &NextPageRequest, result: Result<RawPage>) -> Completion {
        if self.disposed || self.state != ListingState::Fetching || request.ticket != self.ticket {
            tracing::debug!("Discarding stale response for {}", request.cursor);
            return Completion::Discarded;
        }

        self.state = ListingState::Idle;

        match result.and_then(|page| normalize_page(&page)) {
            Ok(page) => {
                let appended = self.posts.append(page, self.dedup_by_uid);
                tracing::debug!(
                    "Appended {} posts ({} total, more: {})",
                    appended,
                    self.posts.results.len(),
                    self.posts.has_next_page()
                );
                Completion::Applied { appended }
            }
            Err(e) => {
                tracing::warn!("Failed to load next page: {}", e);
                self.last_error = Some(e);
                Completion::Failed
            }
        }
    }

    /// Detach the flow from its page; later completions are dropped
    pub fn dispose(&mut self) {
        self.disposed = true;
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Run one next-page request to completion
    ///
    /// Returns `None` when the trigger was ignored.
    pub async fn load_next_page<C: ContentApi>(&mut self, client: &C) -> Option<Completion> {
        let request = self.begin_next_page()?;
        let result = client.fetch_page_url(&request.cursor).await;
        Some(self.complete(&request, result))
    }
}
