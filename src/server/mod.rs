//! Preview server with on-demand page regeneration
//!
//! Pages are served from the public directory. A page whose revalidation
//! window has passed is still served as-is while a background task
//! rebuilds it. Post pages that were never generated get a placeholder
//! that refreshes itself until the background build settles, either into
//! the real page or into the not-found page.

use anyhow::Result;
use axum::{
    extract::{Path as UrlPath, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::client::ContentApi;
use crate::content::{post_path, PaginatedPosts};
use crate::error::Error;
use crate::generator::{
    is_not_found, is_valid_uid, post_route, route_file, Generator, LISTING_ROUTE,
};
use crate::helpers::url_for;
use crate::listing::{Completion, ListingFlow};
use crate::Site;

/// How long a failed on-demand build answers with the not-found page
const FAILED_RETRY: Duration = Duration::from_secs(60);

/// Upper bound on remembered uids per set
const MAX_REMEMBERED: usize = 1024;

/// Uids remembered for a fixed window
///
/// Expired entries are pruned on every insert, and the oldest entry is
/// evicted once [`MAX_REMEMBERED`] is reached.
#[derive(Debug)]
struct RecentUids {
    window: Duration,
    entries: HashMap<String, Instant>,
}

impl RecentUids {
    fn new(window: Duration) -> Self {
        Self {
            window,
            entries: HashMap::new(),
        }
    }

    fn contains(&mut self, uid: &str) -> bool {
        match self.entries.get(uid) {
            Some(since) if since.elapsed() < self.window => true,
            Some(_) => {
                self.entries.remove(uid);
                false
            }
            None => false,
        }
    }

    fn insert(&mut self, uid: String) {
        let window = self.window;
        self.entries.retain(|_, since| since.elapsed() < window);

        if self.entries.len() >= MAX_REMEMBERED {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|(_, since)| **since)
                .map(|(uid, _)| uid.clone());
            if let Some(oldest) = oldest {
                self.entries.remove(&oldest);
            }
        }

        self.entries.insert(uid, Instant::now());
    }

    fn remove(&mut self, uid: &str) {
        self.entries.remove(uid);
    }
}

/// Server state
pub struct AppState<C> {
    generator: Generator<C>,
    public_dir: PathBuf,
    /// Routes with a rebuild in flight
    pending: Mutex<HashSet<String>>,
    /// Uids the store reported as missing
    missing: Mutex<RecentUids>,
    /// Uids whose on-demand build failed for another reason
    failed: Mutex<RecentUids>,
}

impl<C: ContentApi + 'static> AppState<C> {
    pub fn new(generator: Generator<C>) -> Self {
        let missing_window =
            Duration::from_secs(generator.config().revalidate.post_secs.max(1));
        Self {
            public_dir: generator.site().public_dir.clone(),
            generator,
            pending: Mutex::new(HashSet::new()),
            missing: Mutex::new(RecentUids::new(missing_window)),
            failed: Mutex::new(RecentUids::new(FAILED_RETRY)),
        }
    }

    pub fn generator(&self) -> &Generator<C> {
        &self.generator
    }

    /// Whether a rebuild is running for `route`
    pub fn is_pending(&self, route: &str) -> bool {
        lock(&self.pending).contains(route)
    }

    /// Whether the store recently said `uid` does not exist
    fn is_missing(&self, uid: &str) -> bool {
        lock(&self.missing).contains(uid)
    }

    /// Whether the last on-demand build of `uid` failed recently
    fn has_failed(&self, uid: &str) -> bool {
        lock(&self.failed).contains(uid)
    }

    /// Rebuild the listing page in the background
    fn revalidate_listing(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        let state = self.clone();
        self.spawn_once(LISTING_ROUTE.to_string(), async move {
            if let Err(e) = state.generator.build_listing_page().await {
                tracing::warn!("Keeping stale listing page: {:#}", e);
            }
        })
    }

    /// Rebuild a post page in the background
    fn revalidate_post(self: &Arc<Self>, uid: &str) -> Option<JoinHandle<()>> {
        let state = self.clone();
        let uid = uid.to_string();
        self.spawn_once(post_route(&uid), async move {
            match state.generator.build_post_page(&uid).await {
                Ok(_) => {
                    lock(&state.missing).remove(&uid);
                    lock(&state.failed).remove(&uid);
                }
                Err(e) if is_not_found(&e) => {
                    tracing::info!("Post {} does not exist", uid);
                    if let Err(e) = state.generator.remove_post_page(&uid) {
                        tracing::warn!("Failed to remove page of {}: {:#}", uid, e);
                    }
                    lock(&state.missing).insert(uid);
                }
                Err(e) => {
                    tracing::warn!("Failed to rebuild post {}: {:#}", uid, e);
                    lock(&state.failed).insert(uid);
                }
            }
        })
    }

    /// Spawn `task` unless a rebuild of `route` is already running
    fn spawn_once<F>(self: &Arc<Self>, route: String, task: F) -> Option<JoinHandle<()>>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        if !lock(&self.pending).insert(route.clone()) {
            return None;
        }
        tracing::debug!("Regenerating {}", route);

        let state = self.clone();
        Some(tokio::spawn(async move {
            task.await;
            lock(&state.pending).remove(&route);
        }))
    }

    fn html_page(&self, status: StatusCode, render: Result<String>) -> Response {
        match render {
            Ok(html) => (status, Html(html)).into_response(),
            Err(e) => {
                tracing::error!("Failed to render page: {:#}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Server error").into_response()
            }
        }
    }

    fn not_found_page(&self) -> Response {
        self.html_page(StatusCode::NOT_FOUND, self.generator.render_not_found())
    }
}

/// Build the router over `state`
pub fn router<C: ContentApi + 'static>(state: Arc<AppState<C>>) -> Router {
    let public_dir = state.public_dir.clone();
    let root = state.generator.config().root.trim_end_matches('/').to_string();
    let app = Router::new()
        .route("/", get(index_handler::<C>))
        .route("/post/:uid", get(post_redirect::<C>))
        .route("/post/:uid/", get(post_handler::<C>))
        .route("/posts/more", get(more_handler::<C>))
        .fallback_service(ServeDir::new(public_dir).append_index_html_on_directories(true))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    if root.is_empty() {
        app
    } else {
        Router::new().nest(&root, app)
    }
}

/// Start the preview server
pub async fn start<C: ContentApi + 'static>(
    site: &Site,
    generator: Generator<C>,
    ip: &str,
    port: u16,
    open: bool,
) -> Result<()> {
    let app = router(Arc::new(AppState::new(generator)));

    // Parse address - handle "localhost" specially
    let bind_ip = if ip == "localhost" { "127.0.0.1" } else { ip };
    let addr: SocketAddr = format!("{}:{}", bind_ip, port).parse()?;

    let url = format!("http://{}:{}{}", ip, port, site.config.root);
    println!("Server running at {}", url);
    println!("Press Ctrl+C to stop.");

    if open {
        if let Err(e) = open_browser(&url) {
            tracing::warn!("Failed to open browser: {}", e);
        }
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn index_handler<C: ContentApi + 'static>(
    State(state): State<Arc<AppState<C>>>,
) -> Response {
    let path = route_file(&state.public_dir, LISTING_ROUTE);

    if !path.exists() {
        // Nothing to serve yet; build in the request
        if let Err(e) = state.generator.build_listing_page().await {
            tracing::error!("Failed to build listing page: {:#}", e);
            return (StatusCode::BAD_GATEWAY, "Failed to build listing page").into_response();
        }
    } else if state.generator.is_stale(LISTING_ROUTE) {
        state.revalidate_listing();
    }

    serve_file(path).await
}

async fn post_redirect<C: ContentApi + 'static>(
    State(state): State<Arc<AppState<C>>>,
    UrlPath(uid): UrlPath<String>,
) -> Redirect {
    Redirect::permanent(&url_for(state.generator.config(), &post_path(&uid)))
}

async fn post_handler<C: ContentApi + 'static>(
    State(state): State<Arc<AppState<C>>>,
    UrlPath(uid): UrlPath<String>,
) -> Response {
    if !is_valid_uid(&uid) || state.is_missing(&uid) {
        return state.not_found_page();
    }

    let route = post_route(&uid);
    let path = route_file(&state.public_dir, &route);

    if path.exists() {
        if state.generator.is_stale(&route) {
            state.revalidate_post(&uid);
        }
        return serve_file(path).await;
    }

    // Nothing generated and the last attempt failed: stop the refresh loop
    if state.has_failed(&uid) {
        return state.not_found_page();
    }

    state.revalidate_post(&uid);
    state.html_page(StatusCode::OK, state.generator.render_fallback())
}

#[derive(Debug, Deserialize)]
struct MoreQuery {
    cursor: Option<String>,
}

/// Next page of the listing as an HTML fragment
async fn more_handler<C: ContentApi + 'static>(
    State(state): State<Arc<AppState<C>>>,
    Query(query): Query<MoreQuery>,
) -> Response {
    let generator = &state.generator;
    let Some(cursor) = query.cursor.filter(|c| !c.is_empty()) else {
        return state.html_page(
            StatusCode::BAD_REQUEST,
            generator.render_load_error("missing cursor"),
        );
    };

    let mut flow = ListingFlow::new(PaginatedPosts {
        next_page: Some(cursor),
        results: Vec::new(),
    })
    .with_dedup(generator.config().dedup_by_uid);

    match flow.load_next_page(generator.client()).await {
        Some(Completion::Applied { .. }) => {
            let posts = flow.posts();
            state.html_page(
                StatusCode::OK,
                generator.render_more(&posts.results, posts.next_page.as_deref()),
            )
        }
        _ => {
            let status = match flow.last_error() {
                Some(Error::InvalidCursor(_)) => StatusCode::BAD_REQUEST,
                _ => StatusCode::BAD_GATEWAY,
            };
            let message = &generator.config().labels.load_error;
            state.html_page(status, generator.render_load_error(message))
        }
    }
}

async fn serve_file(path: PathBuf) -> Response {
    match tokio::fs::read_to_string(&path).await {
        Ok(content) => Html(content).into_response(),
        Err(e) => {
            tracing::warn!("Failed to read {:?}: {}", path, e);
            (StatusCode::NOT_FOUND, "Not found").into_response()
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Open a URL in the default browser
fn open_browser(url: &str) -> Result<()> {
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open").arg(url).spawn()?;
    }

    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open").arg(url).spawn()?;
    }

    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/c", "start", url])
            .spawn()?;
    }

    Ok(())
}
