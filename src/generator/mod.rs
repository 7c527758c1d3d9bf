//! Generator module - builds the listing and post pages from the content API
//!
//! The generator holds no global state: revalidation windows are handed in
//! through [`RevalidateConfig`] and every written route is recorded in the
//! [`RouteManifest`] so the server can tell when it has gone stale.

use anyhow::{Context as _, Result};
use std::fs;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use tera::Context;
use walkdir::WalkDir;

use crate::cache::RouteManifest;
use crate::client::{ContentApi, PageQuery, Predicate};
use crate::config::{RevalidateConfig, SiteConfig};
use crate::content::{
    normalize_page, normalize_post_detail, post_path, PaginatedPosts, Post, PostDetail,
};
use crate::error::Error;
use crate::helpers::{html_escape, DateFormatter};
use crate::templates::{ConfigData, LoadMoreData, PostData, PostPageData, TemplateRenderer};
use crate::Site;

/// Route of the listing page
pub const LISTING_ROUTE: &str = "/";

/// Route of the post page for `uid`
pub fn post_route(uid: &str) -> String {
    format!("/{}", post_path(uid))
}

/// Slugs that are safe to use as a directory name
pub fn is_valid_uid(uid: &str) -> bool {
    !uid.is_empty()
        && uid.len() <= 200
        && uid
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Summary of a full build
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    /// Posts on the first listing page
    pub listed: usize,
    /// Post pages written
    pub posts: usize,
    /// Identifiers that were skipped
    pub skipped: Vec<String>,
    /// Static files copied
    pub assets: usize,
}

/// Page builder backed by a content API
pub struct Generator<C> {
    site: Site,
    client: C,
    renderer: TemplateRenderer,
    config_data: ConfigData,
    dates: DateFormatter,
    revalidate: RevalidateConfig,
    manifest: Mutex<RouteManifest>,
}

impl<C: ContentApi> Generator<C> {
    /// Create a new generator
    pub fn new(site: &Site, client: C) -> Result<Self> {
        Ok(Self {
            site: site.clone(),
            client,
            renderer: TemplateRenderer::new()?,
            config_data: ConfigData::from_config(&site.config),
            dates: DateFormatter::from_config(&site.config),
            revalidate: site.config.revalidate,
            manifest: Mutex::new(RouteManifest::load(&site.base_dir)),
        })
    }

    /// Override the revalidation windows from the site config
    pub fn with_revalidate(mut self, revalidate: RevalidateConfig) -> Self {
        self.revalidate = revalidate;
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn config(&self) -> &SiteConfig {
        &self.site.config
    }

    pub fn site(&self) -> &Site {
        &self.site
    }

    /// Whether `route` was never built or its window has passed
    pub fn is_stale(&self, route: &str) -> bool {
        self.manifest().is_stale(route, chrono::Utc::now())
    }

    /// Generate the entire site
    pub async fn build_all(&self) -> Result<BuildReport> {
        fs::create_dir_all(&self.site.public_dir)?;

        let mut report = BuildReport {
            assets: self.copy_static_assets()?,
            ..Default::default()
        };

        report.listed = self.build_listing_page().await?.results.len();

        let predicate = Predicate::document_type(&self.config().document_type);
        let uids = self
            .client
            .fetch_all_uids(&predicate)
            .await
            .context("Failed to list post identifiers")?;
        tracing::info!("Found {} posts", uids.len());

        for uid in uids {
            if !is_valid_uid(&uid) {
                tracing::warn!("Skipping post with unusable uid {:?}", uid);
                report.skipped.push(uid);
                continue;
            }
            match self.build_post_page(&uid).await {
                Ok(_) => report.posts += 1,
                Err(e) if is_not_found(&e) => {
                    tracing::warn!("Post {} disappeared during the build, skipping", uid);
                    report.skipped.push(uid);
                }
                Err(e) => return Err(e),
            }
        }

        let not_found = self.render_not_found()?;
        fs::write(self.site.public_dir.join("404.html"), not_found)?;

        Ok(report)
    }

    /// Fetch the first page of posts and write the listing page
    pub async fn build_listing_page(&self) -> Result<PaginatedPosts> {
        let config = self.config();
        let query = PageQuery::listing(&config.document_type, config.page_size);

        let page = self
            .client
            .fetch_posts_page(&query)
            .await
            .context("Failed to fetch the first page of posts")?;
        let posts = normalize_page(&page).context("Failed to read the first page of posts")?;

        let html = self.render_listing(&posts)?;
        self.write_route(
            LISTING_ROUTE,
            "index.html",
            &html,
            self.revalidate.listing_secs,
        )?;
        tracing::info!(
            "Generated listing page with {} posts (more: {})",
            posts.results.len(),
            posts.has_next_page()
        );

        Ok(posts)
    }

    /// Fetch one post and write its page
    pub async fn build_post_page(&self, uid: &str) -> Result<PostDetail> {
        let route = post_route(uid);
        if !is_valid_uid(uid) {
            return Err(Error::NotFound(uid.to_string()).into());
        }

        let doc = self
            .client
            .fetch_post_by_uid(uid)
            .await
            .with_context(|| format!("Failed to fetch {}", route))?;
        let detail =
            normalize_post_detail(&doc).with_context(|| format!("Failed to read {}", route))?;

        let html = self.render_post(&detail)?;
        let output = format!("{}index.html", post_path(uid));
        self.write_route(&route, &output, &html, self.revalidate.post_secs)?;

        Ok(detail)
    }

    /// Delete a post page whose document no longer exists
    pub fn remove_post_page(&self, uid: &str) -> Result<()> {
        let route = post_route(uid);
        let mut manifest = self.manifest();
        if let Some(entry) = manifest.remove(&route) {
            let path = self.site.public_dir.join(&entry.output_path);
            if path.exists() {
                fs::remove_file(&path)?;
            }
            manifest.save(&self.site.base_dir)?;
            tracing::info!("Removed {}", route);
        }
        Ok(())
    }

    pub fn render_listing(&self, posts: &PaginatedPosts) -> Result<String> {
        let mut context = TemplateRenderer::base_context(&self.config_data);
        context.insert("posts", &self.post_data(&posts.results));
        context.insert(
            "load_more",
            &posts
                .next_page
                .as_deref()
                .map(|cursor| LoadMoreData::new(self.config(), cursor)),
        );
        self.renderer.render("index.html", &context)
    }

    pub fn render_post(&self, detail: &PostDetail) -> Result<String> {
        let mut context = TemplateRenderer::base_context(&self.config_data);
        context.insert("post", &PostPageData::new(detail, &self.dates));
        self.renderer.render("post.html", &context)
    }

    /// Fragment appended to the listing by the "load more" control
    pub fn render_more(&self, posts: &[Post], next_page: Option<&str>) -> Result<String> {
        let mut context = Context::new();
        context.insert("posts", &self.post_data(posts));
        let next = next_page.map(|cursor| LoadMoreData::new(self.config(), cursor));
        context.insert("next_url", &next.as_ref().map(|n| n.url.as_str()).unwrap_or_default());
        context.insert(
            "next_cursor",
            &next.as_ref().map(|n| n.cursor.as_str()).unwrap_or_default(),
        );
        self.renderer.render("more.html", &context)
    }

    pub fn render_load_error(&self, message: &str) -> Result<String> {
        let mut context = Context::new();
        context.insert("message", &html_escape(message));
        self.renderer.render("load_error.html", &context)
    }

    /// Placeholder shown while a post page is built on demand
    pub fn render_fallback(&self) -> Result<String> {
        let context = TemplateRenderer::base_context(&self.config_data);
        self.renderer.render("fallback.html", &context)
    }

    pub fn render_not_found(&self) -> Result<String> {
        let context = TemplateRenderer::base_context(&self.config_data);
        self.renderer.render("not_found.html", &context)
    }

    fn post_data(&self, posts: &[Post]) -> Vec<PostData> {
        posts
            .iter()
            .map(|post| PostData::new(post, self.config(), &self.dates))
            .collect()
    }

    fn manifest(&self) -> MutexGuard<'_, RouteManifest> {
        self.manifest
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Write a page and record it in the manifest
    fn write_route(&self, route: &str, output: &str, html: &str, revalidate_secs: u64) -> Result<()> {
        let output_path = self.site.public_dir.join(output);
        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&output_path, html)
            .with_context(|| format!("Failed to write {:?}", output_path))?;
        tracing::debug!("Generated: {:?}", output_path);

        let mut manifest = self.manifest();
        manifest.record(route, output, revalidate_secs, chrono::Utc::now());
        manifest.save(&self.site.base_dir)?;
        Ok(())
    }

    /// Copy static assets (logo, images, ...) to the public directory
    fn copy_static_assets(&self) -> Result<usize> {
        let static_dir = &self.site.static_dir;
        if !static_dir.exists() {
            return Ok(0);
        }

        let mut copied = 0;
        for entry in WalkDir::new(static_dir)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }

            let relative = path.strip_prefix(static_dir)?;
            let dest = self.site.public_dir.join(relative);
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(path, &dest)?;
            copied += 1;
        }

        tracing::debug!("Copied {} static files from {:?}", copied, static_dir);
        Ok(copied)
    }
}

/// Whether an error chain bottoms out in [`Error::NotFound`]
pub fn is_not_found(err: &anyhow::Error) -> bool {
    err.chain()
        .any(|cause| cause.downcast_ref::<Error>().is_some_and(Error::is_not_found))
}

/// Output file of a route inside the public directory
pub fn route_file(public_dir: &Path, route: &str) -> std::path::PathBuf {
    public_dir
        .join(route.trim_start_matches('/'))
        .join("index.html")
}
