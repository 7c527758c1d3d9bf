//! Route manifest for timed regeneration
//!
//! Records when each generated route was last built and how long it stays
//! fresh, so the server can rebuild pages once their revalidation window
//! has passed.

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Cache directory, relative to the site base dir
pub const CACHE_DIR: &str = ".spacetraveling-cache";

/// Manifest file name inside [`CACHE_DIR`]
const MANIFEST_FILE: &str = "routes.json";

/// One generated route
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteEntry {
    /// When the page was last written
    pub generated_at: DateTime<Utc>,
    /// Output path relative to the public dir
    pub output_path: String,
    /// Seconds the page stays fresh
    pub revalidate_secs: u64,
}

impl RouteEntry {
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        // Windows beyond what a TimeDelta can hold never expire
        let window = i64::try_from(self.revalidate_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .unwrap_or(Duration::MAX);
        now.signed_duration_since(self.generated_at) >= window
    }
}

/// Generated routes keyed by URL path (`/`, `/post/my-post/`)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RouteManifest {
    /// Version of the manifest format
    pub version: u32,
    pub routes: BTreeMap<String, RouteEntry>,
}

impl RouteManifest {
    /// Current manifest format version
    const VERSION: u32 = 1;

    /// Load the manifest from disk, or start empty
    pub fn load(base_dir: &Path) -> Self {
        let path = base_dir.join(CACHE_DIR).join(MANIFEST_FILE);
        if let Ok(content) = fs::read_to_string(&path) {
            match serde_json::from_str::<RouteManifest>(&content) {
                Ok(manifest) if manifest.version == Self::VERSION => return manifest,
                Ok(_) => tracing::info!("Route manifest version mismatch, starting fresh"),
                Err(e) => tracing::warn!("Ignoring unreadable route manifest: {}", e),
            }
        }
        Self::new()
    }

    /// Save the manifest to disk
    pub fn save(&self, base_dir: &Path) -> Result<()> {
        let cache_dir = base_dir.join(CACHE_DIR);
        fs::create_dir_all(&cache_dir)?;

        let content = serde_json::to_string_pretty(self)?;
        fs::write(cache_dir.join(MANIFEST_FILE), content)?;
        Ok(())
    }

    pub fn new() -> Self {
        Self {
            version: Self::VERSION,
            ..Default::default()
        }
    }

    /// Record a freshly generated route
    pub fn record(
        &mut self,
        route: &str,
        output_path: &str,
        revalidate_secs: u64,
        now: DateTime<Utc>,
    ) {
        self.routes.insert(
            route.to_string(),
            RouteEntry {
                generated_at: now,
                output_path: output_path.to_string(),
                revalidate_secs,
            },
        );
    }

    pub fn get(&self, route: &str) -> Option<&RouteEntry> {
        self.routes.get(route)
    }

    pub fn remove(&mut self, route: &str) -> Option<RouteEntry> {
        self.routes.remove(route)
    }

    /// Unknown routes count as stale
    pub fn is_stale(&self, route: &str, now: DateTime<Utc>) -> bool {
        self.get(route).map_or(true, |entry| entry.is_stale(now))
    }
}
