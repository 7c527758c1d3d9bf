//! Site configuration (_config.yml)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Environment variable overriding `api_endpoint`
pub const ENV_API_ENDPOINT: &str = "SPACETRAVELING_API_ENDPOINT";
/// Environment variable overriding `access_token`
pub const ENV_ACCESS_TOKEN: &str = "SPACETRAVELING_ACCESS_TOKEN";

/// Main site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    // Site
    pub title: String,
    pub logo: String,

    // URL
    pub url: String,
    pub root: String,

    // Directory
    pub public_dir: String,
    pub static_dir: String,

    // Content API
    pub api_endpoint: String,
    pub access_token: Option<String>,
    pub document_type: String,
    pub request_timeout_secs: u64,

    // Listing
    pub page_size: usize,
    pub dedup_by_uid: bool,

    // Date format
    pub date_format: String,
    pub locale: String,
    pub timezone: String,

    #[serde(default)]
    pub revalidate: RevalidateConfig,
    #[serde(default)]
    pub labels: LabelsConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "Spacetraveling".to_string(),
            logo: "/images/logo.svg".to_string(),

            url: "http://localhost:4000".to_string(),
            root: "/".to_string(),

            public_dir: "public".to_string(),
            static_dir: "static".to_string(),

            api_endpoint: String::new(),
            access_token: None,
            document_type: "post".to_string(),
            request_timeout_secs: 30,

            page_size: 2,
            dedup_by_uid: false,

            date_format: "DD MMM YYYY".to_string(),
            locale: "pt_BR".to_string(),
            timezone: "UTC".to_string(),

            revalidate: RevalidateConfig::default(),
            labels: LabelsConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read {:?}", path.as_ref()))?;
        let config: SiteConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Apply endpoint and credentials from the environment
    pub fn apply_env(&mut self) {
        self.apply_overrides(
            std::env::var(ENV_API_ENDPOINT).ok(),
            std::env::var(ENV_ACCESS_TOKEN).ok(),
        );
    }

    fn apply_overrides(&mut self, endpoint: Option<String>, token: Option<String>) {
        if let Some(endpoint) = endpoint.filter(|e| !e.trim().is_empty()) {
            tracing::debug!("Using API endpoint from {}", ENV_API_ENDPOINT);
            self.api_endpoint = endpoint;
        }
        if let Some(token) = token.filter(|t| !t.trim().is_empty()) {
            self.access_token = Some(token);
        }
    }

    /// Timeout applied to every outbound request
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// Resolve the configured timezone, falling back to UTC
    pub fn tz(&self) -> chrono_tz::Tz {
        match self.timezone.parse::<chrono_tz::Tz>() {
            Ok(tz) => tz,
            Err(_) => {
                if !self.timezone.is_empty() {
                    tracing::warn!("Unknown timezone {:?}, using UTC", self.timezone);
                }
                chrono_tz::UTC
            }
        }
    }
}

/// Revalidation intervals handed to the page builders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RevalidateConfig {
    /// Listing page, 24 hours
    pub listing_secs: u64,
    /// Post pages, 7 days
    pub post_secs: u64,
}

impl Default for RevalidateConfig {
    fn default() -> Self {
        Self {
            listing_secs: 60 * 60 * 24,
            post_secs: 60 * 60 * 24 * 7,
        }
    }
}

/// User-facing strings rendered by the templates
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelsConfig {
    pub load_more: String,
    pub loading: String,
    pub not_found: String,
    pub load_error: String,
    pub read_time_suffix: String,
}

impl Default for LabelsConfig {
    fn default() -> Self {
        Self {
            load_more: "Carregar mais posts".to_string(),
            loading: "Carregando...".to_string(),
            not_found: "Post não encontrado".to_string(),
            load_error: "Não foi possível carregar mais posts.".to_string(),
            read_time_suffix: "min".to_string(),
        }
    }
}
