//! spacetraveling: a blog front-end over a headless content API
//!
//! Posts are fetched from a Prismic repository, normalized into plain
//! records and rendered to static HTML with Tera templates. The preview
//! server regenerates pages once their revalidation window has passed.

pub mod cache;
pub mod client;
pub mod commands;
pub mod config;
pub mod content;
pub mod error;
pub mod generator;
pub mod helpers;
pub mod listing;
pub mod server;
pub mod templates;

use anyhow::Result;
use std::path::Path;

/// The main application: a site directory and its configuration
#[derive(Debug, Clone)]
pub struct Site {
    /// Site configuration
    pub config: config::SiteConfig,
    /// Base directory
    pub base_dir: std::path::PathBuf,
    /// Public (output) directory
    pub public_dir: std::path::PathBuf,
    /// Static assets copied verbatim into the output
    pub static_dir: std::path::PathBuf,
}

impl Site {
    /// Load a site from a directory
    ///
    /// Reads `_config.yml` when present, then applies the environment
    /// overrides for the API endpoint and access token.
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let base_dir = base_dir.as_ref();
        let config_path = base_dir.join("_config.yml");

        let mut config = if config_path.exists() {
            config::SiteConfig::load(&config_path)?
        } else {
            config::SiteConfig::default()
        };
        config.apply_env();

        Ok(Self::with_config(base_dir, config))
    }

    /// Build a site from an already loaded configuration
    pub fn with_config<P: AsRef<Path>>(base_dir: P, config: config::SiteConfig) -> Self {
        let base_dir = base_dir.as_ref().to_path_buf();
        let public_dir = base_dir.join(&config.public_dir);
        let static_dir = base_dir.join(&config.static_dir);

        Self {
            config,
            base_dir,
            public_dir,
            static_dir,
        }
    }

    /// Client for the configured content repository
    pub fn client(&self) -> Result<client::PrismicClient> {
        Ok(client::PrismicClient::from_config(&self.config)?)
    }

    /// Initialize a new site
    pub fn init(&self) -> Result<()> {
        commands::init::init_site(&self.base_dir)
    }

    /// Generate the static site
    pub async fn generate(&self) -> Result<()> {
        commands::generate::run(self, None).await
    }

    /// Clean the public directory and route cache
    pub fn clean(&self) -> Result<()> {
        commands::clean::run(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_site_paths() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("_config.yml"),
            "title: Blog\npublic_dir: out\napi_endpoint: https://repo.cdn.prismic.io/api/v2\n",
        )
        .unwrap();

        let site = Site::new(dir.path()).unwrap();
        assert_eq!(site.config.title, "Blog");
        assert_eq!(site.public_dir, dir.path().join("out"));
        assert_eq!(site.static_dir, dir.path().join("static"));
    }

    #[test]
    fn test_site_without_config() {
        let dir = tempfile::tempdir().unwrap();
        let site = Site::with_config(dir.path(), config::SiteConfig::default());
        assert_eq!(site.config.page_size, 2);
        assert!(site.client().is_err());
    }
}
