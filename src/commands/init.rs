//! Initialize a new site

use anyhow::{bail, Result};
use std::fs;
use std::path::Path;

/// Initialize a new site in the given directory
pub fn init_site(target_dir: &Path) -> Result<()> {
    let config_path = target_dir.join("_config.yml");
    if config_path.exists() {
        bail!("{:?} already exists", config_path);
    }

    // Create directory structure
    fs::create_dir_all(target_dir)?;
    fs::create_dir_all(target_dir.join("static/images"))?;

    // Create default _config.yml
    let config_content = r#"# Spacetraveling Configuration

# Site
title: Spacetraveling
logo: /images/logo.svg

# URL
url: http://localhost:4000
root: /

# Directory
public_dir: public
static_dir: static

# Content API
## The endpoint and access token may also come from
## SPACETRAVELING_API_ENDPOINT and SPACETRAVELING_ACCESS_TOKEN
api_endpoint: https://your-repository.cdn.prismic.io/api/v2
document_type: post
request_timeout_secs: 30

# Listing
page_size: 2
dedup_by_uid: false

# Date / Time format
date_format: DD MMM YYYY
locale: pt_BR
timezone: UTC

# Regeneration (seconds)
revalidate:
  listing_secs: 86400
  post_secs: 604800

labels:
  load_more: Carregar mais posts
  loading: Carregando...
  not_found: Post não encontrado
  load_error: Não foi possível carregar mais posts.
  read_time_suffix: min
"#;

    fs::write(&config_path, config_content)?;

    let logo = r##"<svg xmlns="http://www.w3.org/2000/svg" width="239" height="27" viewBox="0 0 239 27">
  <text x="0" y="22" fill="#FF57B2" font-family="Inter, sans-serif" font-size="24" font-weight="700">spacetraveling<tspan fill="#FFFFFF">.</tspan></text>
</svg>
"##;
    fs::write(target_dir.join("static/images/logo.svg"), logo)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;

    #[test]
    fn test_init_site() {
        let dir = tempfile::tempdir().unwrap();
        init_site(dir.path()).unwrap();

        let config = SiteConfig::load(dir.path().join("_config.yml")).unwrap();
        assert_eq!(config.title, "Spacetraveling");
        assert_eq!(config.page_size, 2);
        assert_eq!(config.revalidate.post_secs, 604_800);
        assert_eq!(config.labels.not_found, "Post não encontrado");
        assert!(dir.path().join("static/images/logo.svg").exists());

        assert!(init_site(dir.path()).is_err());
    }
}
