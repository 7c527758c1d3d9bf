//! Generate static files

use anyhow::{bail, Result};

use crate::generator::{is_valid_uid, Generator};
use crate::Site;

/// Generate the whole site, or a single post page with `only`
pub async fn run(site: &Site, only: Option<&str>) -> Result<()> {
    let start = std::time::Instant::now();
    let generator = Generator::new(site, site.client()?)?;

    match only {
        Some(uid) => {
            if !is_valid_uid(uid) {
                bail!("Invalid post uid: {:?}", uid);
            }
            let detail = generator.build_post_page(uid).await?;
            tracing::info!(
                "Generated {} ({} min read)",
                detail.post.title,
                detail.reading_time()
            );
        }
        None => {
            let report = generator.build_all().await?;
            tracing::info!(
                "Generated listing ({} posts) and {} post pages, copied {} static files",
                report.listed,
                report.posts,
                report.assets
            );
            if !report.skipped.is_empty() {
                tracing::warn!("Skipped: {}", report.skipped.join(", "));
            }
        }
    }

    let duration = start.elapsed();
    tracing::info!("Generated in {:.2}s", duration.as_secs_f64());

    Ok(())
}
