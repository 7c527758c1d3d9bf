//! Browse posts in the terminal

use anyhow::Result;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};

use crate::client::{ContentApi, PageQuery};
use crate::config::SiteConfig;
use crate::content::{normalize_page, Post};
use crate::helpers::{word_wrap, DateFormatter};
use crate::listing::{Completion, ListingFlow, ListingView};
use crate::Site;

/// Wrap subtitles at this width
const WRAP_WIDTH: usize = 72;

/// List posts page by page: Enter loads more, `q` quits
pub async fn run(site: &Site) -> Result<()> {
    let config = &site.config;
    let client = Arc::new(site.client()?);

    let query = PageQuery::listing(&config.document_type, config.page_size);
    let first = normalize_page(&client.fetch_posts_page(&query).await?)?;
    let view = ListingView::new(ListingFlow::new(first).with_dedup(config.dedup_by_uid));

    let input = BufReader::new(tokio::io::stdin()).lines();
    let mut out = std::io::stdout();
    browse(client, &view, config, input, &mut out).await
}

/// Drive `view` from `input`, printing to `out`
pub async fn browse<C, R>(
    client: Arc<C>,
    view: &ListingView,
    config: &SiteConfig,
    mut input: Lines<R>,
    out: &mut impl Write,
) -> Result<()>
where
    C: ContentApi + 'static,
    R: AsyncBufRead + Unpin,
{
    let dates = DateFormatter::from_config(config);
    let labels = &config.labels;

    let mut shown = view.read(|flow| flow.posts().results.len());
    view.read(|flow| print_posts(out, &flow.posts().results, 0, &dates))?;

    loop {
        if !view.read(|flow| flow.has_more()) {
            writeln!(out, "({} posts)", shown)?;
            break;
        }

        writeln!(out, "[Enter] {}  [q] quit", labels.load_more)?;
        out.flush()?;
        let line = match input.next_line().await? {
            Some(line) => line,
            None => break,
        };
        if line.trim().eq_ignore_ascii_case("q") {
            break;
        }

        let Some(handle) = view.request_next_page(client.clone()) else {
            continue;
        };
        writeln!(out, "{}", labels.loading)?;

        match handle.await? {
            Completion::Applied { .. } => {
                view.read(|flow| print_posts(out, &flow.posts().results, shown, &dates))?;
                shown = view.read(|flow| flow.posts().results.len());
            }
            Completion::Failed => {
                let reason = view
                    .read(|flow| flow.last_error().map(|e| e.user_message()))
                    .unwrap_or_default();
                writeln!(out, "{} {}", labels.load_error, reason)?;
            }
            Completion::Discarded => break,
        }
    }

    view.dispose();
    Ok(())
}

fn print_posts(
    out: &mut impl Write,
    posts: &[Post],
    from: usize,
    dates: &DateFormatter,
) -> std::io::Result<()> {
    for (i, post) in posts.iter().enumerate().skip(from) {
        let date = post
            .first_publication_date
            .as_ref()
            .map(|d| dates.format(d))
            .unwrap_or_else(|| "-".to_string());
        writeln!(out, "{:>3}. {}", i + 1, post.title)?;
        for line in word_wrap(&post.subtitle, WRAP_WIDTH).lines() {
            writeln!(out, "     {}", line)?;
        }
        writeln!(out, "     {} | {}", date, post.author)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::testing::{raw_post, ScriptedApi};
    use crate::client::RawPage;
    use crate::error::Error;

    const PAGE_2: &str = "https://api/x?page=2";

    fn view() -> ListingView {
        let first = normalize_page(&RawPage {
            next_page: Some(PAGE_2.to_string()),
            results: vec![
                raw_post("a", Some("2021-03-15T19:25:28+0000")),
                raw_post("b", None),
            ],
            ..Default::default()
        })
        .unwrap();
        ListingView::new(ListingFlow::new(first))
    }

    fn page_2() -> RawPage {
        RawPage {
            results: vec![raw_post("c", None)],
            ..Default::default()
        }
    }

    async fn browse_with(api: ScriptedApi, keys: &'static [u8]) -> String {
        let mut out = Vec::new();
        let input = BufReader::new(keys).lines();
        browse(
            Arc::new(api),
            &view(),
            &SiteConfig::default(),
            input,
            &mut out,
        )
        .await
        .unwrap();
        String::from_utf8(out).unwrap()
    }

    #[tokio::test]
    async fn test_load_until_last_page() {
        let api = ScriptedApi::new().with_cursor(PAGE_2, Ok(page_2()));
        let out = browse_with(api, b"\n").await;

        assert!(out.contains("  1. Title a"));
        assert!(out.contains("     15 mar 2021 | Danilo Vieira"));
        assert!(out.contains("     - | Danilo Vieira"));
        assert!(out.contains("  3. Title c"));
        assert_eq!(out.matches("Title a").count(), 1);
        assert!(out.ends_with("(3 posts)\n"));
    }

    #[tokio::test]
    async fn test_error_then_retry() {
        let api = ScriptedApi::new()
            .with_cursor(
                PAGE_2,
                Err(Error::Status {
                    status: reqwest::StatusCode::BAD_GATEWAY,
                    body: String::new(),
                }),
            )
            .with_cursor(PAGE_2, Ok(page_2()));
        let out = browse_with(api, b"\n\n").await;

        assert!(out.contains("Não foi possível carregar mais posts."));
        assert!(out.contains("  3. Title c"));
    }

    #[tokio::test]
    async fn test_quit() {
        let out = browse_with(ScriptedApi::new(), b"q\n").await;
        assert!(out.contains("  2. Title b"));
        assert!(!out.contains("Carregando..."));
    }
}
