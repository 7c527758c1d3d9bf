//! Built-in site templates using Tera template engine
//!
//! Templates are embedded in the binary. Autoescaping is off: every
//! string placed in a context is escaped while building the data structs
//! below, and rich-text HTML is inserted as-is.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tera::{Context, Tera};

use crate::config::SiteConfig;
use crate::content::{HtmlRenderer, Post, PostDetail, RichTextRenderer};
use crate::helpers::{
    html_escape, image_tag, meta_generator, more_posts_url, url_for, DateFormatter,
};

/// Template renderer with the embedded site templates
pub struct TemplateRenderer {
    tera: Tera,
}

impl TemplateRenderer {
    /// Create a new renderer with all templates loaded
    pub fn new() -> Result<Self> {
        let mut tera = Tera::default();
        tera.autoescape_on(vec![]);

        tera.add_raw_templates(vec![
            ("layout.html", include_str!("site/layout.html")),
            ("index.html", include_str!("site/index.html")),
            ("post.html", include_str!("site/post.html")),
            ("more.html", include_str!("site/more.html")),
            ("load_error.html", include_str!("site/load_error.html")),
            ("fallback.html", include_str!("site/fallback.html")),
            ("not_found.html", include_str!("site/not_found.html")),
            // Partials
            (
                "partials/header.html",
                include_str!("site/partials/header.html"),
            ),
            (
                "partials/post_list.html",
                include_str!("site/partials/post_list.html"),
            ),
        ])?;

        Ok(Self { tera })
    }

    /// Render a template with given context
    pub fn render(&self, template_name: &str, context: &Context) -> Result<String> {
        Ok(self.tera.render(template_name, context)?)
    }

    /// Context shared by every full page
    pub fn base_context(config: &ConfigData) -> Context {
        let mut context = Context::new();
        context.insert("config", config);
        context.insert("meta_generator", &meta_generator());
        context
    }
}

/// Data structures for template context

#[derive(Debug, Clone, Serialize)]
pub struct LabelsData {
    pub load_more: String,
    pub loading: String,
    pub not_found: String,
    pub load_error: String,
    pub read_time_suffix: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConfigData {
    pub title: String,
    pub logo: String,
    pub home: String,
    /// Prefix of post links, for entries rendered by the listing script
    pub post_root: String,
    pub lang: String,
    pub labels: LabelsData,
}

impl ConfigData {
    pub fn from_config(config: &SiteConfig) -> Self {
        let labels = &config.labels;
        Self {
            title: html_escape(&config.title),
            logo: html_escape(&url_for(config, &config.logo)),
            home: html_escape(&url_for(config, "")),
            post_root: html_escape(&url_for(config, "post/")),
            lang: html_escape(&config.locale.replace('_', "-")),
            labels: LabelsData {
                load_more: html_escape(&labels.load_more),
                loading: html_escape(&labels.loading),
                not_found: html_escape(&labels.not_found),
                load_error: html_escape(&labels.load_error),
                read_time_suffix: html_escape(&labels.read_time_suffix),
            },
        }
    }
}

/// Where the "load more" control gets the next page from
///
/// Behind the preview server the listing asks `url` for a rendered
/// fragment. When that route does not exist (plain static hosting) the
/// script calls the raw `cursor` URL and renders the entries itself.
#[derive(Debug, Clone, Serialize)]
pub struct LoadMoreData {
    pub url: String,
    pub cursor: String,
}

impl LoadMoreData {
    pub fn new(config: &SiteConfig, cursor: &str) -> Self {
        Self {
            url: html_escape(&more_posts_url(config, cursor)),
            cursor: html_escape(cursor),
        }
    }
}

/// A post entry on the listing page
#[derive(Debug, Clone, Serialize)]
pub struct PostData {
    pub title: String,
    pub subtitle: String,
    pub author: String,
    pub url: Option<String>,
    /// Display date, absent for unpublished posts
    pub date: Option<String>,
    pub datetime: Option<String>,
}

impl PostData {
    pub fn new(post: &Post, config: &SiteConfig, dates: &DateFormatter) -> Self {
        let (date, datetime) = dates_for(post.first_publication_date.as_ref(), dates);
        Self {
            title: html_escape(&post.title),
            subtitle: html_escape(&post.subtitle),
            author: html_escape(&post.author),
            url: post.path().map(|path| html_escape(&url_for(config, &path))),
            date,
            datetime,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SectionData {
    pub heading: String,
    /// Rendered rich text
    pub html: String,
}

/// Everything the post page shows
#[derive(Debug, Clone, Serialize)]
pub struct PostPageData {
    pub title: String,
    pub author: String,
    pub date: Option<String>,
    pub datetime: Option<String>,
    /// `<img>` tag, empty when the post has no banner
    pub banner: String,
    pub reading_time: usize,
    pub sections: Vec<SectionData>,
}

impl PostPageData {
    pub fn new(detail: &PostDetail, dates: &DateFormatter) -> Self {
        let post = &detail.post;
        let (date, datetime) = dates_for(post.first_publication_date.as_ref(), dates);
        let alt = detail.banner.alt.as_deref().unwrap_or(&post.title);
        Self {
            title: html_escape(&post.title),
            author: html_escape(&post.author),
            date,
            datetime,
            banner: image_tag(&detail.banner.url, alt),
            reading_time: detail.reading_time(),
            sections: detail
                .content
                .iter()
                .map(|section| SectionData {
                    heading: html_escape(&section.heading),
                    html: HtmlRenderer.render(&section.body),
                })
                .collect(),
        }
    }
}

fn dates_for(
    date: Option<&DateTime<Utc>>,
    dates: &DateFormatter,
) -> (Option<String>, Option<String>) {
    match date {
        Some(date) => (Some(dates.format(date)), Some(dates.datetime(date))),
        None => (None, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_templates_load() {
        assert!(TemplateRenderer::new().is_ok());
    }

    #[test]
    fn test_config_data_escapes() {
        let mut config = SiteConfig::default();
        config.title = "Tom & Jerry".to_string();
        let data = ConfigData::from_config(&config);
        assert_eq!(data.title, "Tom &amp; Jerry");
        assert_eq!(data.lang, "pt-BR");
        assert_eq!(data.home, "/");
        assert_eq!(data.logo, "/images/logo.svg");
        assert_eq!(data.post_root, "/post/");
    }

    #[test]
    fn test_load_more_keeps_raw_cursor() {
        let data = LoadMoreData::new(&SiteConfig::default(), "https://api/x?page=2&ref=Y");
        assert_eq!(data.cursor, "https://api/x?page=2&amp;ref=Y");
        assert_eq!(
            data.url,
            "/posts/more?cursor=https%3A%2F%2Fapi%2Fx%3Fpage%3D2%26ref%3DY"
        );
    }

    #[test]
    fn test_not_found_page() {
        let renderer = TemplateRenderer::new().unwrap();
        let config = ConfigData::from_config(&SiteConfig::default());
        let html = renderer
            .render("not_found.html", &TemplateRenderer::base_context(&config))
            .unwrap();
        assert!(html.contains("<h1>Post não encontrado</h1>"));
        assert!(html.contains("<title>Post não encontrado | Spacetraveling</title>"));
    }
}
