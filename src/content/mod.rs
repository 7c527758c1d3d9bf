//! Content module - post models, normalization and rich text

mod normalize;
mod post;
mod richtext;

pub use normalize::{normalize_page, normalize_post, normalize_post_detail, parse_publication_date};
pub use post::{post_path, Banner, ContentSection, PaginatedPosts, Post, PostDetail};
pub use richtext::{HtmlRenderer, RichText, RichTextBlock, RichTextRenderer, Span};
