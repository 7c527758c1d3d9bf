//! Structured rich text and its HTML rendering
//!
//! Post bodies arrive as a list of blocks (paragraphs, headings, list
//! items, images, embeds), each carrying plain text plus formatting spans
//! addressed by UTF-16 offsets, as JavaScript counts them.

use serde::{Deserialize, Serialize};

use crate::helpers::html_escape;

/// A rich-text document: an ordered list of blocks
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RichText(pub Vec<RichTextBlock>);

impl RichText {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Text of every block, one block per line
    pub fn plain_text(&self) -> String {
        self.0
            .iter()
            .map(|block| block.text.as_str())
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// One block of rich text
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RichTextBlock {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
    pub spans: Vec<Span>,
    /// Image source
    pub url: Option<String>,
    pub alt: Option<String>,
    /// Embed payload (`html`, `embed_url`, ...)
    pub oembed: Option<serde_json::Value>,
}

/// Inline formatting over `start..end` (UTF-16 code unit offsets)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    #[serde(rename = "type")]
    pub kind: String,
    pub data: Option<serde_json::Value>,
}

impl Span {
    fn open_tag(&self) -> Option<String> {
        match self.kind.as_str() {
            "strong" => Some("<strong>".to_string()),
            "em" => Some("<em>".to_string()),
            "hyperlink" => {
                let data = self.data.as_ref();
                let url = data
                    .and_then(|d| d.get("url"))
                    .and_then(|u| u.as_str())
                    .unwrap_or("#");
                let target = data
                    .and_then(|d| d.get("target"))
                    .and_then(|t| t.as_str())
                    .map(|t| format!(r#" target="{}" rel="noopener""#, html_escape(t)))
                    .unwrap_or_default();
                Some(format!(r#"<a href="{}"{}>"#, html_escape(url), target))
            }
            "label" => {
                let label = self
                    .data
                    .as_ref()
                    .and_then(|d| d.get("label"))
                    .and_then(|l| l.as_str())
                    .unwrap_or("");
                Some(format!(r#"<span class="{}">"#, html_escape(label)))
            }
            _ => None,
        }
    }

    fn close_tag(&self) -> &'static str {
        match self.kind.as_str() {
            "strong" => "</strong>",
            "em" => "</em>",
            "hyperlink" => "</a>",
            "label" => "</span>",
            _ => "",
        }
    }
}

/// Turns rich text into markup
pub trait RichTextRenderer {
    fn render(&self, text: &RichText) -> String;
}

/// Built-in HTML renderer
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlRenderer;

#[derive(PartialEq, Clone, Copy)]
enum ListKind {
    Unordered,
    Ordered,
}

impl ListKind {
    fn of(block: &RichTextBlock) -> Option<Self> {
        match block.kind.as_str() {
            "list-item" => Some(Self::Unordered),
            "o-list-item" => Some(Self::Ordered),
            _ => None,
        }
    }

    fn open(self) -> &'static str {
        match self {
            Self::Unordered => "<ul>",
            Self::Ordered => "<ol>",
        }
    }

    fn close(self) -> &'static str {
        match self {
            Self::Unordered => "</ul>",
            Self::Ordered => "</ol>",
        }
    }
}

impl RichTextRenderer for HtmlRenderer {
    fn render(&self, text: &RichText) -> String {
        let mut html = String::new();
        let mut open_list: Option<ListKind> = None;

        for block in &text.0 {
            let list = ListKind::of(block);
            if open_list != list {
                if let Some(kind) = open_list {
                    html.push_str(kind.close());
                }
                if let Some(kind) = list {
                    html.push_str(kind.open());
                }
                open_list = list;
            }

            match block.kind.as_str() {
                "paragraph" => {
                    html.push_str(&format!("<p>{}</p>", render_inline(block)));
                }
                kind @ ("heading1" | "heading2" | "heading3" | "heading4" | "heading5"
                | "heading6") => {
                    let level = &kind["heading".len()..];
                    html.push_str(&format!(
                        "<h{}>{}</h{}>",
                        level,
                        render_inline(block),
                        level
                    ));
                }
                "preformatted" => {
                    html.push_str(&format!("<pre>{}</pre>", render_inline(block)));
                }
                "list-item" | "o-list-item" => {
                    html.push_str(&format!("<li>{}</li>", render_inline(block)));
                }
                "image" => {
                    if let Some(url) = &block.url {
                        html.push_str(&format!(
                            r#"<p class="block-img"><img src="{}" alt="{}"></p>"#,
                            html_escape(url),
                            html_escape(block.alt.as_deref().unwrap_or(""))
                        ));
                    }
                }
                "embed" => {
                    if let Some(oembed) = &block.oembed {
                        let embed_url = oembed
                            .get("embed_url")
                            .and_then(|u| u.as_str())
                            .unwrap_or("");
                        let inner = oembed.get("html").and_then(|h| h.as_str()).unwrap_or("");
                        html.push_str(&format!(
                            r#"<div data-oembed="{}">{}</div>"#,
                            html_escape(embed_url),
                            inner
                        ));
                    }
                }
                other => {
                    tracing::debug!("Skipping unsupported rich text block {:?}", other);
                }
            }
        }

        if let Some(kind) = open_list {
            html.push_str(kind.close());
        }

        html
    }
}

/// Render a block's text with its spans applied
///
/// Span offsets count UTF-16 code units. The text is cut at every span
/// boundary; each segment is wrapped in the spans covering it, earlier
/// spans outermost.
fn render_inline(block: &RichTextBlock) -> String {
    let text = block.text.as_str();

    // (UTF-16 offset, byte offset) of every char boundary
    let mut boundaries = Vec::with_capacity(text.len() + 1);
    let mut len = 0;
    for (byte, c) in text.char_indices() {
        boundaries.push((len, byte));
        len += c.len_utf16();
    }
    boundaries.push((len, text.len()));

    // Offsets inside a surrogate pair snap back to the start of the char
    let byte_at = |offset: usize| {
        let i = match boundaries.binary_search_by_key(&offset, |&(units, _)| units) {
            Ok(i) => i,
            Err(i) => i.saturating_sub(1),
        };
        boundaries[i].1
    };

    let spans: Vec<&Span> = block
        .spans
        .iter()
        .filter(|s| s.start < s.end && s.start < len)
        .collect();

    let mut bounds: Vec<usize> = vec![0, len];
    for span in &spans {
        bounds.push(span.start);
        bounds.push(span.end.min(len));
    }
    bounds.sort_unstable();
    bounds.dedup();

    let mut out = String::new();
    for window in bounds.windows(2) {
        let (from, to) = (window[0], window[1]);
        let (start, end) = (byte_at(from), byte_at(to));
        if start == end {
            continue;
        }
        let mut segment = html_escape(&text[start..end]).replace('\n', "<br />");

        for span in spans.iter().rev().filter(|s| s.start <= from && s.end >= to) {
            if let Some(open) = span.open_tag() {
                segment = format!("{}{}{}", open, segment, span.close_tag());
            }
        }
        out.push_str(&segment);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> RichText {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_paragraph_with_spans() {
        let text = parse(
            r#"[{"type": "paragraph", "text": "Hello brave world", "spans": [
                {"start": 0, "end": 5, "type": "strong"},
                {"start": 6, "end": 11, "type": "hyperlink", "data": {"url": "https://example.com"}}
            ]}]"#,
        );
        assert_eq!(
            HtmlRenderer.render(&text),
            r#"<p><strong>Hello</strong> <a href="https://example.com">brave</a> world</p>"#
        );
    }

    #[test]
    fn test_overlapping_spans() {
        let text = parse(
            r#"[{"type": "paragraph", "text": "abc", "spans": [
                {"start": 0, "end": 3, "type": "strong"},
                {"start": 1, "end": 2, "type": "em"}
            ]}]"#,
        );
        assert_eq!(
            HtmlRenderer.render(&text),
            "<p><strong>a</strong><strong><em>b</em></strong><strong>c</strong></p>"
        );
    }

    #[test]
    fn test_lists_are_grouped() {
        let text = parse(
            r#"[
                {"type": "heading2", "text": "Passos", "spans": []},
                {"type": "list-item", "text": "um", "spans": []},
                {"type": "list-item", "text": "dois", "spans": []},
                {"type": "o-list-item", "text": "três", "spans": []},
                {"type": "paragraph", "text": "fim", "spans": []}
            ]"#,
        );
        assert_eq!(
            HtmlRenderer.render(&text),
            "<h2>Passos</h2><ul><li>um</li><li>dois</li></ul><ol><li>três</li></ol><p>fim</p>"
        );
    }

    #[test]
    fn test_escapes_text_and_skips_unknown_blocks() {
        let text = parse(
            r#"[
                {"type": "paragraph", "text": "<script>x</script>\nnext", "spans": []},
                {"type": "mystery", "text": "ignored"},
                {"type": "image", "url": "https://images.prismic.io/a.png", "alt": "A"}
            ]"#,
        );
        assert_eq!(
            HtmlRenderer.render(&text),
            concat!(
                "<p>&lt;script&gt;x&lt;/script&gt;<br />next</p>",
                r#"<p class="block-img"><img src="https://images.prismic.io/a.png" alt="A"></p>"#
            )
        );
    }

    #[test]
    fn test_multibyte_offsets() {
        let text = parse(
            r#"[{"type": "paragraph", "text": "ação rápida", "spans": [
                {"start": 5, "end": 11, "type": "em"}
            ]}]"#,
        );
        assert_eq!(HtmlRenderer.render(&text), "<p>ação <em>rápida</em></p>");
    }

    #[test]
    fn test_astral_offsets_count_utf16_units() {
        let text = parse(
            r#"[{"type": "paragraph", "text": "🚀 go 🌕 now", "spans": [
                {"start": 3, "end": 5, "type": "strong"},
                {"start": 9, "end": 12, "type": "em"}
            ]}]"#,
        );
        assert_eq!(
            HtmlRenderer.render(&text),
            "<p>🚀 <strong>go</strong> 🌕 <em>now</em></p>"
        );
    }

    #[test]
    fn test_plain_text() {
        let text = parse(
            r#"[{"type": "paragraph", "text": "one two"}, {"type": "image"}, {"type": "paragraph", "text": "three"}]"#,
        );
        assert_eq!(text.plain_text(), "one two\nthree");
    }
}
