//! HTML and text helper functions

/// Escape HTML special characters
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Generate meta generator tag
pub fn meta_generator() -> String {
    format!(
        r#"<meta name="generator" content="spacetraveling {}">"#,
        env!("CARGO_PKG_VERSION")
    )
}

/// Generate an image tag; an empty `src` yields nothing
pub fn image_tag(src: &str, alt: &str) -> String {
    if src.is_empty() {
        return String::new();
    }
    format!(
        r#"<img src="{}" alt="{}">"#,
        html_escape(src),
        html_escape(alt)
    )
}

/// Word wrap text
pub fn word_wrap(s: &str, width: usize) -> String {
    let mut result = String::new();
    let mut line_len = 0;

    for word in s.split_whitespace() {
        let word_len = word.chars().count();
        if line_len + word_len + 1 > width {
            if !result.is_empty() {
                result.push('\n');
            }
            result.push_str(word);
            line_len = word_len;
        } else {
            if !result.is_empty() {
                result.push(' ');
                line_len += 1;
            }
            result.push_str(word);
            line_len += word_len;
        }
    }

    result
}
