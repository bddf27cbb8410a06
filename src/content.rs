//! Content filtering and subject derivation.
//!
//! Raw user input is reduced to a safe HTML fragment before it reaches the
//! store: everything is entity-escaped and newlines become `<br>`. Thread
//! subjects are not free text; they are derived from the root post's body
//! and truncated on a character boundary.

/// Sanitize a raw post body into a safe HTML fragment.
///
/// Returns an empty string when nothing survives filtering, which callers
/// must treat as invalid content.
pub fn sanitize(raw: &str) -> String {
    let mut html = String::with_capacity(raw.len());

    for line in raw.lines() {
        let line = line.trim_end();
        if !html.is_empty() {
            html.push_str("<br>");
        }
        html.push_str(&escape_html(line));
    }

    // A body of blank lines collapses to nothing but separators
    if html.replace("<br>", "").trim().is_empty() {
        return String::new();
    }

    html
}

/// Derive a thread subject from sanitized content: tags out, whitespace
/// collapsed, truncated to `max_chars` characters.
pub fn derive_subject(content: &str, max_chars: usize) -> String {
    let text = strip_tags(content);
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.chars().take(max_chars).collect()
}

fn strip_tags(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_tag = false;
    for c in s.chars() {
        match c {
            '<' => {
                in_tag = true;
                // Tag boundaries separate words in the derived subject
                out.push(' ');
            }
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_escapes_markup() {
        let out = sanitize("<script>alert(1)</script>");
        assert_eq!(out, "&lt;script&gt;alert(1)&lt;/script&gt;");
    }

    #[test]
    fn test_sanitize_preserves_lines_as_br() {
        assert_eq!(sanitize("one\ntwo"), "one<br>two");
    }

    #[test]
    fn test_sanitize_empty_after_filtering() {
        assert_eq!(sanitize(""), "");
        assert_eq!(sanitize("   \n  \n"), "");
    }

    #[test]
    fn test_derive_subject_strips_breaks() {
        let content = sanitize("first line\nsecond line");
        assert_eq!(derive_subject(&content, 140), "first line second line");
    }

    #[test]
    fn test_derive_subject_truncates_on_char_boundary() {
        let subject = derive_subject("héllo wörld", 7);
        assert_eq!(subject, "héllo w");
        assert_eq!(subject.chars().count(), 7);
    }

    #[test]
    fn test_derive_subject_keeps_escaped_entities() {
        let content = sanitize("a < b");
        assert_eq!(derive_subject(&content, 140), "a &lt; b");
    }
}
