//! Markup helpers for notification content
//!
//! Text pushed to the notification surface is interpreted as Pango-style
//! markup, so anything coming from the network has to be escaped first.

/// Escape text so it can be embedded in markup verbatim
///
/// # Examples
///
/// ```
/// use chatline::markup::escape;
///
/// assert_eq!(escape("a < b & c"), "a &lt; b &amp; c");
/// ```
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Wrap already-escaped markup in italics
pub fn italic(markup: &str) -> String {
    format!("<i>{}</i>", markup)
}
