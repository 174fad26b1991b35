use std::borrow::Cow;

/// Escapes a value for use inside a double-quoted XML attribute.
pub fn escape_attr(value: &str) -> Cow<'_, str> {
    if !value.contains(&['&', '<', '>', '"', '\''][..]) {
        return Cow::Borrowed(value);
    }
    let mut escaped = String::with_capacity(value.len() + 8);
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            other => escaped.push(other),
        }
    }
    Cow::Owned(escaped)
}
