use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde_json::Value;
use std::borrow::Cow;

/// Characters escaped in dynamic segments and query pairs.
///
/// Alphanumerics and `@*_+-.` are kept as is. Unlike the legacy `escape()`
/// function, `/` is escaped too so that a value can never split a segment.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'@')
    .remove(b'*')
    .remove(b'_')
    .remove(b'+')
    .remove(b'-')
    .remove(b'.');

/// Percent-encodes a single URL component.
pub fn escape(raw: &str) -> Cow<'_, str> {
    utf8_percent_encode(raw, COMPONENT).into()
}

/// Decodes a percent-encoded URL component. Invalid UTF-8 sequences are
/// replaced rather than rejected.
pub fn unescape(encoded: &str) -> Cow<'_, str> {
    percent_decode_str(encoded).decode_utf8_lossy()
}

/// Renders a captured state value as URL text, before escaping.
///
/// Strings are used verbatim, other scalars use their JSON representation
/// (`123`, `true`). Returns `None` for `null`.
pub(crate) fn value_text(value: &Value) -> Option<Cow<'_, str>> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(Cow::Borrowed(s)),
        other => Some(Cow::Owned(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn escaped_components() {
        assert_eq!(escape("abc-123_x.y"), "abc-123_x.y");
        assert_eq!(escape("a b"), "a%20b");
        assert_eq!(escape("a/b"), "a%2Fb");
        assert_eq!(escape("a=b&c"), "a%3Db%26c");
        assert_eq!(escape("é"), "%C3%A9");
    }

    #[test]
    fn unescaped_components() {
        assert_eq!(unescape("a%20b"), "a b");
        assert_eq!(unescape("a%2Fb"), "a/b");
        assert_eq!(unescape("plain"), "plain");
        assert_eq!(unescape(&escape("x/y z?")), "x/y z?");
    }

    #[test]
    fn value_as_text() {
        assert_eq!(value_text(&json!("abc")).as_deref(), Some("abc"));
        assert_eq!(value_text(&json!(123456)).as_deref(), Some("123456"));
        assert_eq!(value_text(&json!(true)).as_deref(), Some("true"));
        assert_eq!(value_text(&Value::Null), None);
    }
}
