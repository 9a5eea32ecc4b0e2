// src/utils/url.rs

//! URL manipulation utilities.

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use url::Url;
use url::form_urlencoded::byte_serialize;

/// Bytes escaped inside a path segment, `+` and `&` included.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'&')
    .add(b'+')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Resolve a potentially relative URL against a base URL.
///
/// Returns `href` unchanged when either side cannot be parsed.
///
/// # Examples
/// ```
/// use vodcrawl::utils::url::resolve;
///
/// assert_eq!(
///     resolve("https://example.com/path/", "page.html"),
///     "https://example.com/path/page.html"
/// );
/// ```
pub fn resolve(base: &str, href: &str) -> String {
    if Url::parse(href).is_ok() {
        return href.to_string();
    }
    Url::parse(base)
        .and_then(|base| base.join(href))
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

/// Form-encode a query value (space becomes `+`).
pub fn encode_component(value: &str) -> String {
    byte_serialize(value.as_bytes()).collect()
}

/// Percent-encode a value for use as (part of) a path segment.
pub fn encode_path_segment(value: &str) -> String {
    utf8_percent_encode(value, PATH_SEGMENT).to_string()
}

/// Extract the host from a URL string.
pub fn get_domain(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|s| s.to_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_absolute_url() {
        assert_eq!(
            resolve("https://example.com/path/", "https://other.com/page"),
            "https://other.com/page"
        );
    }

    #[test]
    fn test_resolve_absolute_path() {
        assert_eq!(
            resolve("https://jumi.tv", "/upload/a.jpg"),
            "https://jumi.tv/upload/a.jpg"
        );
        assert_eq!(
            resolve("https://example.com/path/", "//cdn.example.com/a.jpg"),
            "https://cdn.example.com/a.jpg"
        );
    }

    #[test]
    fn test_resolve_relative_from_file() {
        assert_eq!(
            resolve("https://example.com/path/index.html", "other.html"),
            "https://example.com/path/other.html"
        );
    }

    #[test]
    fn test_resolve_unparseable_base() {
        assert_eq!(resolve("not a url", "a.jpg"), "a.jpg");
    }

    #[test]
    fn test_encode_component() {
        assert_eq!(encode_component("a b&c"), "a+b%26c");
        assert_eq!(encode_component("大陆"), "%E5%A4%A7%E9%99%86");
        assert_eq!(encode_component(""), "");
    }

    #[test]
    fn test_encode_path_segment() {
        assert_eq!(encode_path_segment("a b"), "a%20b");
        assert_eq!(encode_path_segment("c++"), "c%2B%2B");
        assert_eq!(encode_path_segment("a/b?c#d"), "a%2Fb%3Fc%23d");
        assert_eq!(encode_path_segment("大陆"), "%E5%A4%A7%E9%99%86");
        assert_eq!(encode_path_segment("2022-hits"), "2022-hits");
    }

    #[test]
    fn test_get_domain() {
        assert_eq!(
            get_domain("https://Example.COM/path"),
            Some("example.com".to_string())
        );
        assert_eq!(get_domain("invalid-url"), None);
    }
}
