// src/capture/mod.rs

//! Capture and template processing.
//!
//! - [`capture`]: regex post-processing of a selector's raw match
//! - [`Template`]: `{name}` placeholder expansion for URL templates
//! - [`resolve_category_id`]: manual mapping, then capture, then raw value

mod template;

use regex::Regex;

use crate::error::{AppError, Result};

pub use template::{Placeholder, Template, TemplateVars};

/// A compiled capture regex with exactly one group.
#[derive(Debug, Clone)]
pub struct Capture {
    regex: Regex,
}

impl Capture {
    /// Compile the regex declared for `field`.
    ///
    /// An empty pattern means no capture is declared.
    pub fn compile(field: &str, pattern: &str) -> Result<Option<Self>> {
        if pattern.is_empty() {
            return Ok(None);
        }

        let regex = Regex::new(pattern).map_err(|e| AppError::config(field, e))?;
        let groups = regex.captures_len() - 1;
        if groups != 1 {
            return Err(AppError::config(
                field,
                format!("capture regex must contain exactly one group, found {groups}"),
            ));
        }

        Ok(Some(Self { regex }))
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    /// First capture group of the first match, exactly as matched, or an
    /// empty string.
    pub fn apply(&self, raw: &str) -> String {
        self.regex
            .captures(raw)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
            .unwrap_or_default()
    }
}

/// Apply an optional capture to a raw value.
///
/// Without a capture the raw value is returned unchanged; a declared capture
/// that does not match yields an empty string.
pub fn capture(raw: &str, capture: Option<&Capture>) -> String {
    match capture {
        Some(capture) => capture.apply(raw),
        None => raw.to_string(),
    }
}

/// Resolve a category id.
///
/// An exact `manual` match on the label always wins; otherwise the capture is
/// applied to the raw id, otherwise the raw id is used as is.
pub fn resolve_category_id(
    label: &str,
    raw_id: &str,
    manual: &[(String, String)],
    id_capture: Option<&Capture>,
) -> String {
    if let Some((_, id)) = manual.iter().find(|(name, _)| name == label) {
        return id.clone();
    }
    capture(raw_id, id_capture)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compiled(pattern: &str) -> Capture {
        Capture::compile("test", pattern).unwrap().unwrap()
    }

    #[test]
    fn test_capture_returns_group() {
        let re = compiled(r"/vod/(\w+).html");
        assert_eq!(capture("/vod/12345.html", Some(&re)), "12345");
    }

    #[test]
    fn test_capture_keeps_group_verbatim() {
        let re = compiled(r"/vod/(.+).html");
        assert_eq!(capture("/vod/ 12 .html", Some(&re)), " 12 ");
    }

    #[test]
    fn test_capture_without_regex_is_identity() {
        assert_eq!(capture("/vod/12345.html", None), "/vod/12345.html");
    }

    #[test]
    fn test_capture_non_match_is_empty() {
        let re = compiled(r"/vod/(\w+).html");
        assert_eq!(capture("/play/1.html", Some(&re)), "");
    }

    #[test]
    fn test_capture_image_prefix() {
        let re = compiled(r"\S+(http\S+)");
        assert_eq!(
            capture("/img.php?url=https://cdn/a.jpg", Some(&re)),
            "https://cdn/a.jpg"
        );
    }

    #[test]
    fn test_compile_rejects_group_count() {
        assert!(matches!(
            Capture::compile("homeVodIdR", r"/vod/\w+.html"),
            Err(AppError::Config { .. })
        ));
        assert!(Capture::compile("homeVodIdR", r"(a)(b)").is_err());
        assert!(Capture::compile("homeVodIdR", r"(unclosed").is_err());
        assert!(Capture::compile("homeVodIdR", "").unwrap().is_none());
    }

    #[test]
    fn test_non_capturing_groups_do_not_count() {
        assert!(Capture::compile("dtUrlIdR", r"(?:/play)/(\S+).html").unwrap().is_some());
    }

    #[test]
    fn test_manual_mapping_wins() {
        let manual = vec![("电影".to_string(), "dianying".to_string())];
        let re = compiled(r"/type/(\w+).html");

        assert_eq!(
            resolve_category_id("电影", "/type/1.html", &manual, Some(&re)),
            "dianying"
        );
        assert_eq!(
            resolve_category_id("剧集", "/type/2.html", &manual, Some(&re)),
            "2"
        );
        assert_eq!(resolve_category_id("剧集", "2", &manual, None), "2");
    }

    #[test]
    fn test_manual_mapping_wins_for_all_inputs() {
        let manual = vec![
            ("a".to_string(), "manual-a".to_string()),
            ("b".to_string(), "manual-b".to_string()),
        ];
        let re = compiled(r"(\d+)");
        for raw in ["", "1", "/type/9.html", "no digits"] {
            for (label, expected) in &manual {
                assert_eq!(&resolve_category_id(label, raw, &manual, Some(&re)), expected);
                assert_eq!(&resolve_category_id(label, raw, &manual, None), expected);
            }
        }
    }
}
