//! Path expressions and YAML value helpers shared by transformers and patches
//!
//! Two path syntaxes address locations inside a resource document:
//!
//! - **Field paths** (`spec/template/metadata/labels`) used by transformer
//!   field specs. Sequences along the way are traversed implicitly; a `[]`
//!   suffix on a segment is accepted and means the same thing.
//! - **JSON pointers** (`/spec/containers/0/image`) used by ordered-operation
//!   patches, following RFC 6901.
//!
//! The `yaml` submodule provides navigation and mutation helpers on
//! `serde_yaml::Value`.

pub mod yaml;

use crate::error::{Error, Result};

/// Represents a segment in a JSON pointer
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PathSegment {
    /// A member name, or a sequence index written as digits. Which one it is
    /// depends on the value being navigated.
    Key(String),
    /// The `-` token: one past the last element of a sequence
    End,
}

impl PathSegment {
    /// Interpret this segment as an index into a sequence of length `len`.
    ///
    /// `allow_end` permits the `-` token and the index equal to `len`, which
    /// are only meaningful when inserting.
    pub fn as_index(&self, len: usize, allow_end: bool) -> Option<usize> {
        match self {
            PathSegment::End => allow_end.then_some(len),
            PathSegment::Key(key) => {
                if key.is_empty() || (key.len() > 1 && key.starts_with('0')) {
                    return None;
                }
                if !key.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                let idx: usize = key.parse().ok()?;
                if idx < len || (allow_end && idx == len) {
                    Some(idx)
                } else {
                    None
                }
            }
        }
    }
}

/// Parse an RFC 6901 JSON pointer into segments.
///
/// The empty string addresses the whole document. Every other pointer must
/// start with `/`. `~1` decodes to `/` and `~0` to `~`.
///
/// # Examples
///
/// ```
/// use overkube::merge::{parse_pointer, PathSegment};
///
/// let segments = parse_pointer("/metadata/annotations/a~1b").unwrap();
/// assert_eq!(segments[2], PathSegment::Key("a/b".to_string()));
/// ```
pub fn parse_pointer(pointer: &str) -> Result<Vec<PathSegment>> {
    if pointer.is_empty() {
        return Ok(Vec::new());
    }
    let rest = pointer.strip_prefix('/').ok_or_else(|| Error::Path {
        message: format!("JSON pointer '{}' must start with '/'", pointer),
    })?;

    rest.split('/')
        .map(|raw| {
            if raw == "-" {
                return Ok(PathSegment::End);
            }
            let mut decoded = String::with_capacity(raw.len());
            let mut chars = raw.chars();
            while let Some(ch) = chars.next() {
                if ch != '~' {
                    decoded.push(ch);
                    continue;
                }
                match chars.next() {
                    Some('0') => decoded.push('~'),
                    Some('1') => decoded.push('/'),
                    _ => {
                        return Err(Error::Path {
                            message: format!(
                                "JSON pointer '{}' contains an invalid '~' escape",
                                pointer
                            ),
                        })
                    }
                }
            }
            Ok(PathSegment::Key(decoded))
        })
        .collect()
}

/// Parse a slash-separated field path into member names.
///
/// Empty segments are dropped and a trailing `[]` on a segment is stripped,
/// so `spec/containers[]/image` and `spec/containers/image` are equivalent.
/// A backslash escapes a literal `/` inside a segment.
///
/// # Examples
///
/// ```
/// use overkube::merge::parse_field_path;
///
/// let segments = parse_field_path("spec/template/spec/containers[]/image");
/// assert_eq!(segments, vec!["spec", "template", "spec", "containers", "image"]);
/// ```
pub fn parse_field_path(path: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut escaped = false;

    for ch in path.chars() {
        if escaped {
            current.push(ch);
            escaped = false;
            continue;
        }
        match ch {
            '\\' => escaped = true,
            '/' => {
                push_field_segment(&mut segments, &mut current);
            }
            _ => current.push(ch),
        }
    }
    push_field_segment(&mut segments, &mut current);
    segments
}

fn push_field_segment(segments: &mut Vec<String>, current: &mut String) {
    let trimmed = current.strip_suffix("[]").unwrap_or(current);
    if !trimmed.is_empty() {
        segments.push(trimmed.to_string());
    }
    current.clear();
}

/// Encode member names back into a JSON pointer.
pub fn to_pointer<S: AsRef<str>>(segments: &[S]) -> String {
    segments
        .iter()
        .map(|s| format!("/{}", s.as_ref().replace('~', "~0").replace('/', "~1")))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pointer_simple() {
        let segments = parse_pointer("/spec/replicas").unwrap();
        assert_eq!(
            segments,
            vec![
                PathSegment::Key("spec".to_string()),
                PathSegment::Key("replicas".to_string())
            ]
        );
    }

    #[test]
    fn test_parse_pointer_root() {
        assert!(parse_pointer("").unwrap().is_empty());
        assert_eq!(
            parse_pointer("/").unwrap(),
            vec![PathSegment::Key(String::new())]
        );
    }

    #[test]
    fn test_parse_pointer_escapes() {
        let segments = parse_pointer("/metadata/annotations/example.com~1team~0x").unwrap();
        assert_eq!(
            segments[2],
            PathSegment::Key("example.com/team~x".to_string())
        );
    }

    #[test]
    fn test_parse_pointer_end_token() {
        let segments = parse_pointer("/spec/containers/-").unwrap();
        assert_eq!(segments[2], PathSegment::End);
    }

    #[test]
    fn test_parse_pointer_invalid() {
        assert!(parse_pointer("spec/replicas").is_err());
        assert!(parse_pointer("/a~2b").is_err());
        assert!(parse_pointer("/a~").is_err());
    }

    #[test]
    fn test_as_index() {
        assert_eq!(PathSegment::Key("0".into()).as_index(2, false), Some(0));
        assert_eq!(PathSegment::Key("2".into()).as_index(2, false), None);
        assert_eq!(PathSegment::Key("2".into()).as_index(2, true), Some(2));
        assert_eq!(PathSegment::Key("01".into()).as_index(5, false), None);
        assert_eq!(PathSegment::Key("x".into()).as_index(5, false), None);
        assert_eq!(PathSegment::End.as_index(3, true), Some(3));
        assert_eq!(PathSegment::End.as_index(3, false), None);
    }

    #[test]
    fn test_parse_field_path() {
        assert_eq!(
            parse_field_path("metadata/labels"),
            vec!["metadata", "labels"]
        );
        assert_eq!(
            parse_field_path("/spec/containers[]/image/"),
            vec!["spec", "containers", "image"]
        );
        assert!(parse_field_path("").is_empty());
    }

    #[test]
    fn test_parse_field_path_escaped_slash() {
        assert_eq!(
            parse_field_path(r"metadata/annotations/example.com\/owner"),
            vec!["metadata", "annotations", "example.com/owner"]
        );
    }

    #[test]
    fn test_to_pointer() {
        assert_eq!(to_pointer(&["spec", "a/b", "c~d"]), "/spec/a~1b/c~0d");
        assert_eq!(to_pointer::<&str>(&[]), "");
    }
}
