//! Property paths into JSON events: `payload.value`, `readings[0]`,
//! `payload["with.dots"]`.

use std::fmt;
use std::str::FromStr;

use serde_json::Value;

use crate::error::PathError;

/// One step of a property path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

/// A parsed property path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyPath {
    raw: String,
    segments: Vec<PathSegment>,
}

impl PropertyPath {
    pub fn parse(raw: &str) -> Result<Self, PathError> {
        let segments = parse_segments(raw.trim())?;
        Ok(Self {
            raw: raw.trim().to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// The leading key, if the path starts with one.
    pub fn head(&self) -> Option<&str> {
        match self.segments.first() {
            Some(PathSegment::Key(key)) => Some(key),
            _ => None,
        }
    }

    /// Look the path up in `root`. `None` means the property is absent;
    /// a present `null` is returned as `Some(Value::Null)`.
    pub fn lookup<'a>(&self, root: &'a Value) -> Option<&'a Value> {
        lookup_segments(root, &self.segments)
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for PropertyPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Walk `segments` starting from `root`.
pub fn lookup_segments<'a>(root: &'a Value, segments: &[PathSegment]) -> Option<&'a Value> {
    segments.iter().try_fold(root, |current, segment| match (segment, current) {
        (PathSegment::Key(key), Value::Object(map)) => map.get(key),
        (PathSegment::Index(i), Value::Array(items)) => items.get(*i),
        (PathSegment::Key(key), Value::Array(items)) => {
            key.parse::<usize>().ok().and_then(|i| items.get(i))
        }
        _ => None,
    })
}

fn parse_segments(raw: &str) -> Result<Vec<PathSegment>, PathError> {
    if raw.is_empty() {
        return Err(PathError::Empty);
    }

    let malformed = |position: usize, reason: &'static str| PathError::Malformed {
        path: raw.to_string(),
        position,
        reason,
    };

    let chars: Vec<char> = raw.chars().collect();
    let mut segments = Vec::new();
    let mut pos = 0;
    let mut expect_key = true;

    while pos < chars.len() {
        match chars[pos] {
            '[' => {
                pos += 1;
                match chars.get(pos) {
                    Some(&quote) if quote == '"' || quote == '\'' => {
                        pos += 1;
                        let mut key = String::new();
                        loop {
                            match chars.get(pos) {
                                None => return Err(malformed(pos, "unterminated string")),
                                Some('\\') => {
                                    let escaped = chars
                                        .get(pos + 1)
                                        .ok_or_else(|| malformed(pos, "unterminated string"))?;
                                    key.push(*escaped);
                                    pos += 2;
                                }
                                Some(&c) if c == quote => {
                                    pos += 1;
                                    break;
                                }
                                Some(&c) => {
                                    key.push(c);
                                    pos += 1;
                                }
                            }
                        }
                        segments.push(PathSegment::Key(key));
                    }
                    Some(c) if c.is_ascii_digit() => {
                        let start = pos;
                        while chars.get(pos).is_some_and(|c| c.is_ascii_digit()) {
                            pos += 1;
                        }
                        let digits: String = chars[start..pos].iter().collect();
                        let index = digits
                            .parse::<usize>()
                            .map_err(|_| malformed(start, "index out of range"))?;
                        segments.push(PathSegment::Index(index));
                    }
                    _ => return Err(malformed(pos, "expected index or quoted key")),
                }
                if chars.get(pos) != Some(&']') {
                    return Err(malformed(pos, "expected ']'"));
                }
                pos += 1;
                expect_key = false;
            }
            '.' => {
                if expect_key {
                    return Err(malformed(pos, "unexpected '.'"));
                }
                pos += 1;
                expect_key = true;
                if pos == chars.len() {
                    return Err(malformed(pos, "trailing '.'"));
                }
            }
            ']' => return Err(malformed(pos, "unexpected ']'")),
            _ => {
                if !expect_key {
                    return Err(malformed(pos, "expected '.' or '['"));
                }
                let start = pos;
                while pos < chars.len() && !matches!(chars[pos], '.' | '[' | ']') {
                    pos += 1;
                }
                segments.push(PathSegment::Key(chars[start..pos].iter().collect()));
                expect_key = false;
            }
        }
    }

    Ok(segments)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn keys(path: &str) -> Vec<PathSegment> {
        PropertyPath::parse(path).unwrap().segments().to_vec()
    }

    #[test]
    fn parses_dotted_path() {
        assert_eq!(
            keys("payload.value"),
            vec![
                PathSegment::Key("payload".into()),
                PathSegment::Key("value".into())
            ]
        );
    }

    #[test]
    fn parses_indices_and_quoted_keys() {
        assert_eq!(
            keys("readings[2][\"a.b\"].c"),
            vec![
                PathSegment::Key("readings".into()),
                PathSegment::Index(2),
                PathSegment::Key("a.b".into()),
                PathSegment::Key("c".into()),
            ]
        );
        assert_eq!(keys("['x']"), vec![PathSegment::Key("x".into())]);
    }

    #[test]
    fn rejects_malformed_paths() {
        assert_eq!(PropertyPath::parse(""), Err(PathError::Empty));
        assert!(PropertyPath::parse("a..b").is_err());
        assert!(PropertyPath::parse("a.").is_err());
        assert!(PropertyPath::parse(".a").is_err());
        assert!(PropertyPath::parse("a[x]").is_err());
        assert!(PropertyPath::parse("a[0").is_err());
        assert!(PropertyPath::parse("a[\"b]").is_err());
        assert!(PropertyPath::parse("a]").is_err());
    }

    #[test]
    fn lookup_finds_nested_values() {
        let event = json!({"payload": {"value": 11, "list": [1, 2, 3]}, "flag": null});
        let path = PropertyPath::parse("payload.value").unwrap();
        assert_eq!(path.lookup(&event), Some(&json!(11)));

        let path = PropertyPath::parse("payload.list[1]").unwrap();
        assert_eq!(path.lookup(&event), Some(&json!(2)));
    }

    #[test]
    fn lookup_distinguishes_absent_from_null() {
        let event = json!({"flag": null});
        assert_eq!(
            PropertyPath::parse("flag").unwrap().lookup(&event),
            Some(&Value::Null)
        );
        assert_eq!(PropertyPath::parse("missing").unwrap().lookup(&event), None);
        assert_eq!(PropertyPath::parse("flag.deeper").unwrap().lookup(&event), None);
    }
}
