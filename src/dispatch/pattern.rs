//! Path patterns with typed captures.
//!
//! A pattern is a `/`-separated list of segments. Each segment is either
//! a literal or exactly one capture written `<converter:name>` (or
//! `<name>`, which uses the `str` converter). Matching is exact, trailing
//! slash included.
//!
//! | Converter | Matches                                       |
//! |-----------|-----------------------------------------------|
//! | `str`     | any non-empty segment                         |
//! | `int`     | ASCII digits                                  |
//! | `slug`    | ASCII letters, digits, `-` and `_`            |
//! | `uuid`    | lowercase hyphenated UUID                     |
//! | `path`    | the non-empty remainder, `/` included (last)  |

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::GatewayError;

/// Parameters captured while matching a path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteParams(BTreeMap<String, String>);

impl RouteParams {
    /// Returns the raw captured value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Parses the captured value as `T`.
    #[must_use]
    pub fn parse<T: FromStr>(&self, name: &str) -> Option<T> {
        self.get(name).and_then(|value| value.parse().ok())
    }

    /// Number of captured parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if nothing was captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Capture converter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Converter {
    /// Any non-empty segment.
    Str,
    /// ASCII digits.
    Int,
    /// Letters, digits, hyphens and underscores.
    Slug,
    /// Lowercase hyphenated UUID.
    Uuid,
    /// The remainder of the path.
    Path,
}

impl Converter {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "str" => Some(Self::Str),
            "int" => Some(Self::Int),
            "slug" => Some(Self::Slug),
            "uuid" => Some(Self::Uuid),
            "path" => Some(Self::Path),
            _ => None,
        }
    }

    fn accepts(self, value: &str) -> bool {
        if value.is_empty() {
            return false;
        }
        match self {
            Self::Str | Self::Path => true,
            Self::Int => value.bytes().all(|b| b.is_ascii_digit()),
            Self::Slug => value
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_'),
            Self::Uuid => {
                value.len() == 36
                    && !value.bytes().any(|b| b.is_ascii_uppercase())
                    && uuid::Uuid::parse_str(value).is_ok()
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Capture { name: String, converter: Converter },
}

/// A parsed path pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    source: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    /// Parses a pattern such as `ws/posts/<int:post_id>/`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidRoute`] for unknown converters,
    /// empty or duplicate capture names, stray angle brackets, or a
    /// `path` capture that is not the last segment.
    pub fn parse(source: &str) -> Result<Self, GatewayError> {
        let invalid = |reason: &str| GatewayError::InvalidRoute {
            pattern: source.to_string(),
            reason: reason.to_string(),
        };

        let raw: Vec<&str> = source.split('/').collect();
        let last = raw.len().saturating_sub(1);
        let mut segments = Vec::with_capacity(raw.len());
        let mut names: Vec<&str> = Vec::new();

        for (index, part) in raw.iter().enumerate() {
            let Some(inner) = part.strip_prefix('<').and_then(|p| p.strip_suffix('>')) else {
                if part.contains(['<', '>']) {
                    return Err(invalid("captures must span a whole segment"));
                }
                segments.push(Segment::Literal((*part).to_string()));
                continue;
            };

            let (converter, name) = match inner.split_once(':') {
                Some((conv, name)) => (
                    Converter::from_name(conv)
                        .ok_or_else(|| invalid(&format!("unknown converter {conv:?}")))?,
                    name,
                ),
                None => (Converter::Str, inner),
            };
            if name.is_empty() || !name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_') {
                return Err(invalid("capture names must be non-empty identifiers"));
            }
            if names.contains(&name) {
                return Err(invalid(&format!("duplicate capture {name:?}")));
            }
            if converter == Converter::Path && index != last {
                return Err(invalid("a path capture must be the last segment"));
            }
            names.push(name);
            segments.push(Segment::Capture {
                name: name.to_string(),
                converter,
            });
        }

        Ok(Self {
            source: source.to_string(),
            segments,
        })
    }

    /// Pattern source as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Matches a path (without leading `/`), returning the captures.
    #[must_use]
    pub fn matches(&self, path: &str) -> Option<RouteParams> {
        let parts: Vec<&str> = path.split('/').collect();
        let mut params = BTreeMap::new();
        let mut remaining = parts.as_slice();

        for segment in &self.segments {
            match segment {
                Segment::Capture {
                    name,
                    converter: Converter::Path,
                } => {
                    let rest = remaining.join("/");
                    if !Converter::Path.accepts(&rest) {
                        return None;
                    }
                    params.insert(name.clone(), rest);
                    remaining = &[];
                }
                Segment::Literal(literal) => {
                    let (head, tail) = remaining.split_first()?;
                    if *head != literal.as_str() {
                        return None;
                    }
                    remaining = tail;
                }
                Segment::Capture { name, converter } => {
                    let (head, tail) = remaining.split_first()?;
                    if !converter.accepts(head) {
                        return None;
                    }
                    params.insert(name.clone(), (*head).to_string());
                    remaining = tail;
                }
            }
        }

        remaining.is_empty().then_some(RouteParams(params))
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl FromStr for PathPattern {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
