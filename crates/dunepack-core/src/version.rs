//! Package version parsing, ordering and constraint matching.
//!
//! Versions are either dotted releases (`2.7`, `2.3.0`, `1.8.18`) or named
//! development lines (`master`, `develop`, ...). Ordering rules:
//! - Segments are split on `.`, `-` and `_`
//! - Numeric segments compare as numbers and sort above text segments
//! - A version that is a strict prefix of another sorts first (`2.7 < 2.7.1`)
//! - Development lines sort above every release

use std::cmp::Ordering;
use std::fmt;

use serde::{Serialize, Serializer};

use dunepack_util::errors::DunepackError;

/// Development line names, lowest first.
const DEVELOPMENT_LINES: &[&str] = &["trunk", "head", "master", "main", "develop"];

/// A parsed version with comparable segments.
#[derive(Debug, Clone)]
pub struct Version {
    original: String,
    kind: Kind,
}

#[derive(Debug, Clone, Eq, PartialEq)]
enum Kind {
    Release(Vec<Segment>),
    Line(usize),
}

#[derive(Debug, Clone, Eq, PartialEq)]
enum Segment {
    Numeric(u64),
    Text(String),
}

impl Version {
    pub fn parse(version: &str) -> Result<Self, DunepackError> {
        let s = version.trim();
        if s.is_empty() {
            return Err(invalid(version, "empty version"));
        }
        if let Some(c) = s
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_')))
        {
            return Err(invalid(version, &format!("unexpected character '{c}'")));
        }

        let lowered = s.to_ascii_lowercase();
        let kind = match DEVELOPMENT_LINES.iter().position(|l| *l == lowered) {
            Some(rank) => Kind::Line(rank),
            None => Kind::Release(parse_segments(s)),
        };
        Ok(Self {
            original: s.to_string(),
            kind,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.original
    }

    /// Whether this is a named development line such as `master`.
    pub fn is_development(&self) -> bool {
        matches!(self.kind, Kind::Line(_))
    }

    /// `true` if `self` equals `prefix` or extends it with more segments,
    /// so `2.7.1` starts with `2.7` but `2.70` does not.
    pub fn starts_with(&self, prefix: &Version) -> bool {
        match (&self.kind, &prefix.kind) {
            (Kind::Release(a), Kind::Release(b)) => a.len() >= b.len() && a[..b.len()] == b[..],
            (Kind::Line(a), Kind::Line(b)) => a == b,
            _ => false,
        }
    }
}

fn invalid(input: &str, message: &str) -> DunepackError {
    DunepackError::SpecParse {
        input: input.to_string(),
        message: message.to_string(),
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

impl Eq for Version {}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        match (&self.kind, &other.kind) {
            (Kind::Line(a), Kind::Line(b)) => a.cmp(b),
            (Kind::Line(_), Kind::Release(_)) => Ordering::Greater,
            (Kind::Release(_), Kind::Line(_)) => Ordering::Less,
            (Kind::Release(a), Kind::Release(b)) => compare_releases(a, b),
        }
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.original)
    }
}

fn compare_releases(a: &[Segment], b: &[Segment]) -> Ordering {
    for (x, y) in a.iter().zip(b) {
        let ord = match (x, y) {
            (Segment::Numeric(x), Segment::Numeric(y)) => x.cmp(y),
            (Segment::Numeric(_), Segment::Text(_)) => Ordering::Greater,
            (Segment::Text(_), Segment::Numeric(_)) => Ordering::Less,
            (Segment::Text(x), Segment::Text(y)) => x.to_lowercase().cmp(&y.to_lowercase()),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    a.len().cmp(&b.len())
}

fn parse_segments(version: &str) -> Vec<Segment> {
    version
        .split(['.', '-', '_'])
        .filter(|t| !t.is_empty())
        .map(|t| match t.parse::<u64>() {
            Ok(n) => Segment::Numeric(n),
            Err(_) => Segment::Text(t.to_string()),
        })
        .collect()
}

/// One alternative of a version constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionRange {
    /// `@2.7`: the version itself or any version extending it (`2.7.1`).
    Exact(Version),
    /// `@lo:hi`, `@lo:`, `@:hi`. Both bounds inclusive; the upper bound
    /// also admits versions extending it.
    Between {
        lower: Option<Version>,
        upper: Option<Version>,
    },
}

impl VersionRange {
    pub fn contains(&self, version: &Version) -> bool {
        match self {
            VersionRange::Exact(v) => version.starts_with(v),
            VersionRange::Between { lower, upper } => {
                if lower.as_ref().is_some_and(|lo| version < lo) {
                    return false;
                }
                match upper {
                    Some(hi) => version <= hi || version.starts_with(hi),
                    None => true,
                }
            }
        }
    }
}

/// The `@...` part of a spec: a comma-separated list of ranges, any of
/// which may match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionConstraint {
    original: String,
    ranges: Vec<VersionRange>,
}

impl VersionConstraint {
    /// Parse `2.7`, `3.3.4:`, `:2.7`, `2.6:2.7` or a comma list of those.
    pub fn parse(constraint: &str) -> Result<Self, DunepackError> {
        let s = constraint.trim();
        if s.is_empty() {
            return Err(invalid(constraint, "empty version constraint"));
        }
        let mut ranges = Vec::new();
        for part in s.split(',') {
            let part = part.trim();
            let range = match part.split_once(':') {
                Some((lo, hi)) => {
                    if lo.trim().is_empty() && hi.trim().is_empty() {
                        return Err(invalid(constraint, "range needs at least one bound"));
                    }
                    VersionRange::Between {
                        lower: parse_bound(lo)?,
                        upper: parse_bound(hi)?,
                    }
                }
                None => VersionRange::Exact(Version::parse(part)?),
            };
            ranges.push(range);
        }
        Ok(Self {
            original: s.to_string(),
            ranges,
        })
    }

    pub fn matches(&self, version: &Version) -> bool {
        self.ranges.iter().any(|r| r.contains(version))
    }

    pub fn as_str(&self) -> &str {
        &self.original
    }
}

fn parse_bound(bound: &str) -> Result<Option<Version>, DunepackError> {
    let bound = bound.trim();
    if bound.is_empty() {
        Ok(None)
    } else {
        Version::parse(bound).map(Some)
    }
}

impl fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}
