//! Version Comparator
//!
//! Parses dotted API version strings ("1.13.0", "v1.14") into an orderable
//! value. Missing trailing components compare as zero, so "1.13" equals
//! "1.13.0". A pre-release suffix ("1.14.0-rc1") sorts before the release it
//! precedes; build metadata ("+abc") is ignored.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Error returned when a version string cannot be parsed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("empty version string")]
    Empty,

    #[error("invalid version {input:?}: segment {segment:?} is not a non-negative integer")]
    InvalidSegment { input: String, segment: String },

    #[error("invalid version {input:?}: empty pre-release identifier")]
    InvalidPreRelease { input: String },
}

/// A parsed API version
#[derive(Debug, Clone)]
pub struct Version {
    segments: Vec<u64>,
    pre: Option<String>,
    original: String,
}

impl Version {
    /// Parse a version string
    pub fn parse(input: &str) -> Result<Self, ParseError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ParseError::Empty);
        }

        // A single leading alphabetic marker is allowed ("v1.2.3")
        let body = match trimmed.chars().next() {
            Some(c) if c.is_ascii_alphabetic() => &trimmed[1..],
            _ => trimmed,
        };
        if body.is_empty() {
            return Err(ParseError::Empty);
        }

        let body = body.split_once('+').map_or(body, |(core, _build)| core);

        let (core, pre) = match body.split_once('-') {
            Some((core, pre)) => {
                if pre.is_empty() || pre.split('.').any(str::is_empty) {
                    return Err(ParseError::InvalidPreRelease {
                        input: input.to_string(),
                    });
                }
                (core, Some(pre.to_string()))
            }
            None => (body, None),
        };

        let segments = core
            .split('.')
            .map(|segment| parse_segment(input, segment))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            segments,
            pre,
            original: input.to_string(),
        })
    }

    /// Numeric components as parsed (without zero padding)
    pub fn segments(&self) -> &[u64] {
        &self.segments
    }

    /// Pre-release identifier, if any
    pub fn pre_release(&self) -> Option<&str> {
        self.pre.as_deref()
    }

    /// The string this version was parsed from
    pub fn as_str(&self) -> &str {
        &self.original
    }
}

fn parse_segment(input: &str, segment: &str) -> Result<u64, ParseError> {
    if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ParseError::InvalidSegment {
            input: input.to_string(),
            segment: segment.to_string(),
        });
    }
    segment.parse().map_err(|_| ParseError::InvalidSegment {
        input: input.to_string(),
        segment: segment.to_string(),
    })
}

/// Compare two versions component-wise, padding the shorter with zeros
pub fn compare(a: &Version, b: &Version) -> Ordering {
    a.cmp(b)
}

fn compare_pre(a: Option<&str>, b: Option<&str>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => {
            let mut left = a.split('.');
            let mut right = b.split('.');
            loop {
                match (left.next(), right.next()) {
                    (None, None) => return Ordering::Equal,
                    (None, Some(_)) => return Ordering::Less,
                    (Some(_), None) => return Ordering::Greater,
                    (Some(x), Some(y)) => {
                        let ord = match (x.parse::<u64>(), y.parse::<u64>()) {
                            (Ok(x), Ok(y)) => x.cmp(&y),
                            (Ok(_), Err(_)) => Ordering::Less,
                            (Err(_), Ok(_)) => Ordering::Greater,
                            (Err(_), Err(_)) => x.cmp(y),
                        };
                        if ord != Ordering::Equal {
                            return ord;
                        }
                    }
                }
            }
        }
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.segments.len().max(other.segments.len());
        for i in 0..len {
            let a = self.segments.get(i).copied().unwrap_or(0);
            let b = other.segments.get(i).copied().unwrap_or(0);
            match a.cmp(&b) {
                Ordering::Equal => continue,
                ord => return ord,
            }
        }
        compare_pre(self.pre.as_deref(), other.pre.as_deref())
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl FromStr for Version {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self
            .segments
            .iter()
            .map(u64::to_string)
            .collect::<Vec<_>>()
            .join(".");
        match &self.pre {
            Some(pre) => write!(f, "{}-{}", joined, pre),
            None => write!(f, "{}", joined),
        }
    }
}
