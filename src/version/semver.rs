//! npm-style range handling on top of the `semver` crate
//!
//! Definition repositories and queries use the npm range dialect
//! (`>=1.0.0 <2.0.0`, `1.2.x`, bare versions meaning "exactly this"). The
//! `semver` crate uses Cargo's dialect (comma separated comparators, bare
//! versions meaning caret), so ranges are translated before parsing.

use semver::{BuildMetadata, Comparator, Op, Version, VersionReq};

use crate::version::error::RangeError;

/// Parse a concrete version, accepting a leading `=` and/or `v`
///
/// Examples:
/// - "1.2.3" -> Some(1.2.3)
/// - "v1.2.3" -> Some(1.2.3)
/// - "1.2.x" -> None
pub fn parse_concrete(version: &str) -> Option<Version> {
    let version = version.trim();
    let version = version.strip_prefix('=').unwrap_or(version).trim_start();
    let version = version.strip_prefix('v').unwrap_or(version);
    Version::parse(version).ok()
}

/// Parse an npm-style range into a [`VersionReq`]
///
/// Supports space-separated comparators (all must hold), `a - b` hyphen ranges,
/// `x`/`X`/`*` wildcards, bare versions (exact) and an optional `v` prefix.
/// Disjunctions (`||`) cannot be represented and are rejected.
pub fn parse_range(range: &str) -> Result<VersionReq, RangeError> {
    let trimmed = range.trim();
    if trimmed.contains("||") {
        return Err(RangeError::NonContiguous(range.to_string()));
    }

    let invalid = |reason: String| RangeError::Invalid {
        range: range.to_string(),
        reason,
    };

    let comparators: Vec<String> = split_comparators(trimmed)
        .map_err(invalid)?
        .iter()
        .filter_map(|token| translate_comparator(token))
        .collect();

    if comparators.is_empty() {
        return Ok(VersionReq::STAR);
    }

    VersionReq::parse(&comparators.join(", ")).map_err(|e| invalid(e.to_string()))
}

/// Split a range into comparator tokens, expanding hyphen ranges
fn split_comparators(range: &str) -> Result<Vec<String>, String> {
    let words: Vec<&str> = range.split_whitespace().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < words.len() {
        let word = words[i];

        // "1.0.0 - 2.0.0"
        if words.get(i + 1) == Some(&"-") {
            let Some(to) = words.get(i + 2) else {
                return Err("hyphen range is missing its upper bound".to_string());
            };
            tokens.push(format!(">={}", word));
            tokens.push(format!("<={}", to));
            i += 3;
            continue;
        }

        // ">= 1.0.0"
        if word.chars().all(is_operator_char) {
            let Some(version) = words.get(i + 1) else {
                return Err(format!("operator '{}' is missing a version", word));
            };
            tokens.push(format!("{}{}", word, version));
            i += 2;
            continue;
        }

        tokens.push(word.to_string());
        i += 1;
    }

    Ok(tokens)
}

fn is_operator_char(c: char) -> bool {
    matches!(c, '<' | '>' | '=' | '^' | '~')
}

fn is_wildcard(part: &str) -> bool {
    matches!(part, "x" | "X" | "*")
}

/// Translate one npm comparator into Cargo syntax
///
/// Returns None when the comparator matches every version (`*`, `x.x.x`).
fn translate_comparator(token: &str) -> Option<String> {
    let split = token
        .find(|c: char| !is_operator_char(c))
        .unwrap_or(token.len());
    let (op, version) = token.split_at(split);
    let version = version.strip_prefix('v').unwrap_or(version);

    let parts: Vec<&str> = version.split('.').collect();
    let first_wildcard = parts.iter().position(|p| is_wildcard(p));
    let concrete = match first_wildcard {
        Some(i) => &parts[..i],
        None => &parts[..],
    };

    if concrete.is_empty() || concrete.iter().all(|p| p.is_empty()) {
        return None;
    }

    let body = concrete.join(".");
    let is_partial = concrete.len() < 3;

    Some(match (op, is_partial) {
        // A bare partial version is an x-range in npm, caret in Cargo
        ("", true) => format!("{}.*", body),
        // A bare full version is exact in npm, caret in Cargo
        ("", false) => format!("={}", body),
        (op, _) => format!("{}{}", op, body),
    })
}

/// One end of an interval
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bound {
    pub version: Version,
    pub inclusive: bool,
}

impl Bound {
    fn closed(version: Version) -> Self {
        Self {
            version,
            inclusive: true,
        }
    }

    fn open(version: Version) -> Self {
        Self {
            version,
            inclusive: false,
        }
    }
}

/// A requirement reduced to a single interval
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bounds {
    pub lower: Option<Bound>,
    pub upper: Option<Bound>,
}

impl Bounds {
    /// Intersect the intervals of every comparator in `req`
    pub fn of(req: &VersionReq) -> Result<Self, RangeError> {
        req.comparators
            .iter()
            .try_fold(Bounds::default(), |acc, comparator| {
                Ok(acc.intersect(comparator_bounds(comparator)?))
            })
    }

    /// True when both ends are bounded
    pub fn is_two_sided(&self) -> bool {
        self.lower.is_some() && self.upper.is_some()
    }

    /// Lowest version of the interval, `0.0.0` when unbounded below
    pub fn lower_version(&self) -> Version {
        self.lower
            .as_ref()
            .map(|b| b.version.clone())
            .unwrap_or_else(|| Version::new(0, 0, 0))
    }

    pub fn contains(&self, version: &Version) -> bool {
        let above_lower = self.lower.as_ref().is_none_or(|l| {
            *version > l.version || (l.inclusive && *version == l.version)
        });
        let below_upper = self.upper.as_ref().is_none_or(|u| {
            *version < u.version || (u.inclusive && *version == u.version)
        });
        above_lower && below_upper
    }

    /// True when every version of `self` is greater than every version of `other`
    pub fn is_entirely_above(&self, other: &Bounds) -> bool {
        other.is_entirely_below(self)
    }

    /// True when every version of `self` is less than every version of `other`
    pub fn is_entirely_below(&self, other: &Bounds) -> bool {
        match (&self.upper, &other.lower) {
            (Some(upper), Some(lower)) => {
                upper.version < lower.version
                    || (upper.version == lower.version && !(upper.inclusive && lower.inclusive))
            }
            _ => false,
        }
    }

    fn intersect(self, other: Bounds) -> Bounds {
        Bounds {
            lower: tighter(self.lower, other.lower, |a, b| {
                a.version > b.version || (a.version == b.version && !a.inclusive)
            }),
            upper: tighter(self.upper, other.upper, |a, b| {
                a.version < b.version || (a.version == b.version && !a.inclusive)
            }),
        }
    }
}

fn tighter(a: Option<Bound>, b: Option<Bound>, a_wins: impl Fn(&Bound, &Bound) -> bool) -> Option<Bound> {
    match (a, b) {
        (Some(a), Some(b)) => Some(if a_wins(&a, &b) { a } else { b }),
        (a, b) => a.or(b),
    }
}

/// Interval covered by a single comparator
fn comparator_bounds(c: &Comparator) -> Result<Bounds, RangeError> {
    let major = c.major;
    let base = Version {
        major,
        minor: c.minor.unwrap_or(0),
        patch: c.patch.unwrap_or(0),
        pre: c.pre.clone(),
        build: BuildMetadata::EMPTY,
    };
    let is_full = c.minor.is_some() && c.patch.is_some();
    // First version past the span a partial comparator names
    let span_end = || -> Result<Version, RangeError> {
        Ok(match c.minor {
            None => Version::new(bump(c, major)?, 0, 0),
            Some(minor) => Version::new(major, bump(c, minor)?, 0),
        })
    };

    let (lower, upper) = match c.op {
        Op::Exact | Op::Wildcard if is_full => {
            (Some(Bound::closed(base.clone())), Some(Bound::closed(base)))
        }
        Op::Exact | Op::Wildcard => (Some(Bound::closed(base)), Some(Bound::open(span_end()?))),
        Op::Greater if is_full => (Some(Bound::open(base)), None),
        Op::Greater => (Some(Bound::closed(span_end()?)), None),
        Op::GreaterEq => (Some(Bound::closed(base)), None),
        Op::Less => (None, Some(Bound::open(base))),
        Op::LessEq if is_full => (None, Some(Bound::closed(base))),
        Op::LessEq => (None, Some(Bound::open(span_end()?))),
        Op::Tilde => (Some(Bound::closed(base)), Some(Bound::open(span_end_tilde(c)?))),
        Op::Caret => (Some(Bound::closed(base)), Some(Bound::open(span_end_caret(c)?))),
        _ => {
            return Err(RangeError::Invalid {
                range: c.to_string(),
                reason: "unsupported comparator".to_string(),
            });
        }
    };

    Ok(Bounds { lower, upper })
}

fn span_end_tilde(c: &Comparator) -> Result<Version, RangeError> {
    Ok(match c.minor {
        Some(minor) => Version::new(c.major, bump(c, minor)?, 0),
        None => Version::new(bump(c, c.major)?, 0, 0),
    })
}

fn span_end_caret(c: &Comparator) -> Result<Version, RangeError> {
    Ok(match (c.major, c.minor, c.patch) {
        (major, _, _) if major > 0 => Version::new(bump(c, major)?, 0, 0),
        (_, Some(minor), _) if minor > 0 => Version::new(0, bump(c, minor)?, 0),
        (_, Some(_), Some(patch)) => Version::new(0, 0, bump(c, patch)?),
        (_, Some(_), None) => Version::new(0, 1, 0),
        (_, None, _) => Version::new(1, 0, 0),
    })
}

/// Next value of a version part, failing when the part is already at its maximum
fn bump(c: &Comparator, part: u64) -> Result<u64, RangeError> {
    part.checked_add(1).ok_or_else(|| RangeError::Invalid {
        range: c.to_string(),
        reason: "version part too large".to_string(),
    })
}

/// Version used for ordering, with wildcards read as `0`
///
/// Examples:
/// - "1.2.x" -> 1.2.0
/// - "^2.x.x" -> 2.0.0
/// - "garbage" -> 0.0.0
pub fn zeroed_version(version: &str) -> Version {
    let stripped = version.trim_start_matches(is_operator_char);
    let stripped = stripped.strip_prefix('v').unwrap_or(stripped);
    let zeroed: Vec<&str> = stripped
        .split('.')
        .map(|p| if is_wildcard(p) { "0" } else { p })
        .collect();
    let normalized = match zeroed.len() {
        1 => format!("{}.0.0", zeroed[0]),
        2 => format!("{}.{}.0", zeroed[0], zeroed[1]),
        _ => zeroed.join("."),
    };
    Version::parse(&normalized).unwrap_or_else(|_| Version::new(0, 0, 0))
}
