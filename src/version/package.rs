//! Package version model
//!
//! A [`PackageVersion`] is either a concrete version (`1.2.3`), a wildcard
//! version (`1.2.x`), or one half of a range. Ranges are formed by chaining the
//! lower-bound node to an `upper_bound` node:
//!
//! ```text
//! >=0.25.x ──upper_bound──▶ <=0.30.x
//! ```

use std::fmt;
use std::str::FromStr;

use semver::VersionReq;

use crate::version::error::{RangeError, VersionError};
use crate::version::semver::parse_range;

/// One component of a version triple
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VersionPart {
    Num(u64),
    /// The `x` wildcard
    Wildcard,
}

impl VersionPart {
    /// Parse a canonical decimal number or `x`
    ///
    /// Leading zeros are rejected so that rendering the parsed value gives back
    /// the original text.
    pub fn parse(part: &str) -> Option<Self> {
        if part == "x" {
            return Some(VersionPart::Wildcard);
        }
        parse_canonical_number(part).map(VersionPart::Num)
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self, VersionPart::Wildcard)
    }

    /// Numeric value with the wildcard read as `0`
    pub fn zeroed(&self) -> u64 {
        match self {
            VersionPart::Num(n) => *n,
            VersionPart::Wildcard => 0,
        }
    }
}

impl fmt::Display for VersionPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionPart::Num(n) => write!(f, "{}", n),
            VersionPart::Wildcard => f.write_str("x"),
        }
    }
}

/// Parse a decimal number without sign or leading zeros
pub fn parse_canonical_number(part: &str) -> Option<u64> {
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if part.len() > 1 && part.starts_with('0') {
        return None;
    }
    part.parse().ok()
}

/// Range operator attached to a [`PackageVersion`] node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RangeOp {
    Gte,
    Lte,
    Caret,
    Eq,
}

impl RangeOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            RangeOp::Gte => ">=",
            RangeOp::Lte => "<=",
            RangeOp::Caret => "^",
            RangeOp::Eq => "=",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageVersion {
    pub major: VersionPart,
    pub minor: VersionPart,
    pub patch: VersionPart,
    pub range: Option<RangeOp>,
    /// Only set on the lower-bound node of a range pair
    pub upper_bound: Option<Box<PackageVersion>>,
}

impl PackageVersion {
    pub fn new(major: VersionPart, minor: VersionPart, patch: VersionPart) -> Self {
        Self {
            major,
            minor,
            patch,
            range: None,
            upper_bound: None,
        }
    }

    /// `x.x.x`
    pub fn wildcard() -> Self {
        Self::new(
            VersionPart::Wildcard,
            VersionPart::Wildcard,
            VersionPart::Wildcard,
        )
    }

    pub fn with_range(mut self, range: RangeOp) -> Self {
        self.range = Some(range);
        self
    }

    pub fn with_upper_bound(mut self, upper: PackageVersion) -> Self {
        self.upper_bound = Some(Box::new(upper));
        self
    }

    /// Parse a `major.minor.patch` triple whose parts are numbers or `x`
    pub fn parse_triple(s: &str) -> Option<Self> {
        let mut parts = s.split('.');
        let major = VersionPart::parse(parts.next()?)?;
        let minor = VersionPart::parse(parts.next()?)?;
        let patch = VersionPart::parse(parts.next()?)?;
        if parts.next().is_some() {
            return None;
        }
        Some(Self::new(major, minor, patch))
    }

    /// Convert to a requirement usable for containment tests
    pub fn to_version_req(&self) -> Result<VersionReq, RangeError> {
        parse_range(&self.to_string())
    }
}

/// Render `major.minor.patch`, keeping `x` for wildcard parts
pub fn version_to_string(version: &PackageVersion) -> String {
    format!("{}.{}.{}", version.major, version.minor, version.patch)
}

impl fmt::Display for PackageVersion {
    /// Range-aware rendering, e.g. `>=0.25.x <=0.30.x`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(range) = self.range {
            f.write_str(range.as_str())?;
        }
        f.write_str(&version_to_string(self))?;
        if let Some(upper) = &self.upper_bound {
            write!(f, " {}", upper)?;
        }
        Ok(())
    }
}

impl FromStr for PackageVersion {
    type Err = VersionError;

    /// Parse `major.minor.patch`, optionally prefixed with `v`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let triple = s.strip_prefix('v').unwrap_or(s);
        Self::parse_triple(triple).ok_or_else(|| VersionError::Malformed(s.to_string()))
    }
}
