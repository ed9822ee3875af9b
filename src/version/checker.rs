//! Type-checker version model
//!
//! Every set of definitions is written against some range of checker versions.
//! The range is encoded in the name of the directory holding the definitions:
//!
//! | directory         | meaning                         |
//! |-------------------|---------------------------------|
//! | `all`             | every checker version           |
//! | `v0.25.x`         | exactly 0.25.x                  |
//! | `v0.25.x-`        | 0.25.x and later                |
//! | `-v0.30.x`        | 0.30.x and earlier              |
//! | `v0.25.x-v0.30.x` | 0.25.x through 0.30.x inclusive |

use std::fmt;
use std::str::FromStr;

use crate::version::error::VersionError;
use crate::version::package::{PackageVersion, RangeOp, VersionPart};

/// `major.minor.patch` where each part is a number or `x`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VersionTriple {
    pub major: VersionPart,
    pub minor: VersionPart,
    pub patch: VersionPart,
}

impl VersionTriple {
    pub fn new(major: VersionPart, minor: VersionPart, patch: VersionPart) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let version = PackageVersion::parse_triple(s)?;
        Some(Self::new(version.major, version.minor, version.patch))
    }

    pub fn to_package_version(self) -> PackageVersion {
        PackageVersion::new(self.major, self.minor, self.patch)
    }

    /// Smallest concrete version covered; everything from the first wildcard on is `0`
    fn low(&self) -> [u64; 3] {
        self.fill(0)
    }

    /// Largest concrete version covered; everything from the first wildcard on is the maximum
    fn high(&self) -> [u64; 3] {
        self.fill(u64::MAX)
    }

    fn fill(&self, wildcard: u64) -> [u64; 3] {
        let mut out = [wildcard; 3];
        for (slot, part) in out.iter_mut().zip([self.major, self.minor, self.patch]) {
            match part {
                VersionPart::Num(n) => *slot = n,
                VersionPart::Wildcard => break,
            }
        }
        out
    }
}

impl fmt::Display for VersionTriple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CheckerVersion {
    All,
    Specific(VersionTriple),
    /// Inclusive on both ends; at least one bound is present
    Ranged {
        lower: Option<VersionTriple>,
        upper: Option<VersionTriple>,
    },
}

impl CheckerVersion {
    /// Parse a checker-version directory name
    pub fn parse_dir_name(name: &str) -> Result<Self, VersionError> {
        let malformed = |reason: &str| VersionError::MalformedDirName {
            name: name.to_string(),
            reason: reason.to_string(),
        };

        if name == "all" {
            return Ok(CheckerVersion::All);
        }

        if let Some((lower, upper)) = name.split_once('-') {
            let lower = parse_bound(lower).ok_or_else(|| malformed("invalid lower bound"))?;
            let upper = parse_bound(upper).ok_or_else(|| malformed("invalid upper bound"))?;
            return match (lower, upper) {
                (None, None) => Err(malformed("a range needs at least one bound")),
                (Some(l), Some(u)) if l.low() > u.high() => {
                    Err(malformed("lower bound is greater than upper bound"))
                }
                (lower, upper) => Ok(CheckerVersion::Ranged { lower, upper }),
            };
        }

        name.strip_prefix('v')
            .and_then(VersionTriple::parse)
            .map(CheckerVersion::Specific)
            .ok_or_else(|| {
                malformed("expected 'all', 'v<MAJOR>.<MINOR>.<PATCH>' or a '-' separated range")
            })
    }

    /// Render the directory name; inverse of [`CheckerVersion::parse_dir_name`]
    pub fn to_dir_name(&self) -> String {
        match self {
            CheckerVersion::All => "all".to_string(),
            CheckerVersion::Specific(ver) => format!("v{}", ver),
            CheckerVersion::Ranged { lower, upper } => {
                let render = |bound: &Option<VersionTriple>| {
                    bound.map(|b| format!("v{}", b)).unwrap_or_default()
                };
                format!("{}-{}", render(lower), render(upper))
            }
        }
    }

    /// Convert into the unified range representation
    ///
    /// - `All` -> `x.x.x`
    /// - `Specific` -> its triple
    /// - `Ranged` -> `>=lower` chained to `<=upper`, or `<=upper` alone
    pub fn to_package_version(&self) -> Result<PackageVersion, VersionError> {
        match self {
            CheckerVersion::All => Ok(PackageVersion::wildcard()),
            CheckerVersion::Specific(ver) => Ok(ver.to_package_version()),
            CheckerVersion::Ranged {
                lower: Some(lower),
                upper,
            } => {
                let version = lower.to_package_version().with_range(RangeOp::Gte);
                Ok(match upper {
                    Some(upper) => version
                        .with_upper_bound(upper.to_package_version().with_range(RangeOp::Lte)),
                    None => version,
                })
            }
            CheckerVersion::Ranged {
                lower: None,
                upper: Some(upper),
            } => Ok(upper.to_package_version().with_range(RangeOp::Lte)),
            CheckerVersion::Ranged {
                lower: None,
                upper: None,
            } => Err(VersionError::EmptyRange),
        }
    }

    /// Inclusive interval of concrete versions covered
    fn interval(&self) -> ([u64; 3], [u64; 3]) {
        match self {
            CheckerVersion::All => ([0; 3], [u64::MAX; 3]),
            CheckerVersion::Specific(ver) => (ver.low(), ver.high()),
            CheckerVersion::Ranged { lower, upper } => (
                lower.map(|l| l.low()).unwrap_or([0; 3]),
                upper.map(|u| u.high()).unwrap_or([u64::MAX; 3]),
            ),
        }
    }

    /// True when some concrete version is covered by both
    pub fn overlaps(&self, other: &CheckerVersion) -> bool {
        let (a_low, a_high) = self.interval();
        let (b_low, b_high) = other.interval();
        a_low <= b_high && b_low <= a_high
    }
}

fn parse_bound(bound: &str) -> Option<Option<VersionTriple>> {
    if bound.is_empty() {
        return Some(None);
    }
    bound
        .strip_prefix('v')
        .and_then(VersionTriple::parse)
        .map(Some)
}

impl fmt::Display for CheckerVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_dir_name())
    }
}

impl FromStr for CheckerVersion {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_dir_name(s)
    }
}

/// True when no two of `versions` cover a common concrete version
pub fn disjoint_versions_all(versions: &[CheckerVersion]) -> bool {
    versions.iter().enumerate().all(|(i, a)| {
        versions[i + 1..]
            .iter()
            .all(|b| !a.overlaps(b))
    })
}
