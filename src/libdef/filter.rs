//! LibDef query matching
//!
//! Two independent axes are matched:
//! - package: name (exact or fuzzy) and, for exact queries, version
//! - checker: optional checker version that must fall inside the def's range
//!
//! Declared package versions are read as caret ranges (`foo_v2.2.x` means
//! `^2.2.x`) unless they start with `=` or `^`.

use std::cmp::Reverse;

use semver::{Version, VersionReq};
use tracing::debug;

use crate::libdef::LibDef;
use crate::libdef::error::MatchError;
use crate::version::checker::CheckerVersion;
use crate::version::error::RangeError;
use crate::version::package::RangeOp;
use crate::version::semver::{Bounds, parse_concrete, parse_range, zeroed_version};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LibDefFilter {
    /// Case-insensitive substring match on the package name
    Fuzzy {
        term: String,
        checker_version_str: Option<String>,
    },
    /// Case-insensitive name match plus package version match
    Exact {
        pkg_name: String,
        pkg_version_str: String,
        checker_version_str: Option<String>,
    },
    /// Case-insensitive name match, any package version
    ExactName {
        term: String,
        checker_version_str: Option<String>,
    },
}

impl LibDefFilter {
    /// Build a filter from its tag (`fuzzy`, `exact`, `exact-name`)
    ///
    /// For `exact`, `term` is `<name>@<version>`.
    pub fn from_tag(
        tag: &str,
        term: &str,
        checker_version_str: Option<String>,
    ) -> Result<Self, MatchError> {
        match tag {
            "fuzzy" => Ok(LibDefFilter::Fuzzy {
                term: term.to_string(),
                checker_version_str,
            }),
            "exact-name" => Ok(LibDefFilter::ExactName {
                term: term.to_string(),
                checker_version_str,
            }),
            "exact" => {
                // The name itself may start with '@' for scoped packages
                let (pkg_name, pkg_version_str) = term
                    .rsplit_once('@')
                    .filter(|(name, version)| !name.is_empty() && !version.is_empty())
                    .ok_or_else(|| MatchError::MissingVersion(term.to_string()))?;
                Ok(LibDefFilter::Exact {
                    pkg_name: pkg_name.to_string(),
                    pkg_version_str: pkg_version_str.to_string(),
                    checker_version_str,
                })
            }
            other => Err(MatchError::UnknownFilter(other.to_string())),
        }
    }

    pub fn checker_version_str(&self) -> Option<&str> {
        match self {
            LibDefFilter::Fuzzy {
                checker_version_str,
                ..
            }
            | LibDefFilter::Exact {
                checker_version_str,
                ..
            }
            | LibDefFilter::ExactName {
                checker_version_str,
                ..
            } => checker_version_str.as_deref(),
        }
    }

    fn matches_package(&self, def: &LibDef) -> Result<bool, MatchError> {
        match self {
            LibDefFilter::Exact {
                pkg_name,
                pkg_version_str,
                ..
            } => Ok(package_name_match(&def.pkg_name, pkg_name)
                && libdef_matches_package_version(pkg_version_str, &def.pkg_version_str)?),
            LibDefFilter::ExactName { term, .. } => Ok(package_name_match(&def.pkg_name, term)),
            LibDefFilter::Fuzzy { term, .. } => Ok(def
                .pkg_name
                .to_lowercase()
                .contains(&term.to_lowercase())),
        }
    }
}

fn package_name_match(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

/// Parse a declared libdef range; disjunctions are a broken repository
fn declared_req(range: &str, declared: &str) -> Result<VersionReq, MatchError> {
    parse_range(range).map_err(|e| match e {
        RangeError::NonContiguous(_) => MatchError::NonContiguousRange(declared.to_string()),
        other => MatchError::Range(other),
    })
}

/// Check a queried package version against a libdef's declared version
///
/// - concrete query: tested against the declared range
/// - concrete declared version (`=1.2.0`): tested against the query range
/// - both ranges: the declared range must be a single two-sided interval that
///   is neither entirely above nor entirely below the query, and the query's
///   lower bound must fall inside it
pub fn libdef_matches_package_version(
    pkg_version: &str,
    declared_version: &str,
) -> Result<bool, MatchError> {
    let declared_range = if declared_version.starts_with('=') || declared_version.starts_with('^') {
        declared_version.to_string()
    } else {
        format!("^{}", declared_version)
    };

    if let Some(version) = parse_concrete(pkg_version) {
        return Ok(declared_req(&declared_range, declared_version)?.matches(&version));
    }

    if let Some(version) = parse_concrete(&declared_range) {
        return Ok(parse_range(pkg_version)?.matches(&version));
    }

    let pkg_bounds = Bounds::of(&parse_range(pkg_version)?)?;
    let declared_bounds = Bounds::of(&declared_req(&declared_range, declared_version)?)?;

    if !declared_bounds.is_two_sided() {
        return Err(MatchError::NonContiguousRange(declared_version.to_string()));
    }

    if declared_bounds.is_entirely_above(&pkg_bounds)
        || declared_bounds.is_entirely_below(&pkg_bounds)
    {
        return Ok(false);
    }

    Ok(declared_bounds.contains(&pkg_bounds.lower_version()))
}

fn satisfies(checker_version: &CheckerVersion, version: &Version) -> Result<bool, MatchError> {
    let req = checker_version.to_package_version()?.to_version_req()?;
    Ok(req.matches(version))
}

/// Check that a queried checker version falls inside a libdef's checker version
///
/// A range with an upper bound is tested as two checks, the range with its
/// upper bound dropped and `<=upper`, so both closed and half-open ranges are
/// satisfied correctly.
pub fn libdef_matches_checker_version(def: &LibDef, checker_version: &str) -> Result<bool, MatchError> {
    let Some(version) = parse_concrete(checker_version) else {
        debug!("Ignoring unparseable checker version '{}'", checker_version);
        return Ok(false);
    };

    match &def.checker_version {
        CheckerVersion::Ranged {
            lower,
            upper: Some(upper),
        } => {
            let lower_ok = match lower {
                Some(_) => satisfies(
                    &CheckerVersion::Ranged {
                        lower: *lower,
                        upper: None,
                    },
                    &version,
                )?,
                None => true,
            };
            let upper_ok = upper
                .to_package_version()
                .with_range(RangeOp::Lte)
                .to_version_req()?
                .matches(&version);
            Ok(lower_ok && upper_ok)
        }
        other => satisfies(other, &version),
    }
}

/// Filter `defs` down to those matching `filter`, newest package version first
///
/// Wildcard parts count as `0` when ordering.
pub fn filter_libdefs(defs: &[LibDef], filter: &LibDefFilter) -> Result<Vec<LibDef>, MatchError> {
    let mut matched = Vec::new();
    for def in defs {
        if !filter.matches_package(def)? {
            continue;
        }
        if let Some(checker_version) = filter.checker_version_str() {
            if !libdef_matches_checker_version(def, checker_version)? {
                continue;
            }
        }
        matched.push(def.clone());
    }

    matched.sort_by_cached_key(|def| Reverse(zeroed_version(&def.pkg_version_str)));
    Ok(matched)
}
