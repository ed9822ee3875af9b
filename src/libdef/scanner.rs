//! Definitions tree scanner
//!
//! Turns a `definitions/npm` directory into [`LibDef`]s. Naming problems are
//! recorded in a [`ValidationErrors`] sink and never stop the scan, so one pass
//! reports every problem in the tree.
//!
//! Layout:
//! ```text
//! definitions/npm/
//!   .cli-metadata.json
//!   foo_v1.x.x/
//!     test_foo.js              shared by every checker version
//!     v0.25.x-/
//!       foo_1.x.x.js           the definition
//!       test_foo_extra.js
//!   @scope/
//!     bar_v2.0.0/...
//! ```

use std::path::{Component, Path, PathBuf};

use futures::future::join_all;
use regex::Regex;
use tracing::{debug, info};

use crate::libdef::LibDef;
use crate::libdef::error::ScanError;
use crate::libdef::validation::ValidationErrors;
use crate::version::checker::{CheckerVersion, disjoint_versions_all};
use crate::version::package::{PackageVersion, VersionPart, parse_canonical_number, version_to_string};

/// Repository metadata file living next to the package directories
pub const METADATA_FILE_NAME: &str = ".cli-metadata.json";

const UNEXPECTED_ITEM: &str = "Unexpected directory item";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryKind {
    File,
    Dir,
    Other,
}

/// Package identity parsed from a `<name>_v<major>.<minor>.<patch>` directory
#[derive(Debug, Clone, PartialEq, Eq)]
struct PkgDir {
    /// Includes the `@scope/` prefix for scoped packages
    name: String,
    version: PackageVersion,
}

impl PkgDir {
    fn base_name(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }

    fn version_str(&self) -> String {
        version_to_string(&self.version)
    }
}

/// Scanning state shared by every branch of one pass
struct ScanContext<'a> {
    root: &'a Path,
    errors: &'a ValidationErrors,
}

impl ScanContext<'_> {
    /// `path` relative to the root, `/` separated
    fn context(&self, path: &Path) -> String {
        let relative = path.strip_prefix(self.root).unwrap_or(path);
        relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("/")
    }

    fn error(&self, path: &Path, message: impl Into<String>) {
        self.errors.push(self.context(path), message);
    }

    async fn entry_kind(&self, path: &Path) -> Option<EntryKind> {
        match tokio::fs::metadata(path).await {
            Ok(meta) if meta.is_dir() => Some(EntryKind::Dir),
            Ok(meta) if meta.is_file() => Some(EntryKind::File),
            Ok(_) => Some(EntryKind::Other),
            Err(e) => {
                self.error(path, format!("Unable to stat: {}", e));
                None
            }
        }
    }

    async fn read_dir(&self, path: &Path) -> Option<Vec<String>> {
        read_dir_names(path)
            .await
            .inspect_err(|e| self.error(path, format!("Unable to read directory: {}", e)))
            .ok()
    }
}

/// Names of the entries in `path`, sorted
async fn read_dir_names(path: &Path) -> std::io::Result<Vec<String>> {
    let mut entries = tokio::fs::read_dir(path).await?;
    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    names.sort();
    Ok(names)
}

fn is_swap_file(name: &str) -> bool {
    name.ends_with(".swp")
}

/// Scanner for definitions directories
pub struct Scanner {
    /// `<name>_v<major>.<minor>.<patch>`
    pkg_dir_re: Regex,
    /// `test_<anything>.js`
    test_file_re: Regex,
}

impl Scanner {
    pub fn new() -> Self {
        Self {
            pkg_dir_re: Regex::new(r"^(.+)_v([0-9]+)\.([0-9]+|x)\.([0-9]+|x)$")
                .expect("package directory pattern is valid"),
            test_file_re: Regex::new(r"^test_.*\.js$").expect("test file pattern is valid"),
        }
    }

    /// Scan `root`, recording naming problems in `errors`
    ///
    /// Only a failure to list `root` itself is returned as an error. The result
    /// is sorted by definition path.
    pub async fn scan(
        &self,
        root: &Path,
        errors: &ValidationErrors,
    ) -> Result<Vec<LibDef>, ScanError> {
        debug!("Scanning definitions in {:?}", root);

        let items = read_dir_names(root).await.map_err(|source| ScanError::Io {
            path: root.to_path_buf(),
            source,
        })?;

        let ctx = ScanContext { root, errors };
        let scans = items
            .into_iter()
            .filter(|item| item != METADATA_FILE_NAME)
            .map(|item| self.scan_root_item(&ctx, item));

        let mut libdefs: Vec<LibDef> = join_all(scans).await.into_iter().flatten().collect();
        libdefs.sort_by(|a, b| a.path.cmp(&b.path));

        info!(
            "Found {} libdefs in {:?} ({} validation errors)",
            libdefs.len(),
            root,
            errors.len()
        );
        Ok(libdefs)
    }

    async fn scan_root_item(&self, ctx: &ScanContext<'_>, item: String) -> Vec<LibDef> {
        let path = ctx.root.join(&item);
        match ctx.entry_kind(&path).await {
            Some(EntryKind::Dir) if item.starts_with('@') => self.scan_scope_dir(ctx, &path, &item).await,
            Some(EntryKind::Dir) => self.scan_pkg_dir(ctx, path, None).await,
            Some(_) => {
                ctx.error(&path, "Expected only directories in the 'definitions/npm' directory!");
                Vec::new()
            }
            None => Vec::new(),
        }
    }

    /// `@scope` directories hold package directories one level deeper
    async fn scan_scope_dir(&self, ctx: &ScanContext<'_>, path: &Path, scope: &str) -> Vec<LibDef> {
        let Some(items) = ctx.read_dir(path).await else {
            return Vec::new();
        };

        let scans = items.into_iter().map(|item| async move {
            let pkg_path = path.join(&item);
            match ctx.entry_kind(&pkg_path).await {
                Some(EntryKind::Dir) => self.scan_pkg_dir(ctx, pkg_path, Some(scope)).await,
                Some(_) => {
                    ctx.error(
                        &pkg_path,
                        "Expected only directories in the 'definitions/npm/@<scope>' directory!",
                    );
                    Vec::new()
                }
                None => Vec::new(),
            }
        });

        join_all(scans).await.into_iter().flatten().collect()
    }

    async fn scan_pkg_dir(
        &self,
        ctx: &ScanContext<'_>,
        path: PathBuf,
        scope: Option<&str>,
    ) -> Vec<LibDef> {
        let pkg = self.parse_pkg_dir(ctx, &path, scope);

        let Some(items) = ctx.read_dir(&path).await else {
            return Vec::new();
        };

        let mut shared_test_files = Vec::new();
        let mut checker_dirs = Vec::new();
        let mut subdir_count = 0;

        for item in items {
            let item_path = path.join(&item);
            match ctx.entry_kind(&item_path).await {
                Some(EntryKind::File) => {
                    if is_swap_file(&item) {
                        continue;
                    }
                    if self.validate_test_file(ctx, &item_path, &item) {
                        shared_test_files.push(item_path);
                    }
                }
                Some(EntryKind::Dir) => {
                    subdir_count += 1;
                    match CheckerVersion::parse_dir_name(&item) {
                        Ok(version) => checker_dirs.push((item_path, version)),
                        Err(e) => ctx.error(&item_path, e.to_string()),
                    }
                }
                Some(EntryKind::Other) => ctx.error(&item_path, UNEXPECTED_ITEM),
                None => {}
            }
        }

        let versions: Vec<CheckerVersion> = checker_dirs.iter().map(|(_, v)| v.clone()).collect();
        if !disjoint_versions_all(&versions) {
            ctx.error(&path, "Checker versions not disjoint!");
        }

        if subdir_count == 0 {
            ctx.error(&path, "No libdef files found!");
        }

        let scans = checker_dirs.into_iter().map(|(dir, version)| {
            self.scan_checker_dir(ctx, pkg.as_ref(), dir, version, &shared_test_files)
        });

        join_all(scans).await.into_iter().flatten().collect()
    }

    async fn scan_checker_dir(
        &self,
        ctx: &ScanContext<'_>,
        pkg: Option<&PkgDir>,
        dir: PathBuf,
        checker_version: CheckerVersion,
        shared_test_files: &[PathBuf],
    ) -> Option<LibDef> {
        let items = ctx.read_dir(&dir).await?;

        let def_file_name = pkg.map(|p| format!("{}_{}.js", p.base_name(), p.version_str()));
        let mut test_file_paths = shared_test_files.to_vec();
        let mut def_path = None;

        for item in items {
            let item_path = dir.join(&item);
            match ctx.entry_kind(&item_path).await {
                Some(EntryKind::File) => {
                    // An unparseable package name was already reported; checking
                    // its files would only produce follow-on noise.
                    let Some(def_file_name) = &def_file_name else {
                        continue;
                    };
                    if is_swap_file(&item) {
                        continue;
                    }
                    if item == *def_file_name {
                        def_path = Some(item_path);
                        continue;
                    }
                    if self.validate_test_file(ctx, &item_path, &item) {
                        test_file_paths.push(item_path);
                    }
                }
                Some(_) => ctx.error(&item_path, UNEXPECTED_ITEM),
                None => {}
            }
        }

        let pkg = pkg?;
        let Some(path) = def_path else {
            ctx.error(&dir, "No libdef file found!");
            return None;
        };

        Some(LibDef {
            pkg_name: pkg.name.clone(),
            pkg_version_str: pkg.version_str(),
            checker_version_str: checker_version.to_dir_name(),
            checker_version,
            path,
            test_file_paths,
        })
    }

    /// Parse the package name and version out of a package directory name
    ///
    /// Returns None (after recording why) when the name is unusable.
    fn parse_pkg_dir(&self, ctx: &ScanContext<'_>, path: &Path, scope: Option<&str>) -> Option<PkgDir> {
        let dir_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let Some(caps) = self.pkg_dir_re.captures(&dir_name) else {
            ctx.error(
                path,
                format!(
                    "'{}' is a malformed definitions/npm/ directory name! \
                     Expected the name to be formatted as <PKGNAME>_v<MAJOR>.<MINOR>.<PATCH>",
                    dir_name
                ),
            );
            return None;
        };

        let major = validate_number_part(ctx, path, "major", &caps[2]);
        let minor = validate_part(ctx, path, "minor", &caps[3]);
        let patch = validate_part(ctx, path, "patch", &caps[4]);
        let (Some(major), Some(minor), Some(patch)) = (major, minor, patch) else {
            return None;
        };

        let name = match scope {
            Some(scope) => format!("{}/{}", scope, &caps[1]),
            None => caps[1].to_string(),
        };

        Some(PkgDir {
            name,
            version: PackageVersion::new(major, minor, patch),
        })
    }

    fn validate_test_file(&self, ctx: &ScanContext<'_>, path: &Path, name: &str) -> bool {
        if self.test_file_re.is_match(name) {
            return true;
        }
        ctx.error(
            path,
            "Malformed test file name! Test files must be formatted as test_(.*).js",
        );
        false
    }
}

impl Default for Scanner {
    fn default() -> Self {
        Self::new()
    }
}

/// Validate a part that must be a number (the major version)
///
/// A non-canonical number such as `01` is reported but still read as its
/// numeric value so the rest of the package can be checked. Only a number too
/// large to represent yields None.
fn validate_number_part(
    ctx: &ScanContext<'_>,
    path: &Path,
    part_name: &str,
    part: &str,
) -> Option<VersionPart> {
    if let Some(num) = parse_canonical_number(part) {
        return Some(VersionPart::Num(num));
    }
    ctx.error(
        path,
        format!("Invalid {} number: '{}'. Expected a number.", part_name, part),
    );
    part.parse().ok().map(VersionPart::Num)
}

/// Validate a part that may be a number or `x`
fn validate_part(
    ctx: &ScanContext<'_>,
    path: &Path,
    part_name: &str,
    part: &str,
) -> Option<VersionPart> {
    if part == "x" {
        return Some(VersionPart::Wildcard);
    }
    validate_number_part(ctx, path, part_name, part)
}

/// Scan a definitions directory
///
/// With a sink, every naming problem is recorded there and the (possibly
/// partial) result is returned. Without one, the first naming problem is
/// returned as [`ScanError::Invalid`].
pub async fn scan_definitions(
    root: &Path,
    errors: Option<&ValidationErrors>,
) -> Result<Vec<LibDef>, ScanError> {
    let scanner = Scanner::new();
    if let Some(errors) = errors {
        return scanner.scan(root, errors).await;
    }

    let errors = ValidationErrors::new();
    let libdefs = scanner.scan(root, &errors).await?;
    match errors.first() {
        Some((context, message)) => Err(ScanError::Invalid { context, message }),
        None => Ok(libdefs),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::fs;
    use tempfile::TempDir;

    /// Create files (and their parent directories) under a fresh root
    fn create_tree(files: &[&str]) -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        for file in files {
            let path = temp_dir.path().join(file);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, "").unwrap();
        }
        temp_dir
    }

    async fn scan(root: &Path) -> (Vec<LibDef>, ValidationErrors) {
        let errors = ValidationErrors::new();
        let libdefs = Scanner::new().scan(root, &errors).await.unwrap();
        (libdefs, errors)
    }

    #[tokio::test]
    async fn scan_finds_single_libdef() {
        let root = create_tree(&["foo_v1.0.0/all/foo_1.0.0.js"]);

        let (libdefs, errors) = scan(root.path()).await;

        assert!(errors.is_empty(), "{}", errors);
        assert_eq!(
            libdefs,
            vec![LibDef {
                pkg_name: "foo".to_string(),
                pkg_version_str: "1.0.0".to_string(),
                checker_version: CheckerVersion::All,
                checker_version_str: "all".to_string(),
                path: root.path().join("foo_v1.0.0/all/foo_1.0.0.js"),
                test_file_paths: vec![],
            }]
        );
    }

    #[tokio::test]
    async fn scan_reports_missing_libdef_file_once() {
        let root = create_tree(&["foo_v1.0.0/all/test_x.js"]);

        let (libdefs, errors) = scan(root.path()).await;

        assert!(libdefs.is_empty());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.get("foo_v1.0.0/all"), vec!["No libdef file found!"]);
    }

    #[tokio::test]
    async fn scan_collects_shared_and_local_test_files() {
        let root = create_tree(&[
            "foo_v1.x.x/test_shared.js",
            "foo_v1.x.x/v0.25.x-/foo_1.x.x.js",
            "foo_v1.x.x/v0.25.x-/test_new.js",
            "foo_v1.x.x/-v0.24.x/foo_1.x.x.js",
        ]);

        let (libdefs, errors) = scan(root.path()).await;

        assert!(errors.is_empty(), "{}", errors);
        assert_eq!(libdefs.len(), 2);

        let shared = root.path().join("foo_v1.x.x/test_shared.js");
        let old = libdefs
            .iter()
            .find(|d| d.checker_version_str == "-v0.24.x")
            .unwrap();
        assert_eq!(old.test_file_paths, vec![shared.clone()]);

        let new = libdefs
            .iter()
            .find(|d| d.checker_version_str == "v0.25.x-")
            .unwrap();
        assert_eq!(
            new.test_file_paths,
            vec![shared, root.path().join("foo_v1.x.x/v0.25.x-/test_new.js")]
        );
    }

    #[tokio::test]
    async fn scan_descends_into_scope_directories() {
        let root = create_tree(&["@babel/core_v7.x.x/all/core_7.x.x.js"]);

        let (libdefs, errors) = scan(root.path()).await;

        assert!(errors.is_empty(), "{}", errors);
        assert_eq!(libdefs.len(), 1);
        assert_eq!(libdefs[0].pkg_name, "@babel/core");
        assert_eq!(libdefs[0].pkg_version_str, "7.x.x");
    }

    #[tokio::test]
    async fn scan_skips_metadata_file() {
        let root = create_tree(&[".cli-metadata.json", "foo_v1.0.0/all/foo_1.0.0.js"]);

        let (libdefs, errors) = scan(root.path()).await;

        assert!(errors.is_empty(), "{}", errors);
        assert_eq!(libdefs.len(), 1);
    }

    #[tokio::test]
    async fn scan_ignores_swap_files() {
        let root = create_tree(&[
            "foo_v1.0.0/.test_foo.js.swp",
            "foo_v1.0.0/all/foo_1.0.0.js",
            "foo_v1.0.0/all/.foo_1.0.0.js.swp",
        ]);

        let (libdefs, errors) = scan(root.path()).await;

        assert!(errors.is_empty(), "{}", errors);
        assert_eq!(libdefs[0].test_file_paths, Vec::<PathBuf>::new());
    }

    #[rstest]
    #[case("README.md", "README.md")]
    #[case("@scope/README.md", "@scope/README.md")]
    #[case("foo_v1.0.0/notes.txt", "foo_v1.0.0/notes.txt")]
    #[case("foo_v1.0.0/all/spec.js", "foo_v1.0.0/all/spec.js")]
    #[tokio::test]
    async fn scan_reports_unexpected_files(#[case] extra: &str, #[case] context: &str) {
        let root = create_tree(&["foo_v1.0.0/all/foo_1.0.0.js", extra]);

        let (libdefs, errors) = scan(root.path()).await;

        assert_eq!(libdefs.len(), 1);
        assert_eq!(errors.contexts(), vec![context.to_string()]);
    }

    #[tokio::test]
    async fn scan_reports_nested_directory_in_checker_dir() {
        let root = create_tree(&[
            "foo_v1.0.0/all/foo_1.0.0.js",
            "foo_v1.0.0/all/nested/test_x.js",
        ]);

        let (libdefs, errors) = scan(root.path()).await;

        assert_eq!(libdefs.len(), 1);
        assert_eq!(
            errors.get("foo_v1.0.0/all/nested"),
            vec!["Unexpected directory item"]
        );
    }

    #[tokio::test]
    async fn scan_reports_malformed_package_dir_without_follow_on_errors() {
        let root = create_tree(&["foo-1.0.0/all/whatever.js"]);

        let (libdefs, errors) = scan(root.path()).await;

        assert!(libdefs.is_empty());
        assert_eq!(errors.len(), 1);
        assert!(errors.contains("foo-1.0.0"));
    }

    #[rstest]
    #[case("foo_v01.0.0", "1.0.0", "Invalid major number: '01'. Expected a number.")]
    #[case("foo_v1.00.0", "1.0.0", "Invalid minor number: '00'. Expected a number.")]
    #[case("foo_v1.0.007", "1.0.7", "Invalid patch number: '007'. Expected a number.")]
    #[tokio::test]
    async fn scan_reports_non_canonical_version_parts(
        #[case] dir: &str,
        #[case] version: &str,
        #[case] message: &str,
    ) {
        let root = create_tree(&[format!("{}/all/foo_{}.js", dir, version).as_str()]);

        let (libdefs, errors) = scan(root.path()).await;

        assert_eq!(libdefs.len(), 1);
        assert_eq!(libdefs[0].pkg_name, "foo");
        assert_eq!(libdefs[0].pkg_version_str, version);
        assert_eq!(errors.get(dir), vec![message.to_string()]);
        assert_eq!(errors.len(), 1);
    }

    #[tokio::test]
    async fn scan_keeps_checking_package_with_non_canonical_version() {
        let root = create_tree(&["foo_v01.0.0/all/readme.md", "bar_v1.00.0/all/bar_1.0.0.js"]);
        fs::create_dir_all(root.path().join("baz_v1.0.00/all")).unwrap();

        let (libdefs, errors) = scan(root.path()).await;

        let names: Vec<&str> = libdefs.iter().map(|d| d.pkg_name.as_str()).collect();
        assert_eq!(names, vec!["bar"]);
        assert_eq!(
            errors.get("foo_v01.0.0"),
            vec!["Invalid major number: '01'. Expected a number.".to_string()]
        );
        assert_eq!(
            errors.get("foo_v01.0.0/all/readme.md"),
            vec!["Malformed test file name! Test files must be formatted as test_(.*).js".to_string()]
        );
        assert_eq!(
            errors.get("bar_v1.00.0"),
            vec!["Invalid minor number: '00'. Expected a number.".to_string()]
        );
        assert_eq!(
            errors.get("baz_v1.0.00/all"),
            vec!["No libdef file found!".to_string()]
        );
    }

    #[tokio::test]
    async fn scan_treats_oversized_version_part_as_unknown_package() {
        let root = create_tree(&["foo_v99999999999999999999.0.0/all/readme.md"]);

        let (libdefs, errors) = scan(root.path()).await;

        assert!(libdefs.is_empty());
        assert_eq!(errors.contexts(), vec!["foo_v99999999999999999999.0.0".to_string()]);
    }

    #[tokio::test]
    async fn scan_reports_each_invalid_version_part() {
        let root = create_tree(&["foo_v01.02.03/all/foo.js"]);

        let (_, errors) = scan(root.path()).await;

        assert_eq!(errors.get("foo_v01.02.03").len(), 3);
    }

    #[tokio::test]
    async fn scan_reports_malformed_checker_dir_and_keeps_siblings() {
        let root = create_tree(&[
            "foo_v1.0.0/flow_v0.25.x/foo_1.0.0.js",
            "foo_v1.0.0/v0.26.x/foo_1.0.0.js",
        ]);

        let (libdefs, errors) = scan(root.path()).await;

        assert_eq!(libdefs.len(), 1);
        assert_eq!(libdefs[0].checker_version_str, "v0.26.x");
        assert_eq!(errors.contexts(), vec!["foo_v1.0.0/flow_v0.25.x".to_string()]);
    }

    #[tokio::test]
    async fn scan_reports_overlapping_checker_versions_once_per_package() {
        let root = create_tree(&[
            "foo_v1.0.0/v0.20.0-/foo_1.0.0.js",
            "foo_v1.0.0/-v0.30.0/foo_1.0.0.js",
            "foo_v1.0.0/all/foo_1.0.0.js",
        ]);

        let (libdefs, errors) = scan(root.path()).await;

        assert_eq!(libdefs.len(), 3);
        assert_eq!(
            errors.get("foo_v1.0.0"),
            vec!["Checker versions not disjoint!"]
        );
        assert_eq!(errors.len(), 1);
    }

    #[tokio::test]
    async fn scan_reports_package_without_checker_dirs() {
        let root = create_tree(&["foo_v1.0.0/test_foo.js"]);

        let (libdefs, errors) = scan(root.path()).await;

        assert!(libdefs.is_empty());
        assert_eq!(errors.get("foo_v1.0.0"), vec!["No libdef files found!"]);
    }

    #[tokio::test]
    async fn scan_fails_when_root_is_missing() {
        let temp_dir = TempDir::new().unwrap();
        let errors = ValidationErrors::new();

        let result = Scanner::new()
            .scan(&temp_dir.path().join("missing"), &errors)
            .await;

        assert!(matches!(result, Err(ScanError::Io { .. })));
    }

    #[tokio::test]
    async fn scan_definitions_without_sink_fails_on_first_problem() {
        let root = create_tree(&["foo_v1.0.0/all/test_x.js"]);

        let result = scan_definitions(root.path(), None).await;

        match result {
            Err(ScanError::Invalid { context, message }) => {
                assert_eq!(context, "foo_v1.0.0/all");
                assert_eq!(message, "No libdef file found!");
            }
            other => panic!("expected validation failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn scan_definitions_without_sink_returns_clean_tree() {
        let root = create_tree(&["foo_v1.0.0/all/foo_1.0.0.js"]);

        let libdefs = scan_definitions(root.path(), None).await.unwrap();

        assert_eq!(libdefs.len(), 1);
    }
}
