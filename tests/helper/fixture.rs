//! Definitions tree builders

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use libdef_resolver::libdef::DEFINITIONS_DIR;
use libdef_resolver::libdef::scanner::METADATA_FILE_NAME;

pub const COMPATIBLE_METADATA: &str = r#"{"compatibleCLIRange": ">=0.1.0"}"#;

/// Repository checkout holding a `definitions/npm` tree
pub struct DefinitionsTree {
    temp_dir: TempDir,
}

impl DefinitionsTree {
    /// Empty tree with compatible metadata
    pub fn new() -> Self {
        let tree = Self {
            temp_dir: TempDir::new().unwrap(),
        };
        tree.with_metadata(COMPATIBLE_METADATA)
    }

    pub fn with_metadata(self, content: &str) -> Self {
        fs::create_dir_all(self.defs_dir()).unwrap();
        fs::write(self.defs_dir().join(METADATA_FILE_NAME), content).unwrap();
        self
    }

    /// Create empty files relative to `definitions/npm`
    pub fn with_files(self, files: &[&str]) -> Self {
        write_files(&self.defs_dir(), files);
        self
    }

    pub fn with_dir(self, dir: &str) -> Self {
        fs::create_dir_all(self.defs_dir().join(dir)).unwrap();
        self
    }

    pub fn repo_root(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn defs_dir(&self) -> PathBuf {
        self.temp_dir.path().join(DEFINITIONS_DIR)
    }
}

/// Create empty files (and their parent directories) under `root`
pub fn write_files(root: &Path, files: &[&str]) {
    for file in files {
        let path = root.join(file);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }
}

/// Write the mirror's `lastUpdated` file under `cache_root`
pub fn write_timestamp(cache_root: &Path, content: &str) {
    fs::write(cache_root.join("lastUpdated"), content).unwrap();
}
