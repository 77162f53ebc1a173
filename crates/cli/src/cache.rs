// SPDX-FileCopyrightText: 2026 Quarry Contributors
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process parse cache.
//!
//! Keyed by path, lives for one run, shared across workers. `DashMap`'s
//! entry API gives per-key single-flight behavior: concurrent requests for
//! the same file coalesce on the shard lock and the first caller parses
//! while the rest wait for the finished value.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use quarry_engine::SourceUnit;
use quarry_frontend::{DemoOracle, parse_source};

/// A parsed file plus its per-file oracle.
#[derive(Debug)]
pub struct LoadedFile {
    pub unit: SourceUnit,
    pub oracle: DemoOracle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadErrorKind {
    FileUnreadable,
    CompilationFailed,
}

impl LoadErrorKind {
    #[must_use]
    pub const fn error_type(self) -> &'static str {
        match self {
            Self::FileUnreadable => "FileUnreadable",
            Self::CompilationFailed => "CompilationFailed",
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoadError {
    pub kind: LoadErrorKind,
    pub message: String,
}

#[derive(Default)]
pub struct ParseCache {
    map: DashMap<PathBuf, Arc<Result<LoadedFile, LoadError>>>,
}

impl ParseCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&self, path: &Path) -> Arc<Result<LoadedFile, LoadError>> {
        self.map
            .entry(path.to_path_buf())
            .or_insert_with(|| Arc::new(load_file(path)))
            .clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

fn load_file(path: &Path) -> Result<LoadedFile, LoadError> {
    let text = std::fs::read_to_string(path).map_err(|e| LoadError {
        kind: LoadErrorKind::FileUnreadable,
        message: e.to_string(),
    })?;
    let unit = parse_source(path, &text).map_err(|e| LoadError {
        kind: LoadErrorKind::CompilationFailed,
        message: e.to_string(),
    })?;
    let oracle = DemoOracle::for_unit(&unit);
    Ok(LoadedFile { unit, oracle })
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_caches_by_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.brace");
        std::fs::write(&path, "f(1);").unwrap();
        let cache = ParseCache::new();
        let first = cache.load(&path);
        assert!(first.is_ok());
        // rewriting the file does not re-parse within one run
        std::fs::write(&path, "g(2);").unwrap();
        let second = cache.load(&path);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_missing_file_is_unreadable() {
        let cache = ParseCache::new();
        let result = cache.load(Path::new("/definitely/not/here.brace"));
        let err = result.as_ref().as_ref().unwrap_err();
        assert_eq!(err.kind, LoadErrorKind::FileUnreadable);
    }

    #[test]
    fn test_parse_failure_is_compilation_failed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.brace");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "var = ;").unwrap();
        let cache = ParseCache::new();
        let result = cache.load(&path);
        let err = result.as_ref().as_ref().unwrap_err();
        assert_eq!(err.kind, LoadErrorKind::CompilationFailed);
    }
}
