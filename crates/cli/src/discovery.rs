// SPDX-FileCopyrightText: 2026 Quarry Contributors
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! File discovery.
//!
//! Walks the workspace with gitignore-aware traversal, keeps files with the
//! front-end's extension, and applies the CLI filters: a file-name glob, a
//! folder substring, and a project glob matched against the first path
//! component under the workspace root. Results are sorted so runs are
//! deterministic regardless of walk order.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{Glob, GlobMatcher};
use ignore::WalkBuilder;

#[derive(Debug, Default)]
pub struct Filters {
    pub file_filter: Option<String>,
    pub folder_filter: Option<String>,
    pub project_filter: Option<String>,
}

pub fn discover(root: &Path, filters: &Filters) -> Result<Vec<PathBuf>> {
    let file_glob = build_glob(filters.file_filter.as_deref())?;
    let project_glob = build_glob(filters.project_filter.as_deref())?;

    let mut files = Vec::new();
    for entry in WalkBuilder::new(root).build() {
        let entry = entry.context("walking workspace")?;
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        let path = entry.path();
        if path
            .extension()
            .is_none_or(|ext| ext != quarry_frontend::FILE_EXTENSION)
        {
            continue;
        }
        if let Some(glob) = &file_glob {
            let name = path.file_name().unwrap_or_default();
            if !glob.is_match(name) {
                continue;
            }
        }
        if let Some(substr) = &filters.folder_filter {
            let parent = path.parent().map(Path::to_string_lossy).unwrap_or_default();
            if !parent.contains(substr.as_str()) {
                continue;
            }
        }
        if let Some(glob) = &project_glob {
            if !project_of(root, path).is_some_and(|p| glob.is_match(p)) {
                continue;
            }
        }
        files.push(path.to_path_buf());
    }
    files.sort();
    Ok(files)
}

fn build_glob(pattern: Option<&str>) -> Result<Option<GlobMatcher>> {
    pattern
        .map(|p| {
            Glob::new(p)
                .map(|g| g.compile_matcher())
                .with_context(|| format!("invalid glob `{p}`"))
        })
        .transpose()
}

/// The first path component of `path` relative to `root`: the project
/// directory a file belongs to. Files directly under the root have no
/// project.
fn project_of(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let mut components = rel.components();
    let first = components.next()?;
    // the file itself is not a project directory
    components.next()?;
    Some(first.as_os_str().to_string_lossy().into_owned())
}
