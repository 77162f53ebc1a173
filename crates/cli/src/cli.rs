// SPDX-FileCopyrightText: 2026 Quarry Contributors
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! CLI argument parsing with clap derive.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Structural code search and replace
#[derive(Debug, Parser)]
#[command(name = "quarry")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Search pattern, e.g. 'Console.WriteLine($arg$)'
    #[arg(long)]
    pub pattern: String,

    /// Replacement template; enables replace mode
    #[arg(long)]
    pub replace: Option<String>,

    /// Write replacements to disk (without this, replace mode is a dry run)
    #[arg(long)]
    pub apply: bool,

    /// Search a single file
    #[arg(long, value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Scan all projects under this directory
    #[arg(long, value_name = "DIR")]
    pub workspace: Option<PathBuf>,

    /// Only search files whose name matches this glob
    #[arg(long = "file-filter", value_name = "GLOB")]
    pub file_filter: Option<String>,

    /// Only search files whose directory path contains this substring
    #[arg(long = "folder-filter", value_name = "SUBSTR")]
    pub folder_filter: Option<String>,

    /// Only search projects (top-level directories) matching this glob
    #[arg(long = "project-filter", value_name = "GLOB")]
    pub project_filter: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,

    /// Worker threads (default: one per hardware thread)
    #[arg(long, value_name = "N")]
    pub parallelism: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}
