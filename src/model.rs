use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;

pub const SCHEMA_VERSION: u32 = 1;

/// One `timestamp;name;email` line from `git log`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitAuthorRecord {
    pub timestamp: DateTime<Utc>,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorEntry {
    pub number: usize,
    pub name: String,
    pub email: String,
    pub first_commit: DateTime<Utc>,
}

impl fmt::Display for AuthorEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04} [{}]: {} <{}>",
            self.number,
            self.first_commit.format("%Y-%m-%d"),
            self.name,
            self.email
        )
    }
}

/// Author names in order of first appearance.
#[derive(Debug, Default)]
pub struct AuthorLedger {
    seen: HashSet<String>,
    order: Vec<String>,
}

impl AuthorLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the author if the name is new and returns its numbered entry.
    /// Later commits by a known name are dropped, whatever their email.
    pub fn admit(&mut self, record: CommitAuthorRecord) -> Option<AuthorEntry> {
        if !self.seen.insert(record.name.clone()) {
            return None;
        }
        self.order.push(record.name.clone());
        Some(AuthorEntry {
            number: self.order.len(),
            name: record.name,
            email: record.email,
            first_commit: record.timestamp,
        })
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathMode {
    /// Paths relative to the repository root, as `git ls-files` prints them.
    Relative,
    /// Paths joined onto the canonical repository directory.
    Absolute,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSelection {
    pub root: PathBuf,
    pub mode: PathMode,
    pub files: Vec<String>,
}

impl FileSelection {
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.files.iter().map(String::as_str)
    }
}

#[derive(Debug, Clone)]
pub struct ArchiveSpec {
    pub output_path: PathBuf,
    pub base_dir_name: String,
    pub dry_run: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorsOutput {
    pub version: u32,
    pub generated_at: DateTime<Utc>,
    pub repository_path: String,
    pub authors: Vec<AuthorEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileListOutput {
    pub version: u32,
    pub generated_at: DateTime<Utc>,
    pub repository_path: String,
    pub include: Option<String>,
    pub exclude: Option<String>,
    pub files: Vec<String>,
}
