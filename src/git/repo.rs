use super::GitRunner;
use crate::error::{GitkitError, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::debug;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const AUTHOR_LOG_ARGS: [&str; 5] = [
    "log",
    "--encoding=utf-8",
    "--full-history",
    "--reverse",
    "--format=format:%at;%an;%ae",
];

pub const LS_FILES_ARGS: [&str; 1] = ["ls-files"];

pub struct GitRepo {
    path: PathBuf,
    runner: GitRunner,
    show_progress: bool,
}

impl GitRepo {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            runner: GitRunner::default(),
            show_progress: false,
        }
    }

    /// Repository at `path`, or the current dir if `None`
    pub fn open<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        let path = match path {
            Some(p) => p.as_ref().to_path_buf(),
            None => std::env::current_dir()?,
        };
        Ok(Self::new(path))
    }

    pub fn with_runner(mut self, runner: GitRunner) -> Self {
        self.runner = runner;
        self
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Raw `timestamp;name;email` lines, oldest commit first.
    pub fn author_log(&self) -> Result<Vec<u8>> {
        self.run(&AUTHOR_LOG_ARGS, "Reading commit history...")
    }

    /// Raw `git ls-files` output. Every failure is reported as an invalid
    /// repository, with the cause logged at debug level.
    pub fn tracked_files(&self) -> Result<Vec<u8>> {
        if !self.path.is_dir() {
            debug!("{} is not a directory", self.path.display());
            return Err(self.invalid());
        }
        self.run(&LS_FILES_ARGS, "Listing tracked files...")
            .map_err(|e| {
                debug!("git ls-files failed in {}: {e}", self.path.display());
                self.invalid()
            })
    }

    fn invalid(&self) -> GitkitError {
        GitkitError::InvalidRepository {
            path: self.path.clone(),
        }
    }

    fn run(&self, args: &[&str], message: &'static str) -> Result<Vec<u8>> {
        let pb = if self.show_progress {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.green} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            pb.set_message(message);
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        } else {
            ProgressBar::hidden()
        };

        let result = self.runner.run(&self.path, args);
        pb.finish_and_clear();
        result
    }
}
