//! Small git utilities built on the `git` command line: an author report
//! (`git-authors`) and a packager for tracked files (`git-pkg`).

pub mod authors;
pub mod cli;
pub mod error;
pub mod git;
pub mod model;
pub mod pkg;
pub mod util;

pub use error::{GitkitError, Result};
