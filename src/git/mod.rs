pub mod repo;
pub mod runner;

pub use repo::{GitRepo, AUTHOR_LOG_ARGS, LS_FILES_ARGS};
pub use runner::GitRunner;
