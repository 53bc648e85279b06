use crate::git::GitRunner;
use anyhow::{bail, Result};
use clap::{ArgAction, Args, Parser};
use console::Term;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

#[derive(Args, Clone, Debug)]
pub struct CommonArgs {
    #[arg(
        long,
        value_name = "DURATION",
        value_parser = humantime::parse_duration,
        help = "Give up on git after this long (e.g. 30s, 2m)"
    )]
    pub timeout: Option<Duration>,

    #[arg(
        long,
        value_name = "LEVEL",
        default_value = "warn",
        help = "Log level (error, warn, info, debug, trace); RUST_LOG takes precedence"
    )]
    pub log_level: String,
}

impl CommonArgs {
    pub fn runner(&self) -> GitRunner {
        GitRunner::new().with_timeout(self.timeout)
    }

    pub fn show_progress(&self) -> bool {
        Term::stderr().is_term()
    }

    pub fn init_logging(&self) {
        let env = env_logger::Env::default().default_filter_or(self.log_level.as_str());
        let _ = env_logger::Builder::from_env(env)
            .format_timestamp(None)
            .try_init();
    }
}

#[derive(Args, Clone, Debug, Default)]
pub struct FilterArgs {
    #[arg(
        short,
        long,
        value_name = "PATTERN",
        help = "Regex or text; files whose name contains a match are excluded"
    )]
    pub exclude: Option<String>,

    #[arg(
        short,
        long,
        value_name = "PATTERN",
        help = "Regex or text; only files whose name contains a match are included (--exclude wins)"
    )]
    pub include: Option<String>,
}

#[derive(Parser)]
#[command(name = "git-authors")]
#[command(about = "List the authors of a git repository in order of their first commit")]
#[command(version, disable_version_flag = true)]
pub struct AuthorsCli {
    #[arg(value_name = "DIR", help = "Repo directory to use")]
    pub dir: Option<PathBuf>,

    #[arg(long, help = "Output as JSON")]
    pub json: bool,

    #[arg(short = 'v', long, action = ArgAction::Version, help = "Print version")]
    pub version: Option<bool>,

    #[clap(flatten)]
    pub common: CommonArgs,
}

impl AuthorsCli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    pub fn execute(self) -> Result<ExitCode> {
        self.common.init_logging();
        crate::authors::exec(self.common, self.dir, self.json)
    }
}

#[derive(Parser)]
#[command(name = "git-pkg")]
#[command(about = "Create a .tar.gz package from the files tracked by a git repository")]
#[command(
    long_about = "Creates a .tar.gz package out of all files found with `git ls-files`, \
                  keeping their relative paths under a single top-level directory named \
                  after the repository directory."
)]
#[command(version, disable_version_flag = true)]
pub struct PkgCli {
    #[arg(
        value_name = "FILE",
        required_unless_present = "list",
        help = "Resulting package name; '.tar.gz' is appended if not given"
    )]
    pub file: Option<String>,

    #[arg(value_name = "REPO", help = "Directory for git repo [default: current directory]")]
    pub repo: Option<PathBuf>,

    #[clap(flatten)]
    pub filters: FilterArgs,

    #[arg(
        short = 'd',
        long = "dryrun",
        alias = "dry-run",
        conflicts_with = "list",
        help = "Show what would be added, don't create a package"
    )]
    pub dry_run: bool,

    #[arg(
        short,
        long,
        conflicts_with = "list",
        help = "Overwrite an existing package without asking"
    )]
    pub force: bool,

    #[arg(short, long, help = "List files that would be packaged")]
    pub list: bool,

    #[arg(long, requires = "list", help = "Output the file list as JSON")]
    pub json: bool,

    #[arg(short = 'v', long, action = ArgAction::Version, help = "Print version")]
    pub version: Option<bool>,

    #[clap(flatten)]
    pub common: CommonArgs,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PkgMode {
    List { repo: PathBuf },
    Package { file: String, repo: PathBuf },
}

impl PkgCli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    /// With `--list` the only positional is the repository.
    pub fn mode(&self) -> Result<PkgMode> {
        if self.list {
            if self.file.is_some() && self.repo.is_some() {
                bail!("--list takes at most one REPO argument");
            }
            let repo = match self.repo.clone().or_else(|| self.file.as_ref().map(PathBuf::from)) {
                Some(repo) => repo,
                None => std::env::current_dir()?,
            };
            return Ok(PkgMode::List { repo });
        }

        let Some(file) = self.file.clone() else {
            bail!("FILE is required unless --list is given");
        };
        let repo = match self.repo.clone() {
            Some(repo) => repo,
            None => std::env::current_dir()?,
        };
        Ok(PkgMode::Package { file, repo })
    }

    pub fn execute(self) -> Result<ExitCode> {
        self.common.init_logging();
        match self.mode()? {
            PkgMode::List { repo } => {
                crate::pkg::exec_list(&self.common, repo, &self.filters, self.json)
            }
            PkgMode::Package { file, repo } => crate::pkg::exec_package(
                &self.common,
                &file,
                repo,
                &self.filters,
                self.dry_run,
                self.force,
            ),
        }
    }
}
