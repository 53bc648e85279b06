use super::{archive_base_name, package, print_listing, select_files, PackageOutcome, Patterns};
use crate::cli::{CommonArgs, FilterArgs};
use crate::error::{GitkitError, Result};
use crate::git::GitRepo;
use crate::model::{ArchiveSpec, PathMode};
use crate::util::normalize_package_name;
use anyhow::Context;
use console::{style, Term};
use dialoguer::{theme::ColorfulTheme, Confirm};
use log::{debug, warn};
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

pub fn exec_list(
    common: &CommonArgs,
    repo: PathBuf,
    filters: &FilterArgs,
    json: bool,
) -> anyhow::Result<ExitCode> {
    let Some(patterns) = compile_or_report(filters) else {
        return Ok(ExitCode::FAILURE);
    };

    let repo = GitRepo::new(repo)
        .with_runner(common.runner())
        .with_progress(common.show_progress());

    let selection = match select_files(&repo, &patterns, PathMode::Absolute) {
        Ok(selection) => selection,
        Err(e @ GitkitError::InvalidRepository { .. }) => {
            report(&e);
            return Ok(ExitCode::FAILURE);
        }
        Err(e) => return Err(e).context("Failed to list tracked files"),
    };

    if selection.is_empty() {
        report_no_files(repo.path());
        return Ok(ExitCode::FAILURE);
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    print_listing(
        repo.path(),
        &selection,
        filters.include.as_deref(),
        filters.exclude.as_deref(),
        json,
        &mut out,
    )
    .context("Failed to write file list")?;
    Ok(ExitCode::SUCCESS)
}

pub fn exec_package(
    common: &CommonArgs,
    file: &str,
    repo: PathBuf,
    filters: &FilterArgs,
    dry_run: bool,
    force: bool,
) -> anyhow::Result<ExitCode> {
    let Some(patterns) = compile_or_report(filters) else {
        return Ok(ExitCode::FAILURE);
    };

    let repo = GitRepo::new(repo)
        .with_runner(common.runner())
        .with_progress(common.show_progress());
    let spec = ArchiveSpec {
        output_path: PathBuf::from(normalize_package_name(file)),
        base_dir_name: archive_base_name(repo.path()),
        dry_run,
    };
    debug!("archive base directory: {}", spec.base_dir_name);

    let confirm = |path: &Path| if force { Ok(true) } else { confirm_overwrite(path) };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match package(&repo, &patterns, &spec, confirm, &mut out) {
        Ok(PackageOutcome::Created(added)) | Ok(PackageOutcome::DryRun(added)) => {
            if !added.failed.is_empty() {
                warn!("{} file(s) could not be added", added.failed.len());
            }
            Ok(ExitCode::SUCCESS)
        }
        Ok(PackageOutcome::NoFiles) => {
            report_no_files(repo.path());
            Ok(ExitCode::FAILURE)
        }
        Ok(PackageOutcome::Declined) => {
            eprintln!("\n{}\n", style("User cancelled.").yellow());
            Ok(ExitCode::FAILURE)
        }
        Err(e @ GitkitError::InvalidRepository { .. }) => {
            report(&e);
            Ok(ExitCode::FAILURE)
        }
        Err(e) => Err(e).with_context(|| {
            format!("Failed to create package: {}", spec.output_path.display())
        }),
    }
}

/// Asks before clobbering `path`. Without a terminal to ask on, the answer is no.
pub fn confirm_overwrite(path: &Path) -> Result<bool> {
    eprintln!("\nThis file exists already!: {}", path.display());
    if !Term::stderr().is_term() {
        debug!("no terminal for the overwrite prompt, keeping {}", path.display());
        return Ok(false);
    }
    let theme = ColorfulTheme::default();
    let answer = Confirm::with_theme(&theme)
        .with_prompt("Overwrite file?")
        .default(false)
        .interact()?;
    Ok(answer)
}

fn compile_or_report(filters: &FilterArgs) -> Option<Patterns> {
    match Patterns::compile(filters.include.as_deref(), filters.exclude.as_deref()) {
        Ok(patterns) => Some(patterns),
        Err(e) => {
            report(&e);
            None
        }
    }
}

fn report(err: &GitkitError) {
    eprintln!("\n{}", style(err).red());
}

fn report_no_files(repo: &Path) {
    eprintln!("\nNo files found in: {}\n", repo.display());
}
