use super::select::{select_files, Patterns};
use crate::error::Result;
use crate::git::GitRepo;
use crate::model::{ArchiveSpec, FileSelection, PathMode};
use crate::util::{canonical_or_self, op_line};
use flate2::write::GzEncoder;
use flate2::Compression;
use log::debug;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

const FALLBACK_BASE_NAME: &str = "repo";

/// Destination for archive entries.
pub trait ArchiveSink {
    fn append(&mut self, source: &Path, entry_name: &str) -> io::Result<()>;

    fn finish(self) -> io::Result<()>
    where
        Self: Sized;
}

/// Gzip-compressed tar file. Symlinks are stored as links.
pub struct TarGzSink {
    builder: tar::Builder<GzEncoder<File>>,
}

impl TarGzSink {
    pub fn create(path: &Path) -> io::Result<Self> {
        let file = File::create(path)?;
        let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
        builder.follow_symlinks(false);
        Ok(Self { builder })
    }
}

impl ArchiveSink for TarGzSink {
    fn append(&mut self, source: &Path, entry_name: &str) -> io::Result<()> {
        let is_dir = std::fs::symlink_metadata(source)
            .map(|m| m.is_dir())
            .unwrap_or(false);
        if is_dir {
            // submodule checkouts show up as a single tracked path
            self.builder.append_dir_all(entry_name, source)
        } else {
            self.builder.append_path_with_name(source, entry_name)
        }
    }

    fn finish(self) -> io::Result<()> {
        self.builder.into_inner()?.finish()?.sync_all()
    }
}

/// Accepts every entry and writes nothing. Used for dry runs.
pub struct NullSink;

impl ArchiveSink for NullSink {
    fn append(&mut self, _source: &Path, _entry_name: &str) -> io::Result<()> {
        Ok(())
    }

    fn finish(self) -> io::Result<()> {
        Ok(())
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AddReport {
    pub added: usize,
    pub failed: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageOutcome {
    NoFiles,
    Declined,
    DryRun(AddReport),
    Created(AddReport),
}

/// Last component of the repository path, used as the single top-level
/// directory inside the archive.
pub fn archive_base_name(repo: &Path) -> String {
    repo.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .or_else(|| {
            canonical_or_self(repo)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
        })
        .unwrap_or_else(|| FALLBACK_BASE_NAME.to_string())
}

pub fn archive_entry_name(base: &str, relative: &str) -> String {
    let relative = relative.strip_prefix('/').unwrap_or(relative);
    format!("{base}/{relative}")
}

/// Feeds every selected file to `sink`. A file that cannot be added is
/// reported on `out` and skipped.
pub fn add_files<S, W>(
    sink: &mut S,
    root: &Path,
    base: &str,
    selection: &FileSelection,
    out: &mut W,
) -> Result<AddReport>
where
    S: ArchiveSink,
    W: Write,
{
    let mut report = AddReport::default();
    writeln!(out, "\nAdding files...")?;

    for relative in selection.iter() {
        let full = root.join(relative);
        writeln!(out, "{}", op_line("adding", &full.to_string_lossy()))?;

        let entry = archive_entry_name(base, relative);
        match sink.append(&full, &entry) {
            Ok(()) => {
                writeln!(out, "{}\n", op_line("added", &entry))?;
                report.added += 1;
            }
            Err(e) => {
                debug!("skipping {relative}: {e:?}");
                writeln!(out, "\nError adding file: {}\n{e}\n", full.display())?;
                report.failed.push(relative.to_string());
            }
        }
    }

    Ok(report)
}

fn write_archive<S, W>(
    mut sink: S,
    root: &Path,
    spec: &ArchiveSpec,
    selection: &FileSelection,
    out: &mut W,
) -> Result<AddReport>
where
    S: ArchiveSink,
    W: Write,
{
    let report = add_files(&mut sink, root, &spec.base_dir_name, selection, out)?;
    sink.finish()?;
    Ok(report)
}

/// Selects tracked files and writes them under `spec.base_dir_name/`.
///
/// `confirm` is asked only when a real run would replace an existing file.
/// Dry runs go through the same steps with a [`NullSink`].
pub fn package<C, W>(
    repo: &GitRepo,
    patterns: &Patterns,
    spec: &ArchiveSpec,
    confirm: C,
    out: &mut W,
) -> Result<PackageOutcome>
where
    C: FnOnce(&Path) -> Result<bool>,
    W: Write,
{
    let repo_path = repo.path().display();
    writeln!(out, "\nRetrieving file names from git repo: {repo_path}")?;
    let selection = select_files(repo, patterns, PathMode::Relative)?;
    if selection.is_empty() {
        return Ok(PackageOutcome::NoFiles);
    }

    if !spec.dry_run && spec.output_path.exists() && !confirm(spec.output_path.as_path())? {
        return Ok(PackageOutcome::Declined);
    }

    writeln!(out, "\nCreating package: {}", spec.output_path.display())?;

    if spec.dry_run {
        let report = write_archive(NullSink, repo.path(), spec, &selection, out)?;
        writeln!(out, "\nDry run, no package created.")?;
        Ok(PackageOutcome::DryRun(report))
    } else {
        let sink = TarGzSink::create(&spec.output_path)?;
        let report = write_archive(sink, repo.path(), spec, &selection, out)?;
        writeln!(out, "\nPackage created: {}", spec.output_path.display())?;
        Ok(PackageOutcome::Created(report))
    }
}
