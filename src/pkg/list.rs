use crate::error::Result;
use crate::model::{FileListOutput, FileSelection, SCHEMA_VERSION};
use chrono::Utc;
use log::debug;
use std::io::{self, Write};
use std::path::Path;

/// Writes the listing as text or JSON. A reader that goes away midway ends
/// the listing quietly.
pub fn print_listing<W: Write>(
    repo: &Path,
    selection: &FileSelection,
    include: Option<&str>,
    exclude: Option<&str>,
    json: bool,
    out: &mut W,
) -> Result<()> {
    let result = if json {
        write_listing_json(selection, include, exclude, out)
    } else {
        write_listing(repo, selection, out).map_err(Into::into)
    };
    match result {
        Err(e) if e.is_broken_pipe() => {
            debug!("output closed while listing {} files", selection.len());
            Ok(())
        }
        other => other,
    }
}

pub fn write_listing<W: Write>(
    repo: &Path,
    selection: &FileSelection,
    out: &mut W,
) -> io::Result<()> {
    let count = selection.len();
    writeln!(out, "\nListing {count} files in: {}\n", repo.display())?;
    for file in selection.iter() {
        writeln!(out, "    {file}")?;
    }
    writeln!(out, "\nFound {count} files in: {}\n", repo.display())?;
    out.flush()
}

pub fn write_listing_json<W: Write>(
    selection: &FileSelection,
    include: Option<&str>,
    exclude: Option<&str>,
    out: &mut W,
) -> Result<()> {
    let doc = FileListOutput {
        version: SCHEMA_VERSION,
        generated_at: Utc::now(),
        repository_path: selection.root.to_string_lossy().to_string(),
        include: include.map(str::to_string),
        exclude: exclude.map(str::to_string),
        files: selection.files.clone(),
    };
    writeln!(out, "{}", serde_json::to_string_pretty(&doc)?)?;
    out.flush()?;
    Ok(())
}
