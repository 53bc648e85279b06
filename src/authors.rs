use crate::cli::CommonArgs;
use crate::error::{GitkitError, Result};
use crate::git::GitRepo;
use crate::model::{AuthorEntry, AuthorLedger, AuthorsOutput, CommitAuthorRecord, SCHEMA_VERSION};
use crate::util::canonical_or_self;
use anyhow::Context;
use chrono::{DateTime, Utc};
use console::style;
use log::debug;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

pub fn exec(common: CommonArgs, dir: Option<PathBuf>, json: bool) -> anyhow::Result<ExitCode> {
    if let Some(d) = &dir {
        if !d.is_dir() {
            let err = GitkitError::DirectoryNotFound { path: d.clone() };
            eprintln!("\n{}", style(err).red());
            return Ok(ExitCode::FAILURE);
        }
    }

    let repo = GitRepo::open(dir.as_ref())
        .context("Failed to resolve repository directory")?
        .with_runner(common.runner())
        .with_progress(common.show_progress());

    let output = match repo.author_log() {
        Ok(output) => output,
        Err(e) if e.is_git_failure() => {
            report_git_error(&e.to_string());
            return Ok(ExitCode::FAILURE);
        }
        Err(e) => return Err(e).context("Failed to read commit history"),
    };

    if output.is_empty() {
        report_git_error("No output from the git command.");
        return Ok(ExitCode::FAILURE);
    }

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    let result = if json {
        let repository_path = canonical_or_self(repo.path()).to_string_lossy().into_owned();
        write_json(lines(&output), repository_path, &mut handle)
    } else {
        write_report(lines(&output), &mut handle)
    };

    match result {
        Ok(count) if count > 0 => Ok(ExitCode::SUCCESS),
        Ok(_) => Ok(ExitCode::FAILURE),
        Err(e @ GitkitError::MalformedInput { .. }) => {
            eprintln!("\n{}", style(e).red());
            Ok(ExitCode::FAILURE)
        }
        Err(e) => Err(e).context("Failed to write author report"),
    }
}

fn report_git_error(message: &str) {
    eprintln!("\n{}\n  {}", style("Git error:").red().bold(), message);
}

/// Writes the JSON report and returns the number of distinct authors.
/// A closed reader is not an error.
pub fn write_json<I, L, W>(lines: I, repository_path: String, out: &mut W) -> Result<usize>
where
    I: IntoIterator<Item = L>,
    L: AsRef<[u8]>,
    W: Write,
{
    let authors = collect_report(lines)?;
    let count = authors.len();
    let doc = AuthorsOutput {
        version: SCHEMA_VERSION,
        generated_at: Utc::now(),
        repository_path,
        authors,
    };
    let text = serde_json::to_string_pretty(&doc)?;
    match writeln!(out, "{text}").and_then(|()| out.flush()) {
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
            debug!("output closed before the JSON report was written");
            Ok(count)
        }
        other => other.map(|()| count).map_err(Into::into),
    }
}

/// Splits raw git output into lines. A trailing `\r` is left for
/// [`parse_line`] to trim.
pub fn lines(output: &[u8]) -> impl Iterator<Item = &[u8]> {
    output.split(|b| *b == b'\n')
}

/// Parses one `timestamp;name;email` line. Blank lines yield `None`.
pub fn parse_line(raw: &[u8]) -> Result<Option<CommitAuthorRecord>> {
    let decoded = String::from_utf8_lossy(raw);
    let line = decoded.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let fields: Vec<&str> = line.split(';').collect();
    let [timestamp, name, email] = fields.as_slice() else {
        return Err(GitkitError::malformed(line));
    };
    let timestamp = parse_timestamp(timestamp).ok_or_else(|| GitkitError::malformed(line))?;

    Ok(Some(CommitAuthorRecord {
        timestamp,
        name: name.to_string(),
        email: email.to_string(),
    }))
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let secs = s.parse::<i64>().ok().or_else(|| {
        s.parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map(|f| f.floor() as i64)
    })?;
    DateTime::from_timestamp(secs, 0)
}

/// Writes one line per distinct author and returns how many distinct authors
/// were found.
///
/// A closed reader (`BrokenPipe`) ends the report early without error; the
/// author whose line could not be written still counts. A malformed line
/// aborts the report; lines already written stay written.
pub fn write_report<I, L, W>(lines: I, out: &mut W) -> Result<usize>
where
    I: IntoIterator<Item = L>,
    L: AsRef<[u8]>,
    W: Write,
{
    let mut ledger = AuthorLedger::new();

    for raw in lines {
        let Some(record) = parse_line(raw.as_ref())? else {
            continue;
        };
        let Some(entry) = ledger.admit(record) else {
            continue;
        };
        match writeln!(out, "{entry}") {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                debug!("output closed after {} authors", ledger.len() - 1);
                return Ok(ledger.len());
            }
            Err(e) => return Err(e.into()),
        }
    }

    match out.flush() {
        Err(e) if e.kind() != io::ErrorKind::BrokenPipe => Err(e.into()),
        _ => Ok(ledger.len()),
    }
}

pub fn collect_report<I, L>(lines: I) -> Result<Vec<AuthorEntry>>
where
    I: IntoIterator<Item = L>,
    L: AsRef<[u8]>,
{
    let mut ledger = AuthorLedger::new();
    let mut entries = Vec::new();
    for raw in lines {
        if let Some(entry) = parse_line(raw.as_ref())?.and_then(|r| ledger.admit(r)) {
            entries.push(entry);
        }
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn report(input: &[&str]) -> (Result<usize>, String) {
        let mut out = Vec::new();
        let result = write_report(input.iter().map(|l| l.as_bytes()), &mut out);
        (result, String::from_utf8(out).unwrap())
    }

    /// Accepts `limit` complete lines, then behaves like a closed pipe.
    struct ClosingWriter {
        limit: usize,
        buf: Vec<u8>,
    }

    impl ClosingWriter {
        fn line_count(&self) -> usize {
            self.buf.iter().filter(|b| **b == b'\n').count()
        }
    }

    impl Write for ClosingWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.line_count() >= self.limit {
                return Err(io::Error::from(io::ErrorKind::BrokenPipe));
            }
            self.buf.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn first_name_wins_and_numbers_count_up() {
        let (result, text) = report(&[
            "1000;Alice;a@x.com",
            "2000;Bob;b@x.com",
            "3000;Alice;a2@x.com",
        ]);
        assert_eq!(result.unwrap(), 2);
        assert_eq!(
            text,
            "0001 [1970-01-01]: Alice <a@x.com>\n0002 [1970-01-01]: Bob <b@x.com>\n"
        );
    }

    #[test]
    fn dates_are_utc_calendar_days() {
        let (result, text) = report(&["1577923199;Late;l@x", "1577923200;Early;e@x"]);
        assert_eq!(result.unwrap(), 2);
        assert_eq!(
            text,
            "0001 [2020-01-01]: Late <l@x>\n0002 [2020-01-02]: Early <e@x>\n"
        );
    }

    #[test]
    fn blank_lines_are_skipped() {
        let (result, text) = report(&["", "   ", "\t\r", "5;Ann;ann@x", ""]);
        assert_eq!(result.unwrap(), 1);
        assert_eq!(text, "0001 [1970-01-01]: Ann <ann@x>\n");
    }

    #[test]
    fn crlf_line_endings_are_trimmed() {
        let (result, text) = report(&["5;Ann;ann@x\r"]);
        assert_eq!(result.unwrap(), 1);
        assert_eq!(text, "0001 [1970-01-01]: Ann <ann@x>\n");
    }

    #[test]
    fn empty_input_is_zero_authors() {
        let (result, text) = report(&[]);
        assert_eq!(result.unwrap(), 0);
        assert!(text.is_empty());
    }

    #[test]
    fn malformed_line_aborts_with_that_line() {
        let (result, text) = report(&["not-a-valid-line"]);
        match result {
            Err(GitkitError::MalformedInput { line }) => assert_eq!(line, "not-a-valid-line"),
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(text.is_empty());
    }

    #[test]
    fn malformed_line_keeps_earlier_output() {
        let (result, text) = report(&["1;A;a@x", "2;B;b;extra"]);
        assert!(matches!(result, Err(GitkitError::MalformedInput { .. })));
        assert_eq!(text, "0001 [1970-01-01]: A <a@x>\n");
    }

    #[test]
    fn unparsable_timestamp_is_malformed() {
        let (result, _) = report(&["yesterday;A;a@x"]);
        match result {
            Err(GitkitError::MalformedInput { line }) => assert_eq!(line, "yesterday;A;a@x"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn fractional_timestamp_is_accepted() {
        let record = parse_line(b"86400.5;A;a@x").unwrap().unwrap();
        assert_eq!(record.timestamp.format("%Y-%m-%d").to_string(), "1970-01-02");
    }

    #[test]
    fn closed_reader_stops_output_gracefully() {
        let mut out = ClosingWriter {
            limit: 2,
            buf: Vec::new(),
        };
        let input: [&[u8]; 4] = [b"1;A;a@x", b"2;B;b@x", b"3;C;c@x", b"bogus"];
        let count = write_report(input, &mut out).unwrap();
        // C was found even though its line never made it out
        assert_eq!(count, 3);
        assert_eq!(out.line_count(), 2);
    }

    #[test]
    fn reader_closed_before_first_line_still_counts_author() {
        let mut out = ClosingWriter {
            limit: 0,
            buf: Vec::new(),
        };
        let count = write_report(["1;A;a@x", "2;B;b@x"], &mut out).unwrap();
        assert_eq!(count, 1);
        assert!(out.buf.is_empty());
    }

    #[test]
    fn json_report_to_closed_reader_is_not_an_error() {
        let mut out = ClosingWriter {
            limit: 0,
            buf: Vec::new(),
        };
        let input = ["1;A;a@x", "2;B;b@x", "3;A;other@x"];
        let count = write_json(input, "/repo".to_string(), &mut out).unwrap();
        assert_eq!(count, 2);
        assert!(out.buf.is_empty());
    }

    #[test]
    fn json_report_lists_authors_in_envelope() {
        let mut out = Vec::new();
        let count = write_json(["1;A;a@x", "2;B;b@x"], "/repo".to_string(), &mut out).unwrap();
        assert_eq!(count, 2);
        let v: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(v["version"], SCHEMA_VERSION);
        assert_eq!(v["repository_path"], "/repo");
        assert_eq!(v["authors"][1]["name"], "B");
        assert!(out.ends_with(b"\n"));
    }

    #[test]
    fn numbers_strictly_increase_from_one() {
        let input: Vec<String> = ["a", "b", "a", "c", "b", "d"]
            .iter()
            .enumerate()
            .map(|(i, n)| format!("{i};{n};{n}@x"))
            .collect();
        let entries = collect_report(&input).unwrap();
        let numbers: Vec<usize> = entries.iter().map(|e| e.number).collect();
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4]);
        assert_eq!(names, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn ledger_ignores_later_email_for_same_name() {
        let mut ledger = AuthorLedger::new();
        let rec = |name: &str, email: &str| CommitAuthorRecord {
            timestamp: DateTime::from_timestamp(0, 0).unwrap(),
            name: name.to_string(),
            email: email.to_string(),
        };
        let first = ledger.admit(rec("A", "one@x")).map(|e| e.email);
        assert_eq!(first, Some("one@x".to_string()));
        assert!(ledger.admit(rec("A", "two@x")).is_none());
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.names().collect::<Vec<_>>(), vec!["A"]);
    }

    #[test]
    fn lines_splits_on_newlines() {
        let out: Vec<&[u8]> = lines(b"1;a;b\n2;c;d").collect();
        assert_eq!(out, vec![&b"1;a;b"[..], &b"2;c;d"[..]]);
    }
}
