use crate::error::{GitkitError, PatternKind, Result};
use crate::git::GitRepo;
use crate::model::{FileSelection, PathMode};
use crate::util::canonical_or_self;
use fancy_regex::Regex;
use log::warn;

/// Compiled include/exclude filters. A pattern matches anywhere in a name.
///
/// Lookaround and backreferences are accepted. A match that gives up at
/// run time (backtrack limit) counts as no match.
#[derive(Debug, Default)]
pub struct Patterns {
    include: Option<Regex>,
    exclude: Option<Regex>,
}

impl Patterns {
    pub fn none() -> Self {
        Self::default()
    }

    /// Empty pattern text counts as no pattern.
    pub fn compile(include: Option<&str>, exclude: Option<&str>) -> Result<Self> {
        let exclude = compile_one(PatternKind::Exclude, exclude)?;
        let include = compile_one(PatternKind::Include, include)?;
        Ok(Self { include, exclude })
    }

    pub fn included(&self, name: &str) -> bool {
        self.include.as_ref().map_or(true, |re| matches(re, name))
    }

    pub fn excluded(&self, name: &str) -> bool {
        self.exclude.as_ref().is_some_and(|re| matches(re, name))
    }

    /// Exclusion always beats inclusion; empty names are never kept.
    pub fn keep(&self, name: &str) -> bool {
        !name.is_empty() && self.included(name) && !self.excluded(name)
    }
}

fn matches(re: &Regex, name: &str) -> bool {
    re.is_match(name).unwrap_or_else(|e| {
        warn!("Pattern {} gave up on {name:?}: {e}", re.as_str());
        false
    })
}

fn compile_one(kind: PatternKind, text: Option<&str>) -> Result<Option<Regex>> {
    match text.filter(|t| !t.is_empty()) {
        None => Ok(None),
        Some(pattern) => Regex::new(pattern)
            .map(Some)
            .map_err(|e| GitkitError::InvalidPattern {
                kind,
                pattern: pattern.to_string(),
                message: e.to_string(),
            }),
    }
}

/// Keeps the names that pass `patterns`, in input order.
pub fn filter_names<'a, I>(names: I, patterns: &Patterns) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    names
        .into_iter()
        .filter(|name| patterns.keep(name))
        .map(str::to_string)
        .collect()
}

/// Tracked files of `repo` that pass `patterns`, in `git ls-files` order.
pub fn select_files(
    repo: &GitRepo,
    patterns: &Patterns,
    mode: PathMode,
) -> Result<FileSelection> {
    let raw = repo.tracked_files()?;
    let root = match mode {
        PathMode::Relative => repo.path().to_path_buf(),
        PathMode::Absolute => canonical_or_self(repo.path()),
    };

    let text = match String::from_utf8(raw) {
        Ok(text) => text,
        Err(e) => {
            warn!("Error decoding git output: {e}");
            String::new()
        }
    };

    let mut files = filter_names(text.split('\n'), patterns);
    if mode == PathMode::Absolute {
        files = files
            .into_iter()
            .map(|f| root.join(f).to_string_lossy().into_owned())
            .collect();
    }

    Ok(FileSelection { root, mode, files })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn select(names: &[&str], include: Option<&str>, exclude: Option<&str>) -> Vec<String> {
        let patterns = Patterns::compile(include, exclude).unwrap();
        filter_names(names.iter().copied(), &patterns)
    }

    #[test]
    fn no_patterns_keeps_everything_but_empty_names() {
        let names = ["b.rs", "", "a.rs", "dir/c.rs", ""];
        assert_eq!(select(&names, None, None), vec!["b.rs", "a.rs", "dir/c.rs"]);
    }

    #[test]
    fn exclude_pattern_drops_matches() {
        let names = ["src/a.py", "src/b.txt", "README.md"];
        assert_eq!(select(&names, None, Some(r"\.txt$")), vec!["src/a.py", "README.md"]);
    }

    #[test]
    fn include_restricts_to_matches() {
        assert_eq!(select(&["a.py", "b.py"], Some("a"), Some("b")), vec!["a.py"]);
    }

    #[test]
    fn exclude_overrides_include() {
        let names = ["lib/a.rs", "lib/a_test.rs", "bin/a.rs"];
        assert_eq!(select(&names, Some("^lib/"), Some("_test")), vec!["lib/a.rs"]);
    }

    #[test]
    fn excluded_names_never_survive() {
        let names = ["x1", "x2", "y1", "y2"];
        let patterns = Patterns::compile(Some("."), Some("2")).unwrap();
        let kept = filter_names(names.iter().copied(), &patterns);
        assert!(kept.iter().all(|n| !patterns.excluded(n)));
        assert_eq!(kept, vec!["x1", "y1"]);
    }

    #[test]
    fn plain_text_pattern_matches_substring() {
        let names = ["docs/guide.md", "src/main.rs"];
        assert_eq!(select(&names, Some("guide"), None), vec!["docs/guide.md"]);
    }

    #[test]
    fn lookahead_patterns_filter_names() {
        let names = ["src/a.rs", "src/a_test.rs", "tests/b.rs"];
        assert_eq!(select(&names, Some(r"^src/(?!.*_test)"), None), vec!["src/a.rs"]);
        assert_eq!(select(&names, None, Some(r"(?<=/)a")), vec!["tests/b.rs"]);
    }

    #[test]
    fn backreference_patterns_filter_names() {
        let names = ["aa.txt", "ab.txt", "docs/docs.md", "docs/api.md"];
        assert_eq!(
            select(&names, None, Some(r"^(\w)\1")),
            vec!["ab.txt", "docs/docs.md", "docs/api.md"]
        );
        assert_eq!(select(&names, Some(r"^(\w+)/\1\."), None), vec!["docs/docs.md"]);
    }

    #[test]
    fn empty_pattern_text_is_ignored() {
        assert_eq!(select(&["a", "b"], Some(""), Some("")), vec!["a", "b"]);
    }

    #[test]
    fn invalid_pattern_names_itself() {
        let err = Patterns::compile(Some("ok"), Some("(unclosed")).unwrap_err();
        match err {
            GitkitError::InvalidPattern { kind, pattern, message } => {
                assert_eq!(kind, PatternKind::Exclude);
                assert_eq!(pattern, "(unclosed");
                assert!(!message.is_empty());
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let err = Patterns::compile(Some("[z-a]"), None).unwrap_err();
        assert!(matches!(
            err,
            GitkitError::InvalidPattern { kind: PatternKind::Include, .. }
        ));
    }

    #[test]
    fn none_keeps_non_empty_names() {
        let patterns = Patterns::none();
        assert!(patterns.keep("anything"));
        assert!(!patterns.keep(""));
    }
}
