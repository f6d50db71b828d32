//! Case file parsing and validation.
//!
//! A case pairs a question file with a reference solution and the verdict the
//! grader is expected to reach. Paths are relative to the case file.
//! See `eval/cases/` for examples.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use serde::Deserialize;

use crate::outcome::Outcome;

/// A parsed case file.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct CaseFile {
    pub case: CaseMeta,
    #[serde(default)]
    pub config: CaseConfig,
}

/// Case metadata: identifier, inputs and expected verdict.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct CaseMeta {
    /// Unique identifier (slug format: `[a-z0-9_-]+`).
    pub id: String,
    /// Question JSON file.
    pub question: PathBuf,
    /// Candidate source graded against the question.
    pub solution: PathBuf,
    pub expect: Outcome,
    /// Also run the question's examples before its test cases.
    #[serde(default)]
    pub with_examples: bool,
}

/// Grader configuration overrides for the case.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct CaseConfig {
    /// Grader config file (default: built-in Python driver config).
    pub path: Option<PathBuf>,
    /// Per-command timeout override.
    pub command_timeout_secs: Option<u64>,
}

impl CaseFile {
    /// Load and validate a case file from the given path.
    pub fn load(path: &Path) -> Result<Self> {
        let contents =
            fs::read_to_string(path).with_context(|| format!("read case {}", path.display()))?;
        let case = Self::parse_str(&contents)
            .with_context(|| format!("load case {}", path.display()))?;
        Ok(case)
    }

    pub fn parse_str(contents: &str) -> Result<Self> {
        let case: CaseFile = toml::from_str(contents).context("parse case")?;
        case.validate()?;
        Ok(case)
    }

    fn validate(&self) -> Result<()> {
        validate_case_id(&self.case.id)?;
        if self.case.question.as_os_str().is_empty() {
            bail!("case.question must be non-empty");
        }
        if self.case.solution.as_os_str().is_empty() {
            bail!("case.solution must be non-empty");
        }
        if let Some(path) = &self.config.path
            && path.as_os_str().is_empty()
        {
            bail!("config.path must be non-empty");
        }
        if let Some(timeout) = self.config.command_timeout_secs
            && timeout == 0
        {
            bail!("config.command_timeout_secs must be > 0");
        }
        Ok(())
    }
}

/// Resolve `path` against the directory holding the case file.
pub fn resolve_relative(case_path: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    case_path
        .parent()
        .map(|dir| dir.join(path))
        .unwrap_or_else(|| path.to_path_buf())
}

/// Discover and load all case files from a directory.
///
/// Returns cases sorted by id. Errors if duplicate ids are found.
pub fn discover_cases(dir: &Path) -> Result<Vec<CaseFile>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut cases = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("read cases dir {}", dir.display()))? {
        let entry = entry.context("read case entry")?;
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("toml") {
            continue;
        }
        cases.push(CaseFile::load(&path)?);
    }
    cases.sort_by(|left, right| left.case.id.cmp(&right.case.id));
    for pair in cases.windows(2) {
        if pair[0].case.id == pair[1].case.id {
            return Err(anyhow!("duplicate case.id {}", pair[0].case.id));
        }
    }
    Ok(cases)
}

pub fn validate_case_id(id: &str) -> Result<()> {
    if id.trim().is_empty() {
        bail!("case.id must be non-empty");
    }
    if !id
        .chars()
        .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '-' || ch == '_')
    {
        bail!("case.id must use [a-z0-9_-] only");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_case() {
        let input = r#"
[case]
id = "max-profit-pass"
question = "../questions/max_profit.json"
solution = "../solutions/max_profit.py"
expect = "pass"

[config]
command_timeout_secs = 5
"#;
        let case = CaseFile::parse_str(input).expect("case parses");
        assert_eq!(case.case.id, "max-profit-pass");
        assert_eq!(case.case.expect, Outcome::Pass);
        assert!(!case.case.with_examples);
        assert_eq!(case.config.command_timeout_secs, Some(5));
    }

    #[test]
    fn rejects_invalid_id() {
        let input = r#"
[case]
id = "bad/id"
question = "q.json"
solution = "s.py"
expect = "fail"
"#;
        let err = CaseFile::parse_str(input).expect_err("invalid id");
        assert!(err.to_string().contains("case.id"));
    }

    #[test]
    fn rejects_unknown_expectation() {
        let input = r#"
[case]
id = "max-profit"
question = "q.json"
solution = "s.py"
expect = "stuck"
"#;
        let _err = CaseFile::parse_str(input).expect_err("invalid expectation");
    }

    #[test]
    fn rejects_zero_timeout() {
        let input = r#"
[case]
id = "max-profit"
question = "q.json"
solution = "s.py"
expect = "error"

[config]
command_timeout_secs = 0
"#;
        let err = CaseFile::parse_str(input).expect_err("zero timeout");
        assert!(err.to_string().contains("command_timeout_secs"));
    }

    #[test]
    fn resolves_paths_next_to_case_file() {
        let case_path = Path::new("/repo/eval/cases/max.toml");
        assert_eq!(
            resolve_relative(case_path, Path::new("../questions/q.json")),
            PathBuf::from("/repo/eval/cases/../questions/q.json")
        );
        assert_eq!(
            resolve_relative(case_path, Path::new("/abs/q.json")),
            PathBuf::from("/abs/q.json")
        );
    }

    #[test]
    fn discovers_cases_sorted_by_id() {
        let temp = tempfile::tempdir().expect("tempdir");
        for id in ["b-case", "a-case"] {
            fs::write(
                temp.path().join(format!("{id}.toml")),
                format!(
                    "[case]\nid = \"{id}\"\nquestion = \"q.json\"\nsolution = \"s.py\"\nexpect = \"pass\"\n"
                ),
            )
            .expect("write case");
        }
        fs::write(temp.path().join("notes.md"), "ignored").expect("write notes");
        let cases = discover_cases(temp.path()).expect("discover");
        let ids: Vec<&str> = cases.iter().map(|case| case.case.id.as_str()).collect();
        assert_eq!(ids, vec!["a-case", "b-case"]);
    }
}
