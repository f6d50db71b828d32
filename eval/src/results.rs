//! Result capture and persistence.
//!
//! Each run writes `meta.json` (hashes, timings, verdict, expectation match)
//! and `report.json` (the grader's full report) to its results directory.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use grader::core::verdict::{Report, Verdict};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, instrument, warn};

use crate::outcome::{Outcome, classify_outcome};

/// Input for capturing results from a completed run.
#[derive(Debug)]
pub struct CaptureInput<'a> {
    pub case_id: &'a str,
    pub eval_run_id: &'a str,
    pub question_path: &'a Path,
    pub solution_path: &'a Path,
    pub expect: Outcome,
    pub report: &'a Report,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Metadata for an eval run, persisted to `meta.json`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EvalMeta {
    pub case_id: String,
    pub eval_run_id: String,
    /// SHA-256 of the question file for reproducibility tracking.
    pub question_hash: String,
    /// SHA-256 of the graded solution.
    pub solution_hash: String,
    pub outcome: Outcome,
    /// Error message when the verdict is `error`.
    pub message: Option<String>,
    pub cases_run: usize,
    pub expect: Outcome,
    pub matched: bool,
    pub start_time: String,
    pub end_time: String,
    pub duration_secs: f64,
    /// Non-fatal errors encountered during capture.
    pub errors: Vec<String>,
}

/// Write `meta.json` and `report.json` for a finished run.
#[instrument(skip_all, fields(case_id = %input.case_id, eval_run_id = %input.eval_run_id))]
pub fn capture_results(base_dir: &Path, input: &CaptureInput<'_>) -> Result<PathBuf> {
    let results_dir = results_dir(base_dir, input.case_id, input.eval_run_id);
    fs::create_dir_all(&results_dir)
        .with_context(|| format!("create results dir {}", results_dir.display()))?;

    let mut errors = Vec::new();
    let question_hash = hash_or_record(input.question_path, "question hash", &mut errors);
    let solution_hash = hash_or_record(input.solution_path, "solution hash", &mut errors);
    if !errors.is_empty() {
        warn!(errors = ?errors, "result capture had errors");
    }

    let outcome = classify_outcome(&input.report.verdict);
    let message = match &input.report.verdict {
        Verdict::Error(message) => Some(message.clone()),
        Verdict::Pass | Verdict::Fail => None,
    };
    let duration = input.finished_at - input.started_at;
    let meta = EvalMeta {
        case_id: input.case_id.to_string(),
        eval_run_id: input.eval_run_id.to_string(),
        question_hash,
        solution_hash,
        outcome,
        message,
        cases_run: input.report.cases_run,
        expect: input.expect,
        matched: outcome == input.expect,
        start_time: input.started_at.to_rfc3339(),
        end_time: input.finished_at.to_rfc3339(),
        duration_secs: duration.num_milliseconds() as f64 / 1000.0,
        errors,
    };

    write_json(&results_dir.join("meta.json"), &meta)?;
    write_json(&results_dir.join("report.json"), input.report)?;
    debug!(results_dir = %results_dir.display(), "results captured");
    Ok(results_dir)
}

pub fn results_dir(base_dir: &Path, case_id: &str, eval_run_id: &str) -> PathBuf {
    base_dir.join(case_id).join(eval_run_id)
}

fn hash_or_record(path: &Path, label: &str, errors: &mut Vec<String>) -> String {
    match file_sha256(path) {
        Ok(hash) => hash,
        Err(err) => {
            errors.push(format!("{label}: {err:#}"));
            String::new()
        }
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let contents = serde_json::to_string_pretty(value).context("serialize json")?;
    fs::write(path, format!("{contents}\n"))
        .with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

fn file_sha256(path: &Path) -> Result<String> {
    let contents = fs::read(path).with_context(|| format!("read {}", path.display()))?;
    let mut hasher = Sha256::new();
    hasher.update(contents);
    let digest = hasher.finalize();
    Ok(hex::encode(digest))
}
