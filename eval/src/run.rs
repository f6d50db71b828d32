//! Case execution orchestration.
//!
//! Loads the question and solution, grades the solution through the grader's
//! process loader, and captures the results.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use grader::core::signature::TestCase;
use grader::engine::evaluate_report;
use grader::io::loader::ProcessLoader;
use grader::io::question::load_question;
use rand::{Rng, distributions::Alphanumeric};
use tracing::{debug, info, instrument};

use crate::case::{CaseFile, resolve_relative};
use crate::config::case_grader_config;
use crate::outcome::{Outcome, classify_outcome};
use crate::results::{CaptureInput, capture_results};

/// Result of running a single case.
#[derive(Debug)]
pub struct RunOutcome {
    /// Unique identifier for this eval run.
    pub eval_run_id: String,
    /// Path to the results directory.
    pub results_dir: PathBuf,
    pub outcome: Outcome,
    /// Whether the outcome is the one the case expects.
    pub matched: bool,
}

/// Run a case end-to-end: load inputs, evaluate, capture results.
#[instrument(skip_all, fields(case_id = %case.case.id))]
pub fn run_case(results_base: &Path, case_path: &Path, case: &CaseFile) -> Result<RunOutcome> {
    info!("case run started");

    let question_path = resolve_relative(case_path, &case.case.question);
    let solution_path = resolve_relative(case_path, &case.case.solution);
    let question = load_question(&question_path)?;
    let source = fs::read_to_string(&solution_path)
        .with_context(|| format!("read solution {}", solution_path.display()))?;
    let config = case_grader_config(case_path, &case.config).context("grader config")?;
    debug!(
        question = %question_path.display(),
        solution = %solution_path.display(),
        "case inputs loaded"
    );

    let cases: Vec<TestCase> = if case.case.with_examples {
        question
            .examples
            .iter()
            .chain(&question.test_cases)
            .cloned()
            .collect()
    } else {
        question.test_cases.clone()
    };

    let eval_run_id = build_eval_run_id(
        &Utc::now().format("%Y%m%d_%H%M%S").to_string(),
        &generate_short_id(),
    );
    let loader = ProcessLoader::new(config);
    let started_at = Utc::now();
    let report = evaluate_report(&loader, &source, &cases, &question.function_config);
    let finished_at = Utc::now();

    let outcome = classify_outcome(&report.verdict);
    let matched = outcome == case.case.expect;
    info!(
        outcome = ?outcome,
        matched,
        duration_secs = (finished_at - started_at).num_milliseconds() as f64 / 1000.0,
        "evaluation finished"
    );

    let input = CaptureInput {
        case_id: &case.case.id,
        eval_run_id: &eval_run_id,
        question_path: &question_path,
        solution_path: &solution_path,
        expect: case.case.expect,
        report: &report,
        started_at,
        finished_at,
    };
    let results_dir = capture_results(results_base, &input).context("capture results")?;
    info!(results_dir = %results_dir.display(), "case run complete");

    Ok(RunOutcome {
        eval_run_id,
        results_dir,
        outcome,
        matched,
    })
}

pub fn build_eval_run_id(timestamp: &str, short_id: &str) -> String {
    format!("eval-{timestamp}-{short_id}")
}

fn generate_short_id() -> String {
    let mut rng = rand::thread_rng();
    std::iter::repeat_with(|| rng.sample(Alphanumeric))
        .map(char::from)
        .take(6)
        .collect::<String>()
        .to_lowercase()
}
