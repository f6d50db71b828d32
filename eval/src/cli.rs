//! CLI command implementations.

use std::path::Path;

use anyhow::{Context, Result, bail};
use tracing::{debug, info};

use crate::case::{CaseFile, discover_cases, validate_case_id};
use crate::report::aggregate;
use crate::run::run_case;

/// List all available cases.
pub fn list_cases(repo_root: &Path) -> Result<()> {
    let cases_dir = repo_root.join("eval").join("cases");
    let cases = discover_cases(&cases_dir)?;
    for case in cases {
        println!("{} expect={:?}", case.case.id, case.case.expect);
    }
    Ok(())
}

/// Run a case by id (optionally multiple times).
///
/// Returns the number of runs whose outcome did not match the expectation.
pub fn run_case_by_id(repo_root: &Path, case_id: &str, runs: u32) -> Result<u32> {
    validate_case_id(case_id)?;
    let cases_dir = repo_root.join("eval").join("cases");
    let case_path = cases_dir.join(format!("{case_id}.toml"));
    if !case_path.exists() {
        bail!("case {} not found at {}", case_id, case_path.display());
    }
    let case = CaseFile::load(&case_path).context("load case")?;
    debug!(case_id, runs, "case loaded");

    let results_base = repo_root.join("eval").join("results");
    let mut mismatched = 0;
    info!(case_id, runs, "starting runs");
    for run_num in 1..=runs {
        debug!(case_id, run_num, runs, "starting run");
        let outcome = run_case(&results_base, &case_path, &case).context("run case")?;
        if !outcome.matched {
            mismatched += 1;
        }
        println!(
            "run: case={} eval_run_id={} outcome={:?} matched={} results={}",
            case_id,
            outcome.eval_run_id,
            outcome.outcome,
            outcome.matched,
            outcome.results_dir.display()
        );
    }
    Ok(mismatched)
}

/// Show aggregated results for a case.
pub fn report_case(repo_root: &Path, case_id: &str) -> Result<()> {
    validate_case_id(case_id)?;
    let results_dir = repo_root.join("eval").join("results").join(case_id);
    let (summary, warnings) = aggregate(&results_dir)?;
    println!("report: case={} runs={}", case_id, summary.runs);
    println!(
        "report: pass={} fail={} error={}",
        summary.pass, summary.fail, summary.error
    );
    if let Some(rate) = summary.match_rate() {
        println!(
            "report: matched={}/{} ({:.0}%)",
            summary.matched,
            summary.runs,
            rate * 100.0
        );
    }
    if let Some(avg) = summary.avg_duration_secs {
        println!("report: avg_duration_secs={:.2}", avg);
    }
    for warning in warnings {
        eprintln!("warning: {}", warning);
    }
    Ok(())
}

/// Remove results for a case.
pub fn clean_case(repo_root: &Path, case_id: &str) -> Result<()> {
    validate_case_id(case_id)?;
    let case_results = repo_root.join("eval").join("results").join(case_id);
    if case_results.exists() {
        std::fs::remove_dir_all(&case_results)
            .with_context(|| format!("remove {}", case_results.display()))?;
    }
    println!("clean: case={} results={}", case_id, case_results.display());
    Ok(())
}
