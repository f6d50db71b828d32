use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::outcome::Outcome;
use crate::results::EvalMeta;

#[derive(Debug, Default)]
pub struct ReportSummary {
    pub runs: usize,
    pub pass: usize,
    pub fail: usize,
    pub error: usize,
    /// Runs whose outcome was the one the case expects.
    pub matched: usize,
    pub avg_duration_secs: Option<f64>,
}

impl ReportSummary {
    pub fn match_rate(&self) -> Option<f64> {
        (self.runs > 0).then(|| self.matched as f64 / self.runs as f64)
    }
}

pub fn load_run_dirs(case_results_dir: &Path) -> Result<Vec<PathBuf>> {
    if !case_results_dir.exists() {
        return Ok(Vec::new());
    }
    let mut dirs = Vec::new();
    for entry in fs::read_dir(case_results_dir)
        .with_context(|| format!("read {}", case_results_dir.display()))?
    {
        let entry = entry.context("read entry")?;
        if entry.path().is_dir() {
            dirs.push(entry.path());
        }
    }
    dirs.sort();
    Ok(dirs)
}

pub fn aggregate(case_results_dir: &Path) -> Result<(ReportSummary, Vec<String>)> {
    let mut summary = ReportSummary::default();
    let mut warnings = Vec::new();

    for run_dir in load_run_dirs(case_results_dir)? {
        let meta_path = run_dir.join("meta.json");
        let meta: EvalMeta = match fs::read_to_string(&meta_path)
            .with_context(|| format!("read {}", meta_path.display()))
            .and_then(|contents| serde_json::from_str(&contents).context("parse meta"))
        {
            Ok(meta) => meta,
            Err(err) => {
                warnings.push(format!(
                    "skip {}: meta.json invalid ({err})",
                    run_dir.display()
                ));
                continue;
            }
        };

        summary.runs += 1;
        match meta.outcome {
            Outcome::Pass => summary.pass += 1,
            Outcome::Fail => summary.fail += 1,
            Outcome::Error => summary.error += 1,
        }
        if meta.matched {
            summary.matched += 1;
        }

        summary.avg_duration_secs = Some(match summary.avg_duration_secs {
            None => meta.duration_secs,
            Some(avg) => {
                let total = avg * (summary.runs as f64 - 1.0) + meta.duration_secs;
                total / summary.runs as f64
            }
        });
    }

    Ok((summary, warnings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_meta(path: &Path, outcome: Outcome, matched: bool, duration: f64) {
        let meta = EvalMeta {
            case_id: "case".to_string(),
            eval_run_id: "run".to_string(),
            question_hash: "hash".to_string(),
            solution_hash: "hash".to_string(),
            outcome,
            message: None,
            cases_run: 1,
            expect: Outcome::Pass,
            matched,
            start_time: "now".to_string(),
            end_time: "later".to_string(),
            duration_secs: duration,
            errors: Vec::new(),
        };
        let contents = serde_json::to_string_pretty(&meta).expect("meta json");
        fs::write(path, format!("{contents}\n")).expect("write meta");
    }

    #[test]
    fn aggregates_runs() {
        let temp = tempdir().expect("tempdir");
        let run1 = temp.path().join("run1");
        let run2 = temp.path().join("run2");
        let broken = temp.path().join("run3");
        for dir in [&run1, &run2, &broken] {
            fs::create_dir_all(dir).expect("run dir");
        }

        write_meta(&run1.join("meta.json"), Outcome::Pass, true, 5.0);
        write_meta(&run2.join("meta.json"), Outcome::Fail, false, 15.0);
        fs::write(broken.join("meta.json"), "{").expect("write broken");

        let (summary, warnings) = aggregate(temp.path()).expect("aggregate");
        assert_eq!(warnings.len(), 1);
        assert_eq!(summary.runs, 2);
        assert_eq!(summary.pass, 1);
        assert_eq!(summary.fail, 1);
        assert_eq!(summary.matched, 1);
        assert_eq!(summary.match_rate(), Some(0.5));
        assert_eq!(summary.avg_duration_secs, Some(10.0));
    }

    #[test]
    fn missing_results_dir_is_empty() {
        let temp = tempdir().expect("tempdir");
        let (summary, warnings) = aggregate(&temp.path().join("none")).expect("aggregate");
        assert_eq!(summary.runs, 0);
        assert_eq!(summary.match_rate(), None);
        assert!(warnings.is_empty());
    }
}
