//! Evaluation outcomes.

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

/// Result of an evaluation run.
///
/// `Fail` is reserved for a successful invocation whose result differs from
/// the expected value; every other problem is an `Error`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "message", rename_all = "snake_case")]
pub enum Verdict {
    Pass,
    Fail,
    Error(String),
}

impl Verdict {
    pub fn error(message: impl Into<String>) -> Self {
        Verdict::Error(message.into())
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, Verdict::Pass)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Verdict::Pass => "pass",
            Verdict::Fail => "fail",
            Verdict::Error(_) => "error",
        }
    }
}

/// The first failing case, with both sides encoded back to listy form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mismatch {
    /// 0-based position in the test case list.
    pub case_index: usize,
    pub parameters: Vec<String>,
    pub expected: Json,
    /// `None` when the actual value could not be encoded against the return type.
    pub actual: Option<Json>,
}

/// Verdict plus the detail a caller needs to show feedback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub verdict: Verdict,
    /// Cases whose invocation was attempted, including the failing one.
    pub cases_run: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mismatch: Option<Mismatch>,
}

impl Report {
    pub fn error(message: impl Into<String>, cases_run: usize) -> Self {
        Self {
            verdict: Verdict::error(message),
            cases_run,
            mismatch: None,
        }
    }
}
