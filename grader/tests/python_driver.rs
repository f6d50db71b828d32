//! Python candidates graded through the default config and the bundled driver.
//!
//! These need `python3` on PATH; each test returns early when it is missing.

use std::process::{Command, Stdio};

use grader::core::descriptor::TypeDescriptor;
use grader::core::signature::{CallableSpec, TestCase};
use grader::core::verdict::Verdict;
use grader::engine::{evaluate, evaluate_report};
use grader::io::config::GraderConfig;
use grader::io::loader::ProcessLoader;

fn python3_available() -> bool {
    let found = Command::new("python3")
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok_and(|status| status.success());
    if !found {
        eprintln!("python3 not found, skipping");
    }
    found
}

fn loader() -> ProcessLoader {
    ProcessLoader::new(GraderConfig::default())
}

fn max_profit_spec() -> CallableSpec {
    CallableSpec::new(
        "maxProfit",
        vec![TypeDescriptor::array(TypeDescriptor::integer())],
        TypeDescriptor::integer(),
    )
}

fn max_profit_cases() -> Vec<TestCase> {
    vec![
        TestCase::new(["[7, 1, 5, 3, 6, 4]"], "5"),
        TestCase::new(["[7, 6, 4, 3, 1]"], "0"),
        TestCase::new(["[2, 4, 1]"], "2"),
    ]
}

fn invert_tree_spec() -> CallableSpec {
    let tree = TypeDescriptor::binary_tree(TypeDescriptor::integer());
    CallableSpec::new("invertTree", vec![tree.clone()], tree)
}

fn invert_tree_cases() -> Vec<TestCase> {
    vec![
        TestCase::new(["[4, 2, 7, 1, 3, 6, 9]"], "[4, 7, 2, 9, 6, 3, 1]"),
        TestCase::new(["[2, 1, 3]"], "[2, 3, 1]"),
        TestCase::new(["[]"], "[]"),
    ]
}

const MAX_PROFIT: &str = r#"
class Solution:
    def maxProfit(self, prices: List[int]) -> int:
        best, low = 0, float("inf")
        for price in prices:
            low = min(low, price)
            best = max(best, price - low)
        return best
"#;

const MAX_PROFIT_ALWAYS_ONE: &str = r#"
class Solution:
    def maxProfit(self, prices: List[int]) -> int:
        return 1
"#;

const MAX_PROFIT_SYNTAX_ERROR: &str = r#"
class Solution:
    def maxProfit(self, prices: List[int]) -> int
        return 0
"#;

const INVERT_TREE_OPTIONAL: &str = r#"
class Solution:
    def invertTree(self, root: Optional[TreeNode]) -> Optional[TreeNode]:
        if root is None:
            return None
        root.left, root.right = self.invertTree(root.right), self.invertTree(root.left)
        return root
"#;

const INVERT_TREE_UNION: &str = r#"
class Solution:
    def invertTree(self, root: TreeNode | None) -> TreeNode | None:
        if root is None:
            return None
        root.left, root.right = self.invertTree(root.right), self.invertTree(root.left)
        return root
"#;

/// Answers correctly only while its call counter matches the case order.
const COUNTING: &str = r#"
calls = 0

class Solution:
    def __init__(self):
        self.seen = []

    def maxProfit(self, prices: List[int]) -> int:
        global calls
        calls += 1
        self.seen.append(prices)
        print("call", calls)
        return len(self.seen) * 10 + calls
"#;

#[test]
fn correct_max_profit_passes() {
    if !python3_available() {
        return;
    }
    let report = evaluate_report(&loader(), MAX_PROFIT, &max_profit_cases(), &max_profit_spec());
    assert_eq!(report.verdict, Verdict::Pass);
    assert_eq!(report.cases_run, 3);
}

#[test]
fn wrong_max_profit_fails() {
    if !python3_available() {
        return;
    }
    let report = evaluate_report(
        &loader(),
        MAX_PROFIT_ALWAYS_ONE,
        &max_profit_cases(),
        &max_profit_spec(),
    );
    assert_eq!(report.verdict, Verdict::Fail);
    let mismatch = report.mismatch.expect("mismatch");
    assert_eq!(mismatch.case_index, 0);
    assert_eq!(mismatch.actual, Some(serde_json::json!(1)));
}

#[test]
fn syntax_error_is_a_compile_error() {
    if !python3_available() {
        return;
    }
    let verdict = evaluate(
        &loader(),
        MAX_PROFIT_SYNTAX_ERROR,
        &max_profit_cases(),
        &max_profit_spec(),
    );
    let Verdict::Error(message) = verdict else {
        panic!("expected error verdict, got {verdict:?}");
    };
    assert!(message.starts_with("compilation failed: "), "{message}");
}

#[test]
fn invert_tree_with_optional_hints_passes() {
    if !python3_available() {
        return;
    }
    let verdict = evaluate(
        &loader(),
        INVERT_TREE_OPTIONAL,
        &invert_tree_cases(),
        &invert_tree_spec(),
    );
    assert_eq!(verdict, Verdict::Pass);
}

#[test]
fn invert_tree_with_union_hints_passes() {
    if !python3_available() {
        return;
    }
    let verdict = evaluate(
        &loader(),
        INVERT_TREE_UNION,
        &invert_tree_cases(),
        &invert_tree_spec(),
    );
    assert_eq!(verdict, Verdict::Pass);
}

#[test]
fn candidate_state_persists_across_cases() {
    if !python3_available() {
        return;
    }
    // The instance list and the module global both advance once per case.
    let cases = vec![
        TestCase::new(["[1]"], "11"),
        TestCase::new(["[2]"], "22"),
        TestCase::new(["[3]"], "33"),
    ];
    let report = evaluate_report(&loader(), COUNTING, &cases, &max_profit_spec());
    assert_eq!(report.verdict, Verdict::Pass, "{:?}", report.mismatch);
    assert_eq!(report.cases_run, 3);
}

#[test]
fn candidate_exception_is_a_runtime_error() {
    if !python3_available() {
        return;
    }
    let source = r#"
class Solution:
    def maxProfit(self, prices: List[int]) -> int:
        return prices[10]
"#;
    let verdict = evaluate(&loader(), source, &max_profit_cases(), &max_profit_spec());
    assert_eq!(
        verdict,
        Verdict::error("runtime error: IndexError: list index out of range")
    );
}
