use grader::core::verdict::Verdict;
use serde::{Deserialize, Serialize};

/// Verdict class: what a case expects and what a run recorded.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Pass,
    Fail,
    Error,
}

pub fn classify_outcome(verdict: &Verdict) -> Outcome {
    match verdict {
        Verdict::Pass => Outcome::Pass,
        Verdict::Fail => Outcome::Fail,
        Verdict::Error(_) => Outcome::Error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Expect {
        expect: Outcome,
    }

    #[test]
    fn classifies_each_verdict() {
        assert_eq!(classify_outcome(&Verdict::Pass), Outcome::Pass);
        assert_eq!(classify_outcome(&Verdict::Fail), Outcome::Fail);
        assert_eq!(
            classify_outcome(&Verdict::error("callable not found")),
            Outcome::Error
        );
    }

    #[test]
    fn expectation_and_recorded_outcome_share_names() {
        let parsed: Expect = toml::from_str("expect = \"error\"").expect("parse");
        assert_eq!(parsed.expect, Outcome::Error);
        assert_eq!(
            serde_json::to_value(Outcome::Fail).expect("serialize"),
            serde_json::json!("fail")
        );
        assert!(toml::from_str::<Expect>("expect = \"timeout\"").is_err());
    }
}
