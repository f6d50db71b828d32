//! Authoring-time checks that a question's stored cases fit its function config.

use crate::core::listy::decode_listy;
use crate::core::signature::{Question, TestCase};

/// Every problem found in `question`; an empty list means it is usable.
///
/// Messages name the case list (`examples` or `test_cases`), the 1-based case
/// number and the offending slot.
pub fn validate_question(question: &Question) -> Vec<String> {
    let mut errors = Vec::new();
    if question.test_cases.is_empty() {
        errors.push("test_cases: at least one test case is required".to_string());
    }
    check_cases("examples", &question.examples, question, &mut errors);
    check_cases("test_cases", &question.test_cases, question, &mut errors);
    errors
}

fn check_cases(label: &str, cases: &[TestCase], question: &Question, errors: &mut Vec<String>) {
    let spec = &question.function_config;
    for (index, case) in cases.iter().enumerate() {
        let at = format!("{label}[{}]", index + 1);
        if case.parameter_text.len() != spec.parameters.len() {
            errors.push(format!(
                "{at}: expected {} parameters, got {}",
                spec.parameters.len(),
                case.parameter_text.len()
            ));
            continue;
        }
        for (position, (text, descriptor)) in
            case.parameter_text.iter().zip(&spec.parameters).enumerate()
        {
            if let Err(err) = decode_listy(text, descriptor) {
                errors.push(format!("{at}: parameter {}: {err}", position + 1));
            }
        }
        if let Err(err) = decode_listy(&case.expected_text, &spec.return_type) {
            errors.push(format!("{at}: expected output: {err}"));
        }
    }
}
