//! Question files: JSON checked against the embedded schema, then typed.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use jsonschema::Draft;
use serde_json::Value as Json;
use tracing::debug;

use crate::core::signature::Question;

/// JSON Schema (draft 2020-12) for question files.
pub const QUESTION_SCHEMA: &str = include_str!("../../../schemas/question/v1.schema.json");

/// Read and parse a question file.
pub fn load_question(path: &Path) -> Result<Question> {
    let raw = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let question =
        parse_question(&raw).with_context(|| format!("load question {}", path.display()))?;
    debug!(
        path = %path.display(),
        callable = %question.function_config.name,
        test_cases = question.test_cases.len(),
        "question loaded"
    );
    Ok(question)
}

/// Schema conformance first, then typed parsing (descriptor invariants).
pub fn parse_question(raw: &str) -> Result<Question> {
    let instance: Json = serde_json::from_str(raw).context("parse question json")?;
    let schema: Json = serde_json::from_str(QUESTION_SCHEMA).context("parse question schema")?;
    validate_schema(&instance, &schema)?;
    serde_json::from_value(instance).context("parse question as typed record")
}

fn validate_schema(instance: &Json, schema: &Json) -> Result<()> {
    let compiled = jsonschema::options()
        .with_draft(Draft::Draft202012)
        .build(schema)
        .context("compile json schema")?;
    let messages: Vec<String> = compiled
        .iter_errors(instance)
        .map(|err| err.to_string())
        .collect();
    if !messages.is_empty() {
        bail!("schema validation failed:\n- {}", messages.join("\n- "));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::descriptor::TypeDescriptor;

    const MAX_PROFIT: &str = r#"{
        "title": "Best Time to Buy and Sell Stock",
        "function_config": {
            "name": "maxProfit",
            "parameters": [
                {"name": "prices", "param_type": {"type": "Array", "type_children": {"type": "Integer"}}}
            ],
            "return_type": {"type": "Integer", "type_children": null}
        },
        "test_cases": [
            {"parameters": ["[7, 1, 5, 3, 6, 4]"], "expected_output": "5"},
            {"parameters": ["[7, 6, 4, 3, 1]"], "expected_output": "0"}
        ]
    }"#;

    #[test]
    fn parses_named_parameters() {
        let question = parse_question(MAX_PROFIT).expect("parse");
        assert_eq!(question.function_config.name, "maxProfit");
        assert_eq!(
            question.function_config.parameters,
            vec![TypeDescriptor::array(TypeDescriptor::integer())]
        );
        assert_eq!(question.test_cases.len(), 2);
        assert!(question.examples.is_empty());
    }

    #[test]
    fn schema_rejects_unknown_type_name() {
        let raw = MAX_PROFIT.replace(r#""type": "Array""#, r#""type": "Set""#);
        let err = parse_question(&raw).expect_err("schema error");
        assert!(format!("{err:#}").contains("schema validation failed"));
    }

    #[test]
    fn schema_rejects_missing_test_cases() {
        let raw = r#"{"function_config": {"name": "f", "return_type": {"type": "Integer"}}}"#;
        let err = parse_question(raw).expect_err("schema error");
        assert!(format!("{err:#}").contains("test_cases"));
    }

    #[test]
    fn descriptor_invariants_apply_after_schema() {
        let raw = MAX_PROFIT.replace(
            r#"{"type": "Array", "type_children": {"type": "Integer"}}"#,
            r#"{"type": "Array"}"#,
        );
        let err = parse_question(&raw).expect_err("missing child");
        assert!(format!("{err:#}").contains("typed record"));
    }

    #[test]
    fn load_question_reads_file() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("question.json");
        fs::write(&path, MAX_PROFIT).expect("write");
        let question = load_question(&path).expect("load");
        assert_eq!(question.title.as_deref(), Some("Best Time to Buy and Sell Stock"));
    }
}
