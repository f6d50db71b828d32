//! Callable specs, test cases and symbol resolution.

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use crate::core::descriptor::{RuntimeKind, TypeDescriptor};
use crate::core::error::LoaderError;

/// The function under test: its name, parameter shapes and return shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawCallableSpec")]
pub struct CallableSpec {
    pub name: String,
    pub parameters: Vec<TypeDescriptor>,
    pub return_type: TypeDescriptor,
}

impl CallableSpec {
    pub fn new(
        name: impl Into<String>,
        parameters: Vec<TypeDescriptor>,
        return_type: TypeDescriptor,
    ) -> Self {
        Self {
            name: name.into(),
            parameters,
            return_type,
        }
    }

    /// Parameter list as the candidate runtime sees it.
    pub fn runtime_signature(&self) -> Vec<RuntimeKind> {
        self.parameters
            .iter()
            .map(TypeDescriptor::runtime_kind)
            .collect()
    }
}

/// Envelope form. Parameters arrive either bare or wrapped as
/// `{"name": ..., "param_type": ...}` by the question store.
#[derive(Debug, Deserialize)]
struct RawCallableSpec {
    name: String,
    #[serde(default)]
    parameters: Vec<Json>,
    return_type: TypeDescriptor,
}

impl TryFrom<RawCallableSpec> for CallableSpec {
    type Error = String;

    fn try_from(raw: RawCallableSpec) -> Result<Self, Self::Error> {
        if raw.name.trim().is_empty() {
            return Err("function name must be non-empty".to_string());
        }
        let parameters = raw
            .parameters
            .into_iter()
            .enumerate()
            .map(|(index, entry)| {
                let descriptor = match entry {
                    Json::Object(mut fields) if fields.contains_key("param_type") => {
                        fields.remove("param_type").unwrap_or(Json::Null)
                    }
                    other => other,
                };
                serde_json::from_value::<TypeDescriptor>(descriptor)
                    .map_err(|err| format!("parameters[{index}]: {err}"))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(CallableSpec {
            name: raw.name,
            parameters,
            return_type: raw.return_type,
        })
    }
}

/// One test case in listy text form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    #[serde(rename = "parameters")]
    pub parameter_text: Vec<String>,
    #[serde(rename = "expected_output")]
    pub expected_text: String,
}

impl TestCase {
    pub fn new<I, S>(parameters: I, expected: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            parameter_text: parameters.into_iter().map(Into::into).collect(),
            expected_text: expected.into(),
        }
    }
}

/// A question file: the callable spec with its examples and hidden tests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub function_config: CallableSpec,
    #[serde(default)]
    pub examples: Vec<TestCase>,
    pub test_cases: Vec<TestCase>,
}

/// An entry in a candidate unit's exposed symbol table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    pub name: String,
    pub parameters: Vec<RuntimeKind>,
}

impl Symbol {
    pub fn new(name: impl Into<String>, parameters: Vec<RuntimeKind>) -> Self {
        Self {
            name: name.into(),
            parameters,
        }
    }
}

/// Find the symbol whose name and parameter list match exactly.
pub fn resolve<'a>(
    symbols: &'a [Symbol],
    name: &str,
    parameters: &[RuntimeKind],
) -> Result<&'a Symbol, LoaderError> {
    symbols
        .iter()
        .find(|symbol| symbol.name == name && symbol.parameters == parameters)
        .ok_or(LoaderError::NotFound)
}
