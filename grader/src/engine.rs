//! Evaluation engine: compile a candidate, resolve the callable, run cases.
//!
//! The [`Loader`] and [`Unit`] traits are the compiler/loader contract. The
//! engine knows nothing about how source becomes callable; tests use an
//! in-process loader, the CLI uses [`crate::io::loader::ProcessLoader`].
//!
//! Cases run strictly in order and the first mismatch or error ends the run.

use serde_json::Value as Json;
use tracing::{debug, info, instrument, warn};

use crate::core::codec;
use crate::core::error::{CodecError, LoaderError};
use crate::core::listy::decode_generic;
use crate::core::signature::{CallableSpec, Symbol, TestCase, resolve};
use crate::core::value::Value;
use crate::core::verdict::{Mismatch, Report, Verdict};

/// Unit name used when a loader does not pick its own.
pub const DEFAULT_UNIT_NAME: &str = "UserSolution";

/// Turns candidate source into an invocable unit.
pub trait Loader {
    type Unit: Unit;

    /// Name the candidate's unit (class, module, file stem) is compiled under.
    fn unit_name(&self) -> &str {
        DEFAULT_UNIT_NAME
    }

    fn compile(&self, unit_name: &str, source: &str) -> Result<Self::Unit, LoaderError>;
}

/// A compiled candidate. Dropping the unit releases everything it holds.
pub trait Unit {
    /// Callables the unit exposes.
    fn symbols(&mut self) -> Result<Vec<Symbol>, LoaderError>;

    /// Call `symbol` with decoded arguments; the result must have the shape
    /// of `spec.return_type`.
    fn invoke(
        &mut self,
        symbol: &Symbol,
        spec: &CallableSpec,
        args: &[Value],
    ) -> Result<Value, LoaderError>;
}

/// Evaluate `source` against every case and return the verdict.
pub fn evaluate<L: Loader>(
    loader: &L,
    source: &str,
    cases: &[TestCase],
    spec: &CallableSpec,
) -> Verdict {
    evaluate_report(loader, source, cases, spec).verdict
}

/// Evaluate and keep the failing-case detail.
#[instrument(skip_all, fields(callable = %spec.name, cases = cases.len()))]
pub fn evaluate_report<L: Loader>(
    loader: &L,
    source: &str,
    cases: &[TestCase],
    spec: &CallableSpec,
) -> Report {
    info!("evaluation started");
    let report = match loader.compile(loader.unit_name(), source) {
        Ok(mut unit) => run_unit(&mut unit, cases, spec),
        Err(err) => {
            warn!(err = %err, "candidate did not compile");
            Report::error(err.to_string(), 0)
        }
    };
    info!(
        verdict = report.verdict.label(),
        cases_run = report.cases_run,
        "evaluation finished"
    );
    report
}

fn run_unit<U: Unit>(unit: &mut U, cases: &[TestCase], spec: &CallableSpec) -> Report {
    let signature = spec.runtime_signature();
    let symbol = match unit
        .symbols()
        .and_then(|symbols| resolve(&symbols, &spec.name, &signature).cloned())
    {
        Ok(symbol) => symbol,
        Err(err) => {
            warn!(err = %err, signature = ?signature, "callable resolution failed");
            return Report::error(err.to_string(), 0);
        }
    };
    debug!(symbol = %symbol.name, "callable resolved");

    for (index, case) in cases.iter().enumerate() {
        let prepared = match prepare_case(case, spec) {
            Ok(prepared) => prepared,
            Err(message) => {
                warn!(case_index = index, %message, "test case could not be decoded");
                return Report::error(format!("test case {}: {message}", index + 1), index);
            }
        };

        debug!(case_index = index, "invoking candidate");
        let actual = match unit.invoke(&symbol, spec, &prepared.inputs) {
            Ok(actual) => actual,
            Err(err) => {
                warn!(case_index = index, err = %err, "invocation failed");
                return Report::error(err.to_string(), index + 1);
            }
        };

        if actual != prepared.expected {
            debug!(case_index = index, "result mismatch");
            return Report {
                verdict: Verdict::Fail,
                cases_run: index + 1,
                mismatch: Some(Mismatch {
                    case_index: index,
                    parameters: case.parameter_text.clone(),
                    expected: prepared.expected_json,
                    actual: codec::encode(&actual, &spec.return_type).ok(),
                }),
            };
        }
        debug!(case_index = index, "case passed");
    }

    Report {
        verdict: Verdict::Pass,
        cases_run: cases.len(),
        mismatch: None,
    }
}

struct PreparedCase {
    inputs: Vec<Value>,
    expected: Value,
    expected_json: Json,
}

fn prepare_case(case: &TestCase, spec: &CallableSpec) -> Result<PreparedCase, String> {
    if case.parameter_text.len() != spec.parameters.len() {
        return Err(format!(
            "expected {} parameters, got {}",
            spec.parameters.len(),
            case.parameter_text.len()
        ));
    }
    let inputs = case
        .parameter_text
        .iter()
        .zip(&spec.parameters)
        .enumerate()
        .map(|(position, (text, descriptor))| {
            decode_generic(text)
                .and_then(|json| codec::decode(&json, descriptor))
                .map_err(|err| format!("parameter {}: {err}", position + 1))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let expected_json =
        decode_generic(&case.expected_text).map_err(|err| expected_message(&err))?;
    let expected =
        codec::decode(&expected_json, &spec.return_type).map_err(|err| expected_message(&err))?;
    Ok(PreparedCase {
        inputs,
        expected,
        expected_json,
    })
}

fn expected_message(err: &CodecError) -> String {
    format!("expected output: {err}")
}
