//! Grader configuration merging.
//!
//! Loads the case's grader config (or the built-in default) and applies
//! case-specific overrides.

use std::path::Path;

use anyhow::Result;
use grader::io::config::{GraderConfig, load_config};

use crate::case::{CaseConfig, resolve_relative};

/// Build the grader config for a case: file (if named), then overrides.
pub fn case_grader_config(case_path: &Path, overrides: &CaseConfig) -> Result<GraderConfig> {
    let base = match &overrides.path {
        Some(path) => load_config(&resolve_relative(case_path, path))?,
        None => GraderConfig::default(),
    };
    apply_case_config(base, overrides)
}

/// Apply case configuration overrides to the base grader config.
pub fn apply_case_config(mut base: GraderConfig, overrides: &CaseConfig) -> Result<GraderConfig> {
    if let Some(timeout) = overrides.command_timeout_secs {
        base.command_timeout_secs = timeout;
    }
    base.validate()?;
    Ok(base)
}
