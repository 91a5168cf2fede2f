//! Data validation utilities.
//!
//! A data directory holds `rules/*.ron` rulesets and `scenarios/*.ron`
//! battle setups. Scenarios are validated by actually setting them up
//! and resolving every scheduled order name.

use std::path::{Path, PathBuf};

use skirmish_core::rules::Ruleset;

use crate::error::{Result, ToolError};
use crate::scenario::Scenario;

/// Outcome of validating a data directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationSummary {
    /// Rulesets that passed.
    pub rulesets: usize,
    /// Scenarios that passed.
    pub scenarios: usize,
}

/// Validate a single ruleset file.
///
/// # Errors
///
/// Returns an error if the file cannot be read, parsed or validated.
pub fn validate_ruleset_file(path: &Path) -> Result<Ruleset> {
    Ok(Ruleset::load(path)?)
}

/// Validate a single scenario file.
///
/// # Errors
///
/// Returns an error if the scenario cannot be parsed or set up, or if an
/// order names an unknown faction or ship.
pub fn validate_scenario_file(path: &Path) -> Result<Scenario> {
    let scenario = Scenario::load(path)?;
    let (_, roster) = scenario.setup()?;
    for order in &scenario.orders {
        order.to_command(&roster)?;
    }
    Ok(scenario)
}

fn ron_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let entries = std::fs::read_dir(dir).map_err(|source| ToolError::Io {
        path: dir.display().to_string(),
        source,
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| ToolError::Io {
            path: dir.display().to_string(),
            source,
        })?;
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "ron") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Validate all RON data files in a directory.
///
/// # Errors
///
/// Returns the first file that fails validation.
pub fn validate_data_directory(path: &Path) -> Result<ValidationSummary> {
    let mut summary = ValidationSummary::default();

    for file in ron_files(&path.join("rules"))? {
        validate_ruleset_file(&file)?;
        tracing::debug!(file = %file.display(), "Ruleset valid");
        summary.rulesets += 1;
    }
    for file in ron_files(&path.join("scenarios"))? {
        validate_scenario_file(&file)?;
        tracing::debug!(file = %file.display(), "Scenario valid");
        summary.scenarios += 1;
    }

    Ok(summary)
}
