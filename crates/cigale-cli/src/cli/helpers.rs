use super::CliError;
use anyhow::Context;
use cigale_core::domain::{
    BandSelection, CigaleError, CigaleResult, ModuleConfig, ParamMap, ParamValue, Scalar,
};
use cigale_core::driver::{OutputTarget, SimulationDriver, SimulationRequest};
use cigale_core::process::SystemProcessRunner;
use cigale_core::table::{ColumnData, ModelTable};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub(super) struct CliContext {
    pub(super) pcigale: String,
    pub(super) working_dir: PathBuf,
}

impl CliContext {
    pub(super) fn new(pcigale: String, workdir: Option<PathBuf>) -> Result<Self, CliError> {
        let working_dir = match workdir {
            Some(dir) => dir,
            None => std::env::current_dir().context("failed to read current working directory")?,
        };
        Ok(Self {
            pcigale,
            working_dir,
        })
    }

    pub(super) fn driver(&self) -> SimulationDriver {
        SimulationDriver::new(
            SystemProcessRunner::new(self.pcigale.clone()),
            self.working_dir.clone(),
        )
    }
}

/// JSON simulation plan as written by users.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub(super) struct SimulationPlan {
    #[serde(default)]
    pub(super) modules: Map<String, Value>,
    #[serde(default)]
    pub(super) params: Vec<String>,
    #[serde(default)]
    pub(super) bands: BandSelection,
    #[serde(default = "default_cores")]
    pub(super) cores: u32,
    #[serde(default)]
    pub(super) output_dir: Option<PathBuf>,
    #[serde(default)]
    pub(super) file_name: Option<String>,
    #[serde(default = "default_true")]
    pub(super) save_output: bool,
    #[serde(default = "default_true")]
    pub(super) delete_old_outputs: bool,
    #[serde(default)]
    pub(super) save_sed: bool,
}

fn default_cores() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

impl SimulationPlan {
    pub(super) fn request(&self) -> CigaleResult<SimulationRequest> {
        let modules = ModuleConfig::from_json_modules(&self.modules)?;
        Ok(SimulationRequest::new(modules, self.bands.clone())
            .with_cores(self.cores)
            .with_save_sed(self.save_sed)
            .with_delete_old_outputs(self.delete_old_outputs))
    }

    /// Relative output directories are resolved against the working directory.
    pub(super) fn output_target(&self, working_dir: &Path) -> OutputTarget {
        let output_dir = match &self.output_dir {
            Some(dir) => working_dir.join(dir),
            None => working_dir.to_path_buf(),
        };
        OutputTarget {
            output_dir,
            file_name: self.file_name.clone(),
            save_output: self.save_output,
        }
    }
}

pub(super) fn load_plan(path: &Path) -> CigaleResult<SimulationPlan> {
    let content = fs::read_to_string(path).map_err(|source| CigaleError::io(path, source))?;
    serde_json::from_str::<SimulationPlan>(&content).map_err(|source| CigaleError::InvalidPlan {
        path: path.to_path_buf(),
        message: source.to_string(),
    })
}

/// Parses `key=value` into a config parameter.
pub(super) fn parse_assignment(raw: &str) -> Result<(String, ParamValue), CliError> {
    let Some((key, value)) = raw.split_once('=') else {
        return Err(CliError::Usage(format!(
            "Invalid assignment '{}'; expected key=value.",
            raw
        )));
    };
    let key = key.trim();
    if key.is_empty() {
        return Err(CliError::Usage(format!(
            "Invalid assignment '{}'; the key is empty.",
            raw
        )));
    }
    Ok((key.to_string(), parse_param_value(value)))
}

pub(super) fn parse_assignments(raw: &[String]) -> Result<ParamMap, CliError> {
    let mut params = ParamMap::new();
    for assignment in raw {
        let (key, value) = parse_assignment(assignment)?;
        params.insert(key, value);
    }
    Ok(params)
}

/// Comma-separated values become sequences.
pub(super) fn parse_param_value(raw: &str) -> ParamValue {
    if raw.contains(',') {
        return ParamValue::Sequence(
            raw.split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(parse_scalar)
                .collect(),
        );
    }
    ParamValue::Scalar(parse_scalar(raw.trim()))
}

fn parse_scalar(raw: &str) -> Scalar {
    match raw {
        "True" => return Scalar::Bool(true),
        "False" => return Scalar::Bool(false),
        _ => {}
    }
    if let Ok(value) = raw.parse::<i64>() {
        return Scalar::Int(value);
    }
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() => Scalar::Float(value),
        _ => Scalar::Text(raw.to_string()),
    }
}

pub(super) fn render_table_summary(table: &ModelTable) -> String {
    let mut lines = vec![format!(
        "Model table: {} rows x {} columns",
        table.num_rows(),
        table.num_columns()
    )];
    for column in table.columns() {
        let detail = match &column.data {
            ColumnData::Float(values) => numeric_range(values.iter().copied()),
            ColumnData::Int(values) => numeric_range(values.iter().map(|value| *value as f64)),
            ColumnData::Text(_) => "text".to_string(),
        };
        lines.push(format!("  {:<32} {}", column.name, detail));
    }
    lines.join("\n")
}

fn numeric_range(values: impl Iterator<Item = f64>) -> String {
    let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), value| {
        (min.min(value), max.max(value))
    });
    if min > max {
        return "empty".to_string();
    }
    format!("min={:.6e} max={:.6e}", min, max)
}
