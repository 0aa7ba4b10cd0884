use crate::pipeline::EngineParams;
use crate::script::Task;
use crate::synthetic::{StandardSheet, SyntheticConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Both,
}

impl OutputFormat {
    pub fn includes_text(self) -> bool {
        matches!(self, OutputFormat::Text | OutputFormat::Both)
    }

    pub fn includes_json(self) -> bool {
        matches!(self, OutputFormat::Json | OutputFormat::Both)
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub format: OutputFormat,
    /// Run report destination; stdout when unset.
    pub json_out: Option<PathBuf>,
    /// Print the indented score tree after each run.
    pub dump_tree: bool,
    /// Where to save the task log of the applied corrections.
    pub task_log_out: Option<PathBuf>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub output: OutputConfig,
    pub engine: EngineParams,
    pub synthetic: SyntheticConfig,
    /// Corrections applied after the first run, each followed by a re-run.
    pub tasks: Vec<Task>,
}

impl RuntimeConfig {
    /// Reject settings the sheet generator and the stages cannot work with.
    pub fn validate(&self) -> Result<(), String> {
        let synthetic = &self.synthetic;
        if synthetic.interline < 4 {
            return Err(format!(
                "synthetic.interline must be at least 4 pixels, got {}",
                synthetic.interline
            ));
        }
        if synthetic.systems == 0 || synthetic.staves_per_system == 0 {
            return Err("synthetic sheet needs at least one system and one staff per system".to_string());
        }
        let min_width = 2 * StandardSheet::MARGIN + 4 * synthetic.interline;
        if synthetic.width < min_width {
            return Err(format!(
                "synthetic.width must be at least {min_width}, got {}",
                synthetic.width
            ));
        }
        if self.engine.grid.lines_per_staff < 2 {
            return Err("engine.grid.lines_per_staff must be at least 2".to_string());
        }
        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<RuntimeConfig, String> {
    let contents = fs::read_to_string(path)
        .map_err(|e| format!("Cannot read sheet config {}: {e}", path.display()))?;
    let config: RuntimeConfig = serde_json::from_str(&contents)
        .map_err(|e| format!("Sheet config {} is not valid JSON: {e}", path.display()))?;
    config
        .validate()
        .map_err(|reason| format!("Sheet config {}: {reason}", path.display()))?;
    Ok(config)
}

/// `program [config.json]`; defaults apply without a config file.
pub fn parse_cli(program: &str) -> Result<RuntimeConfig, String> {
    parse_args(program, std::env::args().skip(1))
}

pub fn parse_args(program: &str, args: impl IntoIterator<Item = String>) -> Result<RuntimeConfig, String> {
    let args: Vec<String> = args.into_iter().collect();
    match args.as_slice() {
        [] => Ok(RuntimeConfig::default()),
        [flag] if flag == "-h" || flag == "--help" => Err(format!("Usage: {program} [config.json]")),
        [path] => load_config(Path::new(path)),
        _ => Err(format!("Usage: {program} [config.json]")),
    }
}

pub fn write_json_file<T: Serialize>(path: &Path, value: &T) -> Result<(), String> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| format!("Failed to serialize JSON: {e}"))?;
    fs::write(path, json).map_err(|e| format!("Failed to write {}: {e}", path.display()))
}
