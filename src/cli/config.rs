use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context as _, Result};
use serde::Deserialize;

use crate::engine::coordinator::timeout_from_secs;
use crate::engine::types::LockScope;

pub const DEFAULT_CONFIG_FILE: &str = "agent-runner.yaml";

/// Configuration loaded from `agent-runner.yaml`.
/// All fields are optional; missing fields fall back to CLI/env/defaults.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct RunnerConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub max_body: Option<usize>,
    /// Default lock wait and run time bound, in seconds.
    pub lock_timeout_s: Option<f64>,
    pub lock_scope: Option<LockScope>,
    pub api_key: Option<String>,
    /// Agent type → run time in seconds for the built-in agents.
    /// e.g. `document-extractor: 2.5`
    pub run_times: Option<HashMap<String, f64>>,
}

impl RunnerConfig {
    /// Load configuration from a YAML file.
    ///
    /// - If `path` is `Some`, load that specific file (error if missing).
    /// - If `path` is `None`, auto-detect `agent-runner.yaml` in cwd; return defaults if absent.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file_path = match path {
            Some(p) => {
                if !p.exists() {
                    anyhow::bail!("Config file not found: {}", p.display());
                }
                p.to_path_buf()
            }
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if !default_path.exists() {
                    return Ok(Self::default());
                }
                default_path.to_path_buf()
            }
        };

        let contents = std::fs::read_to_string(&file_path)
            .with_context(|| format!("Failed to read config file: {}", file_path.display()))?;

        let config: RunnerConfig = serde_yml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", file_path.display()))?;

        if let Some(seconds) = config.lock_timeout_s {
            timeout_from_secs(seconds).with_context(|| {
                format!("Invalid lock_timeout_s in {}", file_path.display())
            })?;
        }

        Ok(config)
    }
}
