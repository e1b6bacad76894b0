use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Sampling parameters for one gateway call shape.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SamplingParams {
    pub temperature: f64,
    pub top_p: Option<f64>,
    pub max_tokens: u32,
    pub reasoning_budget: Option<u32>,
}

/// Run configuration with per-phase sampling parameters. Values come
/// from `prompt-refine.toml` when present, otherwise from defaults that
/// match the tool's documented behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default = "defaults::max_iterations")]
    pub max_iterations: usize,
    #[serde(default = "defaults::concurrency")]
    pub concurrency: usize,
    #[serde(default = "defaults::evaluation")]
    pub evaluation: SamplingParams,
    #[serde(default = "defaults::critique")]
    pub critique: SamplingParams,
    #[serde(default = "defaults::rewrite")]
    pub rewrite: SamplingParams,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_iterations: defaults::max_iterations(),
            concurrency: defaults::concurrency(),
            evaluation: defaults::evaluation(),
            critique: defaults::critique(),
            rewrite: defaults::rewrite(),
        }
    }
}

impl RunConfig {
    pub fn load_or_default() -> Self {
        let config_path = Path::new("prompt-refine.toml");

        if config_path.exists() {
            match Self::load(config_path) {
                Ok(config) => return config,
                Err(e) => {
                    eprintln!("Warning: Failed to load config file: {}", e);
                    eprintln!("Using default configuration");
                }
            }
        }

        Self::default()
    }

    pub fn load(path: &Path) -> Result<Self, String> {
        let content =
            fs::read_to_string(path).map_err(|e| format!("Failed to read config file: {}", e))?;

        let config: RunConfig =
            toml::from_str(&content).map_err(|e| format!("Failed to parse config file: {}", e))?;

        Ok(config)
    }
}

mod defaults {
    use super::SamplingParams;

    pub fn max_iterations() -> usize {
        5
    }

    pub fn concurrency() -> usize {
        8
    }

    pub fn evaluation() -> SamplingParams {
        SamplingParams {
            temperature: 0.1,
            top_p: Some(0.9),
            max_tokens: 2000,
            reasoning_budget: None,
        }
    }

    pub fn critique() -> SamplingParams {
        SamplingParams {
            temperature: 1.0,
            top_p: None,
            max_tokens: 4096,
            reasoning_budget: Some(2048),
        }
    }

    pub fn rewrite() -> SamplingParams {
        SamplingParams {
            temperature: 0.1,
            top_p: Some(0.9),
            max_tokens: 2048,
            reasoning_budget: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RunConfig::default();
        assert_eq!(config.max_iterations, 5);
        assert_eq!(config.concurrency, 8);
        assert_eq!(config.evaluation.max_tokens, 2000);
        assert!(config.critique.reasoning_budget.is_some());
        assert!(config.rewrite.reasoning_budget.is_none());
    }

    #[test]
    fn test_load_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prompt-refine.toml");
        fs::write(&path, "max_iterations = 2\nconcurrency = 3\n").unwrap();

        let config = RunConfig::load(&path).unwrap();
        assert_eq!(config.max_iterations, 2);
        assert_eq!(config.concurrency, 3);
        assert_eq!(config.critique.max_tokens, 4096);
    }

    #[test]
    fn test_load_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prompt-refine.toml");
        fs::write(&path, "max_iterations = \"not a number\"").unwrap();

        let result = RunConfig::load(&path);
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("Failed to parse config file"));
    }

    #[test]
    fn test_round_trip() {
        let config = RunConfig::default();
        let serialized = toml::to_string_pretty(&config).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prompt-refine.toml");
        fs::write(&path, serialized).unwrap();

        let loaded = RunConfig::load(&path).unwrap();
        assert_eq!(loaded.max_iterations, config.max_iterations);
        assert_eq!(loaded.evaluation.max_tokens, config.evaluation.max_tokens);
    }
}
