// Configuration types and defaults

use std::collections::HashMap;
use std::path::PathBuf;

use serde::Deserialize;

use crate::prompts::{MODEL_EASY, MODEL_HARD};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub paths: PathsConfig,
    pub ollama: OllamaConfig,
    pub run: RunConfig,
}

/// Where each pipeline stage reads and writes.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub raw_dir: PathBuf,
    pub grouped_dir: PathBuf,
    pub extracted: PathBuf,
    pub questions: PathBuf,
    pub prompts_dir: PathBuf,
    pub completions_dir: PathBuf,
    pub state_db: PathBuf,
    pub reports_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            raw_dir: PathBuf::from("data/raw"),
            grouped_dir: PathBuf::from("data/grouped"),
            extracted: PathBuf::from("extracted_groups.json"),
            questions: PathBuf::from("group_questions.yaml"),
            prompts_dir: PathBuf::from("data/prompts"),
            completions_dir: PathBuf::from("data/completions"),
            state_db: PathBuf::from("data/run_state.db"),
            reports_dir: PathBuf::from("reports"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    pub endpoint: String,
    pub timeout_secs: u64,
    pub temperature: f32,
    /// Prompt-side model names to locally served Ollama tags. Names
    /// with no mapping pass through unchanged.
    pub model_map: HashMap<String, String>,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        let model_map = HashMap::from([
            (MODEL_EASY.to_string(), "phi:latest".to_string()),
            (MODEL_HARD.to_string(), "deepseek-llm:latest".to_string()),
        ]);

        Self {
            endpoint: crate::ollama::DEFAULT_ENDPOINT.to_string(),
            timeout_secs: 900, // generous - big models can be slow
            temperature: 0.4,
            model_map,
        }
    }
}

impl OllamaConfig {
    pub fn resolve_model<'a>(&'a self, name: &'a str) -> &'a str {
        self.model_map.get(name).map(String::as_str).unwrap_or(name)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub max_workers: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self { max_workers: 3 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_model_map() {
        let config = OllamaConfig::default();
        assert_eq!(config.resolve_model(MODEL_EASY), "phi:latest");
        assert_eq!(config.resolve_model(MODEL_HARD), "deepseek-llm:latest");
        assert_eq!(config.resolve_model("qwen2:7b"), "qwen2:7b");
    }

    #[test]
    fn test_default_paths() {
        let paths = PathsConfig::default();
        assert_eq!(paths.raw_dir, PathBuf::from("data/raw"));
        assert_eq!(paths.questions, PathBuf::from("group_questions.yaml"));
    }
}
