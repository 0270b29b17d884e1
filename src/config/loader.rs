// Configuration loader
// Reads qmirac.toml from the working directory when present; built-in
// defaults otherwise. QMIRAC_OLLAMA_URL overrides the endpoint either way.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use super::settings::Config;

const CONFIG_FILE: &str = "qmirac.toml";

pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let mut config = match explicit {
        Some(path) => read_config(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => {
            let default_path = Path::new(CONFIG_FILE);
            if default_path.exists() {
                read_config(default_path)
                    .with_context(|| format!("failed to load config {}", default_path.display()))?
            } else {
                Config::default()
            }
        }
    };

    if let Ok(endpoint) = std::env::var("QMIRAC_OLLAMA_URL") {
        if !endpoint.is_empty() {
            config.ollama.endpoint = endpoint;
        }
    }

    Ok(config)
}

fn read_config(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path)?;
    let config: Config = toml::from_str(&contents)?;
    tracing::debug!("loaded config from {}", path.display());
    Ok(config)
}
