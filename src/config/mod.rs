// Configuration
//
// Defaults cover a whole run out of the box; a qmirac.toml in the
// working directory overrides them, and CLI flags override both.

mod loader;
mod settings;

pub use loader::load_config;
pub use settings::{Config, OllamaConfig, PathsConfig, RunConfig};
