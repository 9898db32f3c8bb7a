use std::fs;
use std::path::Path;
use tracing::debug;

use mortgage_calc_core::config::EngineConfig;

use crate::input::file::resolve_path;

/// Load an engine config; `.yaml`/`.yml` files are read as YAML, anything
/// else as JSON. Sections the file omits keep their built-in values.
pub fn load_config(path: &str) -> Result<EngineConfig, Box<dyn std::error::Error>> {
    let canonical = resolve_path(path)?;
    let contents = fs::read_to_string(&canonical)
        .map_err(|e| format!("Failed to read '{}': {}", canonical.display(), e))?;

    let config = if is_yaml(&canonical) {
        let config: EngineConfig = serde_yaml::from_str(&contents)
            .map_err(|e| format!("Failed to parse '{}': {}", canonical.display(), e))?;
        config.validate()?;
        config
    } else {
        EngineConfig::from_json_str(&contents)
            .map_err(|e| format!("Invalid config '{}': {}", canonical.display(), e))?
    };

    debug!(path = %canonical.display(), "loaded engine config");
    Ok(config)
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    )
}
