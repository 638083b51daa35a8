//! Local file-based overrides, loaded before the remote pass so an
//! operator can pin values for a single checkout without touching the
//! environment. Mirrors the project-local `config.toml` lookup pattern,
//! just with one fixed filename instead of a search path.

use std::collections::HashMap;
use std::path::Path;

use crate::error::{EngineError, Result};

pub const LOCAL_CONFIG_FILENAME: &str = "migration-engine.toml";

/// Read `path` as TOML and flatten its top-level string/integer/bool
/// values into the same `HashMap<String, String>` shape `apply_overrides`
/// expects. Missing file is not an error; callers treat it the same as an
/// empty override set.
pub fn load_local_overrides(path: &Path) -> Result<HashMap<String, String>> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(HashMap::new()),
        Err(err) => return Err(EngineError::config(format!("failed to read {}: {err}", path.display()))),
    };

    let table: toml::Table =
        toml::from_str(&raw).map_err(|err| EngineError::config(format!("invalid TOML in {}: {err}", path.display())))?;

    let mut overrides = HashMap::new();
    for (key, value) in table {
        let rendered = match value {
            toml::Value::String(s) => s,
            toml::Value::Integer(i) => i.to_string(),
            toml::Value::Boolean(b) => b.to_string(),
            toml::Value::Float(f) => f.to_string(),
            _ => continue,
        };
        overrides.insert(key, rendered);
    }
    Ok(overrides)
}
