//! Auto-detection of `matcalc.toml`.
//!
//! ```toml
//! [engine]
//! precision = 5
//! max_passes = 32
//! ```

use anyhow::{Context, Result};
use matcalc::EngineConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "matcalc.toml";

pub struct LoadedConfig {
    pub engine: EngineConfig,
    pub source: ConfigSource,
}

pub enum ConfigSource {
    /// Given with `--config` or found by walking up from the working directory
    File(PathBuf),
    /// Default values (no config found)
    Default,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    engine: EngineConfig,
}

/// Searches `start` and its ancestors for `matcalc.toml`.
fn find_config_file(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        let candidate = current.join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            return Some(candidate);
        }
        if !current.pop() {
            return None;
        }
    }
}

fn parse_config(content: &str) -> Result<EngineConfig> {
    let file: ConfigFile = toml::from_str(content)?;
    Ok(file.engine)
}

fn read_config(path: &Path) -> Result<EngineConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    parse_config(&content).with_context(|| format!("Invalid config in {}", path.display()))
}

/// Loads the engine configuration.
///
/// Search order:
/// 1. `explicit` (from `--config`), which must exist
/// 2. Current working directory upward for `matcalc.toml`
/// 3. Fall back to defaults
pub fn load(explicit: Option<&Path>) -> Result<LoadedConfig> {
    if let Some(path) = explicit {
        return Ok(LoadedConfig {
            engine: read_config(path)?,
            source: ConfigSource::File(path.to_path_buf()),
        });
    }

    if let Ok(cwd) = std::env::current_dir()
        && let Some(path) = find_config_file(&cwd)
    {
        return Ok(LoadedConfig {
            engine: read_config(&path)?,
            source: ConfigSource::File(path),
        });
    }

    Ok(LoadedConfig {
        engine: EngineConfig::default(),
        source: ConfigSource::Default,
    })
}
