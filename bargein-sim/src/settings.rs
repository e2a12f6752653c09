//! Engine settings loaded from a JSON file.
//!
//! Every field is optional; missing fields fall back to the engine defaults.
//!
//! ```json
//! { "fillerWords": ["yeah", "mm-hmm"], "commandWords": ["stop"], "partialTimeoutMs": 250 }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use bargein_core::{normalize, EngineConfig};

const MAX_WORDS: usize = 256;

pub fn normalize_settings(config: &mut EngineConfig) {
    config.filler_words = normalize_word_list(&config.filler_words);
    config.command_words = normalize_word_list(&config.command_words);
}

fn normalize_word_list(raw: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for word in raw {
        let normalized = normalize(word);
        if normalized.is_empty() || out.contains(&normalized) {
            continue;
        }
        out.push(normalized);
        if out.len() >= MAX_WORDS {
            break;
        }
    }
    out
}

pub fn default_settings_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("bargein")
            .join("settings.json")
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                std::env::var_os("HOME")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("/tmp"))
                    .join(".config")
            })
            .join("bargein")
            .join("settings.json")
    }
}

/// Load settings from `path`. A missing file yields the defaults; a file that
/// exists but does not parse is an error. Values are not range-checked here,
/// `EngineConfig::validate` rejects them when the engine is built.
pub fn load_settings(path: &Path) -> anyhow::Result<EngineConfig> {
    let mut config = match fs::read_to_string(path) {
        Ok(raw) => serde_json::from_str::<EngineConfig>(&raw)
            .with_context(|| format!("invalid settings file {}", path.display()))?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => EngineConfig::default(),
        Err(e) => {
            return Err(e).with_context(|| format!("failed to read {}", path.display()));
        }
    };
    normalize_settings(&mut config);
    Ok(config)
}

pub fn save_settings(path: &Path, config: &EngineConfig) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(config).map_err(std::io::Error::other)?;
    fs::write(path, json)
}
