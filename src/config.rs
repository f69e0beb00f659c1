use crate::types::*;
use std::{
  env,
  fs,
  path::{Path, PathBuf},
};

pub fn repo_root() -> PathBuf {
  PathBuf::from(env!("CARGO_MANIFEST_DIR"))
}

pub fn resolve_repo_path(raw: &str) -> PathBuf {
  let path = PathBuf::from(raw);
  if path.is_absolute() {
    path
  } else {
    repo_root().join(path)
  }
}

pub fn config_path() -> PathBuf {
  if let Some(raw) = env_default("BRACKET_CONFIG_PATH") {
    return resolve_repo_path(&raw);
  }
  repo_root().join("config.json")
}

pub fn logs_dir() -> PathBuf {
  repo_root().join("logs")
}

pub fn env_default(key: &str) -> Option<String> {
  env::var(key)
    .ok()
    .map(|value| value.trim().to_string())
    .filter(|value| !value.is_empty())
}

/// Fill empty config fields from `lookup`; values already in the config win.
pub fn apply_defaults_from<F>(mut config: AppConfig, lookup: F) -> AppConfig
where
  F: Fn(&str) -> Option<String>,
{
  if config.data_dir.trim().is_empty() {
    if let Some(value) = lookup("BRACKET_DATA_DIR") {
      config.data_dir = value;
    }
  }
  if config.listen_addr.trim().is_empty() {
    if let Some(value) = lookup("BRACKET_LISTEN_ADDR") {
      config.listen_addr = value;
    }
  }
  if config.static_dir.trim().is_empty() {
    if let Some(value) = lookup("BRACKET_STATIC_DIR") {
      config.static_dir = value;
    }
  }
  if config.event_name.trim().is_empty() {
    if let Some(value) = lookup("BRACKET_EVENT_NAME") {
      config.event_name = value;
    }
  }
  config
}

pub fn apply_env_defaults(config: AppConfig) -> AppConfig {
  apply_defaults_from(config, env_default)
}

pub fn load_config_from(path: &Path) -> Result<AppConfig, String> {
  if !path.is_file() {
    return Ok(apply_env_defaults(AppConfig::default()));
  }
  let data = fs::read_to_string(path).map_err(|e| format!("read config {}: {e}", path.display()))?;
  let config =
    serde_json::from_str::<AppConfig>(&data).map_err(|e| format!("parse config {}: {e}", path.display()))?;
  Ok(apply_env_defaults(config))
}

pub fn save_config_to(path: &Path, config: AppConfig) -> Result<AppConfig, String> {
  let payload = serde_json::to_string_pretty(&config).map_err(|e| e.to_string())?;
  fs::write(path, payload).map_err(|e| format!("write config {}: {e}", path.display()))?;
  Ok(config)
}

pub fn resolved_data_dir(config: &AppConfig) -> PathBuf {
  let raw = config.data_dir.trim();
  resolve_repo_path(if raw.is_empty() { DEFAULT_DATA_DIR } else { raw })
}

pub fn resolved_static_dir(config: &AppConfig) -> PathBuf {
  let raw = config.static_dir.trim();
  resolve_repo_path(if raw.is_empty() { DEFAULT_STATIC_DIR } else { raw })
}

pub fn resolved_listen_addr(config: &AppConfig) -> String {
  let raw = config.listen_addr.trim();
  if raw.is_empty() {
    DEFAULT_LISTEN_ADDR.to_string()
  } else {
    raw.to_string()
  }
}

pub fn load_env_file() {
  let env_path = repo_root().join(".env");
  if !env_path.is_file() {
    return;
  }
  let contents = match fs::read_to_string(&env_path) {
    Ok(data) => data,
    Err(_) => return,
  };
  for line in contents.lines() {
    if let Some((key, value)) = parse_env_line(line) {
      if env::var_os(&key).is_none() {
        env::set_var(key, value);
      }
    }
  }
}

pub fn parse_env_line(line: &str) -> Option<(String, String)> {
  let trimmed = line.trim();
  if trimmed.is_empty() || trimmed.starts_with('#') {
    return None;
  }
  let trimmed = trimmed.strip_prefix("export ").unwrap_or(trimmed);
  let (key, raw_value) = trimmed.split_once('=')?;
  let key = key.trim();
  if key.is_empty() {
    return None;
  }
  let mut value = raw_value.trim();
  if value.starts_with('"') && value.ends_with('"') && value.len() >= 2 {
    value = &value[1..value.len() - 1];
  } else if value.starts_with('\'') && value.ends_with('\'') && value.len() >= 2 {
    value = &value[1..value.len() - 1];
  } else if let Some(idx) = value.find('#') {
    value = value[..idx].trim_end();
  }
  Some((key.to_string(), value.to_string()))
}

pub fn log_env_warnings(config: &AppConfig) {
  let static_dir = resolved_static_dir(config);
  if !static_dir.is_dir() {
    tracing::warn!(
      "board directory {} not found; only /state.json and /api routes will respond",
      static_dir.display()
    );
  }
  if config.round_names.len() < ROUND_COUNT {
    tracing::warn!("config lists {} round names; missing rounds use generic labels", config.round_names.len());
  }
}
