// App configuration
// Path discovery plus a typed config loaded from config.yml with a
// secrets.yaml overlay

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::llm::groq;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid config at '{path}': {message}")]
    Invalid { path: String, message: String },
}

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub project_root: PathBuf,
    pub data_dir: PathBuf,
    pub log_dir: PathBuf,
}

impl AppPaths {
    pub fn new() -> Self {
        let project_root = discover_project_root();
        let data_dir = discover_data_dir(&project_root);
        let log_dir = data_dir.join("logs");

        for dir in [&data_dir, &log_dir] {
            let _ = fs::create_dir_all(dir);
        }

        AppPaths {
            project_root,
            data_dir,
            log_dir,
        }
    }

    pub fn config_path(&self) -> PathBuf {
        if let Ok(path) = env::var("VIGIL_CONFIG_PATH") {
            return PathBuf::from(path);
        }

        let user_config = self.data_dir.join("config.yml");
        if user_config.exists() {
            return user_config;
        }

        self.project_root.join("config.yml")
    }

    pub fn secrets_path(&self) -> PathBuf {
        self.data_dir.join("secrets.yaml")
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

fn discover_project_root() -> PathBuf {
    if let Ok(root) = env::var("VIGIL_ROOT") {
        return PathBuf::from(root);
    }

    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    if manifest_dir.join("config.yml").exists() {
        return manifest_dir;
    }

    env::current_dir().unwrap_or(manifest_dir)
}

fn discover_data_dir(project_root: &Path) -> PathBuf {
    if let Ok(dir) = env::var("VIGIL_DATA_DIR") {
        return PathBuf::from(dir);
    }

    if cfg!(debug_assertions) {
        return project_root.to_path_buf();
    }

    if cfg!(target_os = "windows") {
        let base = env::var("LOCALAPPDATA")
            .unwrap_or_else(|_| env::var("USERPROFILE").unwrap_or_else(|_| ".".to_string()));
        return PathBuf::from(base).join("Vigil");
    }

    if cfg!(target_os = "macos") {
        return home_dir()
            .join("Library")
            .join("Application Support")
            .join("Vigil");
    }

    let xdg = env::var("XDG_DATA_HOME")
        .unwrap_or_else(|_| home_dir().join(".local/share").to_string_lossy().to_string());
    PathBuf::from(xdg).join("vigil")
}

fn home_dir() -> PathBuf {
    env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerSettings,
    pub llm: LlmSettings,
    pub app: RuntimeSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            cors_allowed_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub reasoning_model: String,
    pub timeout_secs: u64,
    pub max_attempts: u32,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: groq::DEFAULT_BASE_URL.to_string(),
            model: "llama-3.1-8b-instant".to_string(),
            reasoning_model: "deepseek-r1-distill-llama-70b".to_string(),
            timeout_secs: 60,
            max_attempts: 3,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RuntimeSettings {
    pub graph_recursion_limit: usize,
    pub max_input_length: usize,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            graph_recursion_limit: 10,
            max_input_length: 8192,
        }
    }
}

impl AppConfig {
    /// Load the config for the discovered paths, with the `GROQ_API_KEY`
    /// environment variable overriding any configured key.
    pub fn load(paths: &AppPaths) -> Result<AppConfig, ConfigError> {
        let mut config = Self::from_files(&paths.config_path(), &paths.secrets_path())?;
        if let Ok(key) = env::var("GROQ_API_KEY") {
            if !key.trim().is_empty() {
                config.llm.api_key = Some(key);
            }
        }
        Ok(config)
    }

    /// Parse `config_path` with `secrets_path` deep-merged over it. Missing
    /// or unreadable files count as empty, so a bare checkout still boots
    /// with defaults.
    pub fn from_files(config_path: &Path, secrets_path: &Path) -> Result<AppConfig, ConfigError> {
        let public = load_yaml_file(config_path);
        let secrets = load_yaml_file(secrets_path);
        let merged = deep_merge(&public, &secrets);

        let config: AppConfig =
            serde_json::from_value(merged).map_err(|err| ConfigError::Invalid {
                path: "root".to_string(),
                message: err.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        range_check(
            "app.graph_recursion_limit",
            self.app.graph_recursion_limit as u64,
            1,
            10_000,
        )?;
        range_check(
            "app.max_input_length",
            self.app.max_input_length as u64,
            1,
            10_000_000,
        )?;
        range_check("llm.timeout_secs", self.llm.timeout_secs, 1, 86_400)?;
        range_check("llm.max_attempts", u64::from(self.llm.max_attempts), 1, 10)?;
        Ok(())
    }
}

fn range_check(path: &str, value: u64, min: u64, max: u64) -> Result<(), ConfigError> {
    if value < min || value > max {
        return Err(ConfigError::Invalid {
            path: path.to_string(),
            message: format!("must be between {} and {}", min, max),
        });
    }
    Ok(())
}

fn load_yaml_file(path: &Path) -> Value {
    if !path.exists() {
        return Value::Object(Map::new());
    }

    match fs::read_to_string(path) {
        Ok(contents) => match serde_yaml::from_str::<Value>(&contents) {
            Ok(value @ Value::Object(_)) => value,
            _ => Value::Object(Map::new()),
        },
        Err(_) => Value::Object(Map::new()),
    }
}

fn deep_merge(base: &Value, override_value: &Value) -> Value {
    match (base, override_value) {
        (Value::Object(base_map), Value::Object(override_map)) => {
            let mut merged: Map<String, Value> = base_map.clone();
            for (key, value) in override_map {
                let merged_value = match merged.get(key) {
                    Some(existing) => deep_merge(existing, value),
                    None => value.clone(),
                };
                merged.insert(key.clone(), merged_value);
            }
            Value::Object(merged)
        }
        _ => override_value.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deep_merge_merges_objects_and_overrides_scalars() {
        let base = json!({
            "a": 1,
            "b": { "c": 2, "d": 3 },
            "arr": [1, 2]
        });
        let override_value = json!({
            "b": { "c": 99 },
            "arr": [3],
            "e": "x"
        });

        let merged = deep_merge(&base, &override_value);

        assert_eq!(
            merged,
            json!({
                "a": 1,
                "b": { "c": 99, "d": 3 },
                "arr": [3],
                "e": "x"
            })
        );
    }

    #[test]
    fn missing_files_yield_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::from_files(
            &dir.path().join("config.yml"),
            &dir.path().join("secrets.yaml"),
        )
        .unwrap();

        assert_eq!(config.server.port, 8000);
        assert_eq!(config.app.graph_recursion_limit, 10);
        assert_eq!(config.llm.max_attempts, 3);
        assert!(config.llm.api_key.is_none());
    }

    #[test]
    fn secrets_overlay_wins_over_public_config() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.yml");
        let secrets_path = dir.path().join("secrets.yaml");

        std::fs::write(
            &config_path,
            "server:\n  port: 9001\nllm:\n  model: base-model\n",
        )
        .unwrap();
        std::fs::write(&secrets_path, "llm:\n  api_key: sk-test\n").unwrap();

        let config = AppConfig::from_files(&config_path, &secrets_path).unwrap();

        assert_eq!(config.server.port, 9001);
        assert_eq!(config.llm.model, "base-model");
        assert_eq!(config.llm.api_key.as_deref(), Some("sk-test"));
    }

    #[test]
    fn rejects_out_of_range_recursion_limit() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.yml");
        std::fs::write(&config_path, "app:\n  graph_recursion_limit: 0\n").unwrap();

        let err =
            AppConfig::from_files(&config_path, &dir.path().join("secrets.yaml")).unwrap_err();

        assert!(matches!(
            err,
            ConfigError::Invalid { path, .. } if path == "app.graph_recursion_limit"
        ));
    }

    #[test]
    fn malformed_yaml_counts_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.yml");
        std::fs::write(&config_path, ":::: not yaml").unwrap();

        let config =
            AppConfig::from_files(&config_path, &dir.path().join("secrets.yaml")).unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
    }
}
