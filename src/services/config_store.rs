// Configuration Storage Service
// Handles config file read/write, environment overrides and secret lookup

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::PathBuf;

use super::providers::{DEFAULT_TIMEOUT_SECS, GEMINI_DEFAULT_MODEL, GEMINI_DEFAULT_URL};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub gemini: GeminiConfig,
    #[serde(default)]
    pub supabase: SupabaseConfig,
    #[serde(default)]
    pub humanize: HumanizeConfig,
    #[serde(default)]
    pub api_keys: HashMap<String, String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            server: ServerConfig::default(),
            gemini: GeminiConfig::default(),
            supabase: SupabaseConfig::default(),
            humanize: HumanizeConfig::default(),
            api_keys: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    #[serde(default = "default_max_upload")]
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            max_upload_bytes: default_max_upload(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiConfig {
    #[serde(default = "default_model")]
    pub model: String,
    pub base_url: Option<String>,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            base_url: None,
            timeout_secs: default_timeout(),
        }
    }
}

impl GeminiConfig {
    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(GEMINI_DEFAULT_URL)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SupabaseConfig {
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct HumanizeConfig {
    /// Reject a second humanization of the same report while one is running.
    #[serde(default)]
    pub single_flight: bool,
}

fn default_version() -> String { env!("CARGO_PKG_VERSION").to_string() }
fn default_bind_addr() -> String { "127.0.0.1:8787".to_string() }
fn default_max_upload() -> usize { 10 * 1024 * 1024 }
fn default_model() -> String { GEMINI_DEFAULT_MODEL.to_string() }
fn default_timeout() -> u64 { DEFAULT_TIMEOUT_SECS }

impl AppConfig {
    /// Apply environment overrides on top of the file values.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(v) = get("HUMYZE_BIND") {
            self.server.bind_addr = v;
        }
        if let Some(v) = get("GEMINI_API_URL") {
            self.gemini.base_url = Some(v);
        }
        if let Some(v) = get("GEMINI_MODEL") {
            self.gemini.model = v;
        }
        if let Some(v) = get("SUPABASE_URL") {
            self.supabase.url = Some(v);
        }
    }

    /// Secret lookup: environment first, then the config file's `apiKeys`.
    pub fn secret(&self, name: &str) -> Option<String> {
        secret_from(name, |key| env::var(key).ok(), &self.api_keys)
    }
}

fn secret_from(
    name: &str,
    lookup: impl Fn(&str) -> Option<String>,
    api_keys: &HashMap<String, String>,
) -> Option<String> {
    let env_keys: &[&str] = match name {
        "gemini" => &["GEMINI_API_KEY", "HUMYZE_GEMINI_API_KEY"],
        "supabase_anon" => &["SUPABASE_ANON_KEY"],
        "supabase_service_role" => &["SUPABASE_SERVICE_ROLE_KEY"],
        "dev_token" => &["HUMYZE_DEV_TOKEN"],
        _ => &[],
    };

    for key in env_keys {
        if let Some(val) = lookup(key) {
            let v = val.trim();
            if !v.is_empty() {
                return Some(v.to_string());
            }
        }
    }

    api_keys
        .get(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub struct ConfigStore {
    config_dir: PathBuf,
    config_file: PathBuf,
}

impl ConfigStore {
    pub fn new(config_dir: PathBuf) -> Self {
        let config_file = config_dir.join("config.json");
        Self { config_dir, config_file }
    }

    /// `HUMYZE_CONFIG_DIR`, else the platform config directory.
    pub fn default_config_dir() -> Option<PathBuf> {
        match env::var("HUMYZE_CONFIG_DIR") {
            Ok(p) if !p.trim().is_empty() => Some(PathBuf::from(p)),
            _ => dirs::config_dir().map(|p| p.join("humyze")),
        }
    }

    pub fn config_file(&self) -> &PathBuf {
        &self.config_file
    }

    /// Ensure config directory exists
    pub fn ensure_dir(&self) -> Result<(), String> {
        fs::create_dir_all(&self.config_dir)
            .map_err(|e| format!("Failed to create config dir: {}", e))
    }

    /// Load configuration from file
    pub fn load(&self) -> Result<AppConfig, String> {
        if !self.config_file.exists() {
            return Ok(AppConfig::default());
        }

        let content = fs::read_to_string(&self.config_file)
            .map_err(|e| format!("Failed to read config: {}", e))?;

        serde_json::from_str(&content)
            .map_err(|e| format!("Failed to parse config: {}", e))
    }

    /// Save configuration to file
    pub fn save(&self, config: &AppConfig) -> Result<(), String> {
        self.ensure_dir()?;

        let content = serde_json::to_string_pretty(config)
            .map_err(|e| format!("Failed to serialize config: {}", e))?;

        fs::write(&self.config_file, content)
            .map_err(|e| format!("Failed to write config: {}", e))
    }

    /// Load the file (writing defaults on first start) and apply env overrides.
    pub fn load_or_init(&self) -> Result<AppConfig, String> {
        let first_start = !self.config_file.exists();
        let mut config = self.load()?;
        if first_start {
            self.save(&config)?;
        }
        config.apply_env();
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(tag: &str) -> PathBuf {
        env::temp_dir().join(format!("humyze-config-{}-{}", tag, uuid::Uuid::new_v4()))
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.gemini.model, "gemini-2.0-flash");
        assert_eq!(config.gemini.timeout_secs, 80);
        assert!(!config.humanize.single_flight);
        assert!(config.supabase.url.is_none());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let parsed: AppConfig =
            serde_json::from_str(r#"{"humanize": {"singleFlight": true}, "server": {"bindAddr": "0.0.0.0:9000"}}"#)
                .unwrap();
        assert!(parsed.humanize.single_flight);
        assert_eq!(parsed.server.bind_addr, "0.0.0.0:9000");
        assert_eq!(parsed.server.max_upload_bytes, 10 * 1024 * 1024);
        assert_eq!(parsed.gemini.base_url(), GEMINI_DEFAULT_URL);
    }

    #[test]
    fn test_overrides_ignore_blank_values() {
        let mut config = AppConfig::default();
        config.apply_overrides(|key| match key {
            "SUPABASE_URL" => Some("https://x.supabase.co".to_string()),
            "GEMINI_MODEL" => Some("   ".to_string()),
            _ => None,
        });
        assert_eq!(config.supabase.url.as_deref(), Some("https://x.supabase.co"));
        assert_eq!(config.gemini.model, "gemini-2.0-flash");
    }

    #[test]
    fn test_secret_prefers_env_over_file() {
        let mut keys = HashMap::new();
        keys.insert("gemini".to_string(), "file-key".to_string());

        let from_env = secret_from("gemini", |k| (k == "GEMINI_API_KEY").then(|| "env-key".to_string()), &keys);
        assert_eq!(from_env.as_deref(), Some("env-key"));

        let from_file = secret_from("gemini", |_| None, &keys);
        assert_eq!(from_file.as_deref(), Some("file-key"));

        assert_eq!(secret_from("unknown", |_| None, &keys), None);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = temp_dir("roundtrip");
        let store = ConfigStore::new(dir.clone());
        let mut config = AppConfig::default();
        config.humanize.single_flight = true;
        store.save(&config).unwrap();

        let loaded = store.load().unwrap();
        assert!(loaded.humanize.single_flight);
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_load_or_init_writes_defaults() {
        let dir = temp_dir("init");
        let store = ConfigStore::new(dir.clone());
        assert!(!store.config_file().exists());
        store.load_or_init().unwrap();
        assert!(store.config_file().exists());
        let _ = fs::remove_dir_all(dir);
    }
}
