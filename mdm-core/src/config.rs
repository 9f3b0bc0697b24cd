//! Configuration management for mdm

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub ai: AiConfig,
    pub sync: SyncConfig,
    pub browse: BrowseConfig,
    pub pdf: PdfConfig,
    /// Overrides the platform data directory for session files
    pub sessions_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub api_version: String,
    pub deployment: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout_secs: u64,
    pub max_context_tokens: usize,
    pub max_attempts: u32,
    pub retry_base_ms: u64,
    /// Some deployments reject `max_tokens` and `temperature`
    pub send_sampling_params: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub connection_string: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowseConfig {
    pub extensions: Vec<String>,
    pub max_file_size_mb: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfConfig {
    pub font_dir: PathBuf,
    pub font_family: String,
    pub mono_font_family: String,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            api_version: "2024-02-15-preview".to_string(),
            deployment: "gpt-5-mini".to_string(),
            max_tokens: 128_000,
            temperature: 0.25,
            timeout_secs: 180,
            max_context_tokens: 400_000,
            max_attempts: 3,
            retry_base_ms: 1000,
            send_sampling_params: false,
        }
    }
}

impl Default for BrowseConfig {
    fn default() -> Self {
        Self {
            extensions: vec![".md".to_string(), ".markdown".to_string(), ".txt".to_string()],
            max_file_size_mb: 100,
        }
    }
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            font_dir: PathBuf::from("fonts"),
            font_family: "LiberationSans".to_string(),
            mono_font_family: "LiberationMono".to_string(),
        }
    }
}

fn non_empty(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

impl AiConfig {
    pub fn is_configured(&self) -> bool {
        non_empty(&self.endpoint) && non_empty(&self.api_key)
    }
}

impl BrowseConfig {
    pub fn max_file_bytes(&self) -> u64 {
        self.max_file_size_mb * 1024 * 1024
    }
}

/// Refuse config files anyone can edit; they may hold credentials.
fn check_permissions(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let metadata = std::fs::metadata(path)
            .with_context(|| format!("Failed to stat config file: {}", path.display()))?;
        if metadata.permissions().mode() & 0o002 != 0 {
            anyhow::bail!(
                "Config file {} is world-writable (insecure permissions)",
                path.display()
            );
        }
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}

impl AppConfig {
    fn project_dirs() -> Option<directories::ProjectDirs> {
        directories::ProjectDirs::from("", "", "mdm")
    }

    /// Get the platform-specific config file path
    pub fn config_path() -> Option<PathBuf> {
        Self::project_dirs().map(|dirs| dirs.config_dir().join("mdm.toml"))
    }

    /// Load configuration from file, falling back to defaults if missing.
    /// Environment overrides are applied either way.
    pub fn load() -> Result<Self> {
        let mut config = match Self::config_path() {
            Some(path) if path.exists() => Self::load_from(&path)?,
            _ => {
                log::debug!("no config file, using defaults");
                Self::default()
            }
        };
        config.apply_env_with(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load from a specific path without environment overrides
    pub fn load_from(path: &Path) -> Result<Self> {
        check_permissions(path)?;

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: AppConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        log::debug!("loaded config from {}", path.display());
        Ok(config)
    }

    /// Apply `AZURE_*` overrides. Unparseable numeric values are ignored.
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let ai = &mut self.ai;
        if let Some(v) = lookup("AZURE_OPENAI_ENDPOINT") {
            ai.endpoint = Some(v);
        }
        if let Some(v) = lookup("AZURE_OPENAI_API_KEY") {
            ai.api_key = Some(v);
        }
        if let Some(v) = lookup("AZURE_OPENAI_API_VERSION") {
            ai.api_version = v;
        }
        if let Some(v) = lookup("AZURE_OPENAI_CHAT_DEPLOYMENT") {
            ai.deployment = v;
        }
        if let Some(v) = lookup("AZURE_OPENAI_MAX_TOKENS") {
            match v.parse() {
                Ok(n) => ai.max_tokens = n,
                Err(_) => log::warn!("ignoring AZURE_OPENAI_MAX_TOKENS={}", v),
            }
        }
        if let Some(v) = lookup("AZURE_OPENAI_TEMPERATURE") {
            match v.parse() {
                Ok(t) => ai.temperature = t,
                Err(_) => log::warn!("ignoring AZURE_OPENAI_TEMPERATURE={}", v),
            }
        }
        if let Some(v) = lookup("AZURE_OPENAI_REQUEST_TIMEOUT") {
            match v.parse() {
                Ok(t) => ai.timeout_secs = t,
                Err(_) => log::warn!("ignoring AZURE_OPENAI_REQUEST_TIMEOUT={}", v),
            }
        }
        if let Some(v) = lookup("AZURE_STORAGE_CONNECTION_STRING") {
            self.sync.connection_string = Some(v);
        }
    }

    pub fn is_ai_enabled(&self) -> bool {
        self.ai.is_configured()
    }

    pub fn is_sync_enabled(&self) -> bool {
        non_empty(&self.sync.connection_string)
    }

    /// Directory holding `session.json` and `recent_projects.json`
    pub fn sessions_dir(&self) -> PathBuf {
        if let Some(dir) = &self.sessions_dir {
            return dir.clone();
        }
        Self::project_dirs()
            .map(|dirs| dirs.data_dir().join("sessions"))
            .unwrap_or_else(|| PathBuf::from("sessions"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.ai.api_version, "2024-02-15-preview");
        assert_eq!(config.ai.deployment, "gpt-5-mini");
        assert_eq!(config.ai.max_tokens, 128_000);
        assert_eq!(config.ai.max_context_tokens, 400_000);
        assert_eq!(config.ai.max_attempts, 3);
        assert!(!config.ai.send_sampling_params);
        assert_eq!(config.browse.max_file_size_mb, 100);
        assert!(!config.is_ai_enabled());
        assert!(!config.is_sync_enabled());
    }

    #[test]
    fn test_load_valid_toml() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        file.write_all(
            b"sessions_dir = \"/tmp/mdm-sessions\"\n\
\n\
[ai]\n\
endpoint = \"https://example.openai.azure.com\"\n\
api_key = \"secret\"\n\
deployment = \"gpt-4o\"\n\
max_attempts = 5\n\
\n\
[sync]\n\
connection_string = \"UseDevelopmentStorage=true\"\n\
\n\
[pdf]\n\
font_dir = \"/usr/share/fonts/truetype/liberation\"\n",
        )?;

        let config = AppConfig::load_from(file.path())?;
        assert_eq!(config.ai.deployment, "gpt-4o");
        assert_eq!(config.ai.max_attempts, 5);
        assert_eq!(config.ai.api_version, "2024-02-15-preview");
        assert!(config.is_ai_enabled());
        assert!(config.is_sync_enabled());
        assert_eq!(config.sessions_dir(), PathBuf::from("/tmp/mdm-sessions"));
        assert_eq!(config.pdf.font_family, "LiberationSans");
        Ok(())
    }

    #[test]
    fn test_load_partial_toml() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        file.write_all(b"[browse]\nmax_file_size_mb = 5\n")?;

        let config = AppConfig::load_from(file.path())?;
        assert_eq!(config.browse.max_file_bytes(), 5 * 1024 * 1024);
        assert_eq!(config.browse.extensions.len(), 3);
        assert_eq!(config.ai.timeout_secs, 180);
        Ok(())
    }

    #[test]
    fn test_load_invalid_toml_returns_error() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"invalid toml [[[syntax").unwrap();

        let result = AppConfig::load_from(file.path());
        assert!(result.is_err());
    }

    #[cfg(unix)]
    #[test]
    fn world_writable_config_is_rejected() -> Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let file = NamedTempFile::new()?;
        std::fs::set_permissions(file.path(), std::fs::Permissions::from_mode(0o666))?;

        let err = AppConfig::load_from(file.path()).unwrap_err();
        assert!(err.to_string().contains("world-writable"));
        Ok(())
    }

    #[test]
    fn env_overrides_apply() {
        let env: HashMap<&str, &str> = [
            ("AZURE_OPENAI_ENDPOINT", "https://e.example"),
            ("AZURE_OPENAI_API_KEY", "k"),
            ("AZURE_OPENAI_MAX_TOKENS", "4096"),
            ("AZURE_OPENAI_TEMPERATURE", "warm"),
            ("AZURE_STORAGE_CONNECTION_STRING", "AccountName=a;AccountKey=b"),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        config.apply_env_with(|k| env.get(k).map(|v| v.to_string()));

        assert!(config.is_ai_enabled());
        assert_eq!(config.ai.max_tokens, 4096);
        // bad value keeps the default
        assert_eq!(config.ai.temperature, 0.25);
        assert!(config.is_sync_enabled());
    }

    #[test]
    fn blank_credentials_do_not_enable() {
        let mut config = AppConfig::default();
        config.ai.endpoint = Some("https://e.example".into());
        config.ai.api_key = Some("   ".into());
        config.sync.connection_string = Some(String::new());
        assert!(!config.is_ai_enabled());
        assert!(!config.is_sync_enabled());
    }

    #[test]
    fn test_config_path_returns_some() {
        let path = AppConfig::config_path();
        assert!(path.is_some());
        if let Some(p) = path {
            assert!(p.to_string_lossy().contains("mdm"));
            assert!(p.to_string_lossy().ends_with("mdm.toml"));
        }
    }

    #[test]
    fn config_serializes_to_toml() -> Result<()> {
        let mut config = AppConfig::default();
        config.ai.deployment = "custom".into();

        let toml_str = toml::to_string(&config)?;
        let parsed: AppConfig = toml::from_str(&toml_str)?;
        assert_eq!(parsed.ai.deployment, "custom");
        Ok(())
    }
}
