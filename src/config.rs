use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Environment variable holding the OAuth bearer token used for every
/// Google API call. Token acquisition itself happens outside this tool.
pub const TOKEN_ENV: &str = "GWEXPORT_OAUTH_TOKEN";

#[derive(Debug, Serialize, Deserialize)]
pub struct Config {
    /// Spreadsheet receiving the policy export (its first sheet is overwritten)
    #[serde(default)]
    pub spreadsheet_id: String,

    /// Cloud Identity policy filter expression
    #[serde(default = "default_policy_filter")]
    pub policy_filter: String,

    /// Vault matter scoping the conversation export
    #[serde(default)]
    pub matter_id: String,

    /// Account whose conversations are exported
    #[serde(default)]
    pub target_user: String,

    /// Drive folder receiving the raw XML transcript
    #[serde(default)]
    pub xml_folder_id: String,

    /// Drive folder receiving the per-user transcript spreadsheet
    #[serde(default)]
    pub sheets_folder_id: String,

    /// Seconds to sleep between export status checks
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Maximum number of status checks before giving up
    #[serde(default = "default_poll_max_checks")]
    pub poll_max_checks: u32,
}

fn default_policy_filter() -> String {
    "setting.type.matches('gemini_app|notebooklm|ai_studio')".to_string()
}

fn default_poll_interval_secs() -> u64 {
    120
}

fn default_poll_max_checks() -> u32 {
    30
}

fn config_path() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME not set")?;
    Ok(PathBuf::from(home).join(".gwexport").join("config.toml"))
}

impl Config {
    /// Load config from ~/.gwexport/config.toml, returning defaults if file doesn't exist
    pub fn load() -> Result<Self> {
        let path = config_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(config)
    }

    /// Save config to ~/.gwexport/config.toml
    pub fn save(&self) -> Result<PathBuf> {
        let path = config_path()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self).context("failed to serialize config")?;
        fs::write(&path, content).with_context(|| format!("failed to write {}", path.display()))?;
        Ok(path)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            spreadsheet_id: String::new(),
            policy_filter: default_policy_filter(),
            matter_id: String::new(),
            target_user: String::new(),
            xml_folder_id: String::new(),
            sheets_folder_id: String::new(),
            poll_interval_secs: default_poll_interval_secs(),
            poll_max_checks: default_poll_max_checks(),
        }
    }
}

/// Read the injected OAuth bearer token from the environment.
pub fn oauth_token() -> Result<String> {
    let token = std::env::var(TOKEN_ENV)
        .with_context(|| format!("{TOKEN_ENV} not set; export a Workspace OAuth token first"))?;
    if token.trim().is_empty() {
        anyhow::bail!("{TOKEN_ENV} is empty");
    }
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = Config::default();
        assert_eq!(config.poll_interval_secs, 120);
        assert_eq!(config.poll_max_checks, 30);
        assert!(config.policy_filter.contains("gemini_app"));
        assert!(config.matter_id.is_empty());
    }

    #[test]
    fn config_partial_parse() {
        let content = "matter_id = \"m-123\"\ntarget_user = \"alice@example.com\"\n";
        let config: Config = toml::from_str(content).unwrap();
        assert_eq!(config.matter_id, "m-123");
        assert_eq!(config.target_user, "alice@example.com");
        assert_eq!(config.poll_max_checks, 30);
        assert_eq!(config.policy_filter, default_policy_filter());
    }

    #[test]
    fn config_roundtrip() {
        let config = Config {
            spreadsheet_id: "sheet-1".to_string(),
            matter_id: "m-9".to_string(),
            target_user: "bob@example.com".to_string(),
            poll_interval_secs: 5,
            poll_max_checks: 2,
            ..Config::default()
        };
        let content = toml::to_string_pretty(&config).unwrap();
        let loaded: Config = toml::from_str(&content).unwrap();
        assert_eq!(loaded.spreadsheet_id, "sheet-1");
        assert_eq!(loaded.matter_id, "m-9");
        assert_eq!(loaded.poll_interval_secs, 5);
        assert_eq!(loaded.poll_max_checks, 2);
    }
}
