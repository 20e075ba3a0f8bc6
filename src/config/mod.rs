//! Configuration and credential storage

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use directories::{ProjectDirs, UserDirs};
use serde::{Deserialize, Serialize};

use crate::models::{Operator, Role};

/// Application configuration
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Portal API base URL, e.g. `https://portal.example.com`
    pub server_url: Option<String>,
    /// Bearer token for the portal API
    pub api_token: Option<String>,
    /// Identity of the signed-in operator
    pub operator: Option<Operator>,
    #[serde(default)]
    pub timing: Timing,
}

/// Polling cadences.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Timing {
    /// Message sync interval while a conversation is open
    pub poll_interval_ms: u64,
    /// Read-receipt confirmation interval
    pub read_interval_ms: u64,
    /// Quiet period before a search term is applied
    pub search_debounce_ms: u64,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            poll_interval_ms: 2_000,
            read_interval_ms: 10_000,
            search_debounce_ms: 200,
        }
    }
}

impl Timing {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn read_interval(&self) -> Duration {
        Duration::from_millis(self.read_interval_ms.max(1))
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }
}

impl Config {
    /// Get config directory path
    fn config_dir() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "staff-chat", "staff-chat")
            .context("Could not determine config directory")?;
        Ok(proj_dirs.config_dir().to_path_buf())
    }

    /// Get config file path
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration from disk
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).context("Failed to read config file")?;
        toml::from_str(&content).context("Failed to parse config file")
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content).context("Failed to write config file")?;

        // Holds the API token
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = fs::Permissions::from_mode(0o600);
            fs::set_permissions(path, perms).context("Failed to set config permissions")?;
        }

        Ok(())
    }

    /// Where downloaded attachments go: the user's download folder, else the
    /// working directory.
    pub fn download_dir() -> PathBuf {
        UserDirs::new()
            .and_then(|d| d.download_dir().map(Path::to_path_buf))
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Scratch space for images opened in an external viewer.
    pub fn preview_dir() -> PathBuf {
        ProjectDirs::from("com", "staff-chat", "staff-chat")
            .map(|d| d.cache_dir().join("previews"))
            .unwrap_or_else(|| std::env::temp_dir().join("staff-chat-previews"))
    }

    pub fn server_url(&self) -> Result<&str> {
        self.server_url
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .context("No server configured. Run 'staff-chat configure --server <url>'.")
    }

    pub fn operator(&self) -> Result<&Operator> {
        self.operator
            .as_ref()
            .context("No operator identity configured. Run 'staff-chat configure --id <id> --name <name>'.")
    }

    /// Apply `configure` arguments; `None` leaves a field untouched.
    pub fn update(
        &mut self,
        server: Option<String>,
        token: Option<String>,
        id: Option<String>,
        name: Option<String>,
        role: Option<Role>,
    ) {
        if let Some(server) = server {
            self.server_url = Some(server.trim_end_matches('/').to_string());
        }
        if let Some(token) = token {
            self.api_token = Some(token);
        }
        if id.is_some() || name.is_some() || role.is_some() {
            let current = self.operator.take();
            let current_id = current.as_ref().map(|o| o.id.clone());
            let current_name = current.as_ref().map(|o| o.name.clone());
            let current_role = current.as_ref().map(|o| o.role);
            match id.or(current_id) {
                Some(id) => {
                    self.operator = Some(Operator {
                        name: name.or(current_name).unwrap_or_else(|| id.clone()),
                        id,
                        role: role.or(current_role).unwrap_or(Role::Admin),
                    });
                }
                None => {
                    tracing::warn!("Operator name/role given without an id; ignoring");
                    self.operator = current;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::load_from(&dir.path().join("nope.toml")).unwrap();
        assert!(cfg.server_url.is_none());
        assert_eq!(cfg.timing.poll_interval_ms, 2_000);
        assert_eq!(cfg.timing.read_interval_ms, 10_000);
        assert_eq!(cfg.timing.search_debounce_ms, 200);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub").join("config.toml");

        let mut cfg = Config::default();
        cfg.update(
            Some("https://portal.test/".to_string()),
            Some("tok".to_string()),
            Some("7".to_string()),
            Some("Maria".to_string()),
            None,
        );
        cfg.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.server_url.as_deref(), Some("https://portal.test"));
        let op = loaded.operator().unwrap();
        assert_eq!(op.id, "7");
        assert_eq!(op.name, "Maria");
        assert_eq!(op.role, Role::Admin);
    }

    #[test]
    fn test_partial_timing_table() {
        let cfg: Config = toml::from_str("[timing]\npoll_interval_ms = 500\n").unwrap();
        assert_eq!(cfg.timing.poll_interval(), Duration::from_millis(500));
        assert_eq!(cfg.timing.read_interval(), Duration::from_secs(10));
    }

    #[test]
    fn test_update_keeps_existing_operator_fields() {
        let mut cfg = Config::default();
        cfg.update(None, None, Some("1".into()), Some("Ana".into()), Some(Role::Employee));
        cfg.update(None, None, None, Some("Ana B".into()), None);
        let op = cfg.operator().unwrap();
        assert_eq!(op.id, "1");
        assert_eq!(op.name, "Ana B");
        assert_eq!(op.role, Role::Employee);
    }
}
