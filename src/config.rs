use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, ThemisError};
use crate::model::EntryOrder;

/// 覆盖日记根目录的环境变量。
pub const VAULT_PATH_ENV: &str = "THEMIS_VAULT_PATH";

const DEFAULT_VAULT_SUBDIR: &[&str] = &["obsidian-vault", "themis"];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

impl Default for ServerInfo {
    fn default() -> Self {
        Self {
            name: "themis".to_string(),
            version: "V1.0.0".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    pub root: Option<PathBuf>,
    pub exclude_globs: Vec<String>,
    pub order: EntryOrder,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerInfo,
    pub vault: VaultConfig,
}

impl Config {
    /// 按扩展名加载 YAML 或 JSON 配置，未知扩展名按 YAML 解析。
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ThemisError::ConfigError(format!("cannot read {}: {e}", path.display()))
        })?;

        let is_json = path
            .extension()
            .and_then(|s| s.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        if is_json {
            serde_json::from_str(&raw).map_err(|e| ThemisError::ConfigError(e.to_string()))
        } else {
            serde_yaml::from_str(&raw).map_err(|e| ThemisError::ConfigError(e.to_string()))
        }
    }

    /// Resolves the vault root once for the process lifetime.
    ///
    /// `THEMIS_VAULT_PATH` wins over `vault.root`, which wins over
    /// `<home>/obsidian-vault/themis`.
    pub fn resolve_vault_root(&self) -> PathBuf {
        let from_env = std::env::var_os(VAULT_PATH_ENV).filter(|v| !v.is_empty());
        resolve_vault_root_with(
            from_env.map(PathBuf::from),
            self.vault.root.clone(),
            dirs::home_dir(),
        )
    }
}

pub(crate) fn resolve_vault_root_with(
    from_env: Option<PathBuf>,
    from_config: Option<PathBuf>,
    home: Option<PathBuf>,
) -> PathBuf {
    if let Some(p) = from_env {
        return p;
    }
    if let Some(p) = from_config.filter(|p| !p.as_os_str().is_empty()) {
        return p;
    }

    let base = home.unwrap_or_else(|| {
        debug!("home directory unavailable, vault root falls back to a relative path");
        PathBuf::new()
    });
    DEFAULT_VAULT_SUBDIR.iter().fold(base, |acc, seg| acc.join(seg))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn default_root_lives_under_home() {
        let root = resolve_vault_root_with(None, None, Some(PathBuf::from("/home/ann")));
        assert_eq!(root, PathBuf::from("/home/ann/obsidian-vault/themis"));
    }

    #[test]
    fn missing_home_degrades_to_relative_root() {
        let root = resolve_vault_root_with(None, None, None);
        assert_eq!(root, PathBuf::from("obsidian-vault/themis"));
    }

    #[test]
    fn env_overrides_config_and_home() {
        let root = resolve_vault_root_with(
            Some(PathBuf::from("/srv/diary")),
            Some(PathBuf::from("/etc/diary")),
            Some(PathBuf::from("/home/ann")),
        );
        assert_eq!(root, PathBuf::from("/srv/diary"));

        let root = resolve_vault_root_with(
            None,
            Some(PathBuf::from("/etc/diary")),
            Some(PathBuf::from("/home/ann")),
        );
        assert_eq!(root, PathBuf::from("/etc/diary"));
    }

    #[test]
    fn load_yaml_and_json() {
        let dir = tempdir().unwrap();

        let yaml = dir.path().join("themis.yaml");
        let raw = concat!(
            "vault:\n",
            "  root: /data/vault\n",
            "  exclude_globs: [\"**/.trash/**\"]\n",
            "  order: traversal\n",
        );
        std::fs::write(&yaml, raw).unwrap();
        let cfg = Config::load_from_path(&yaml).unwrap();
        assert_eq!(cfg.vault.root, Some(PathBuf::from("/data/vault")));
        assert_eq!(cfg.vault.exclude_globs, vec!["**/.trash/**".to_string()]);
        assert_eq!(cfg.vault.order, EntryOrder::Traversal);
        assert_eq!(cfg.server.name, "themis");

        let json = dir.path().join("themis.json");
        std::fs::write(&json, r#"{"server": {"name": "diary", "version": "2"}}"#).unwrap();
        let cfg = Config::load_from_path(&json).unwrap();
        assert_eq!(cfg.server.name, "diary");
        assert_eq!(cfg.vault.order, EntryOrder::NewestFirst);
        assert!(cfg.vault.root.is_none());
    }

    #[test]
    fn unreadable_config_is_config_error() {
        let dir = tempdir().unwrap();
        let err = Config::load_from_path(&dir.path().join("missing.yaml")).unwrap_err();
        assert!(matches!(err, ThemisError::ConfigError(_)));
    }
}
