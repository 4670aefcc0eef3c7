use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Default helper-script root; helpers live in a per-plugin subdirectory.
pub const DEFAULT_HELPER_ROOT: &str = "/usr/share/PackageKit/helpers";

/// Default plugin loaded when neither the config file nor the command line
/// names one.
pub const DEFAULT_BACKEND: &str = "test";

/// On-disk daemon configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// Name of the plugin to load for new transactions.
    #[serde(default = "default_backend")]
    pub backend: String,
    /// Directory containing per-plugin helper-script subdirectories.
    #[serde(default = "default_helper_root")]
    pub helper_root: PathBuf,
}

fn default_backend() -> String {
    DEFAULT_BACKEND.to_string()
}

fn default_helper_root() -> PathBuf {
    PathBuf::from(DEFAULT_HELPER_ROOT)
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            helper_root: default_helper_root(),
        }
    }
}

fn xdg_config_home() -> anyhow::Result<PathBuf> {
    if let Some(dir) = std::env::var_os("XDG_CONFIG_HOME") {
        let dir = PathBuf::from(dir);
        if dir.as_os_str().is_empty() {
            anyhow::bail!("XDG_CONFIG_HOME is set but empty");
        }
        return Ok(dir);
    }

    let home = std::env::var_os("HOME").ok_or_else(|| anyhow::anyhow!("HOME is not set"))?;
    let home = PathBuf::from(home);
    if home.as_os_str().is_empty() {
        anyhow::bail!("HOME is set but empty");
    }
    Ok(home.join(".config"))
}

pub fn config_path() -> anyhow::Result<PathBuf> {
    Ok(xdg_config_home()?.join("pakbroker").join("config.json"))
}

/// Load the config file, returning `None` when it does not exist.
pub fn load_config() -> anyhow::Result<Option<BrokerConfig>> {
    let path = config_path()?;
    if !path.exists() {
        return Ok(None);
    }
    let raw = std::fs::read_to_string(&path)?;
    Ok(Some(serde_json::from_str(&raw)?))
}

/// Persist the config file, creating parent directories as needed.
pub fn save_config(cfg: &BrokerConfig) -> anyhow::Result<()> {
    let path = config_path()?;
    let dir = path
        .parent()
        .ok_or_else(|| anyhow::anyhow!("invalid config path: {}", path.display()))?;
    std::fs::create_dir_all(dir)?;

    let json = serde_json::to_string_pretty(cfg)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json)?;
    std::fs::rename(tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_fields() {
        let cfg: BrokerConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.backend, DEFAULT_BACKEND);
        assert_eq!(cfg.helper_root, PathBuf::from(DEFAULT_HELPER_ROOT));
    }
}
