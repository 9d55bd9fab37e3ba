use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub tools: ToolsConfig,

    #[serde(default)]
    pub inspection: InspectionConfig,

    #[serde(default)]
    pub log: LogConfig,
}

/// Paths of the external utilities. Bare names are looked up on PATH.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub arcconf:   String,
    pub megacli:   String,
    pub ipmitool:  String,
    pub dmidecode: String,
    pub lsblk:     String,
    pub curl:      String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InspectionConfig {
    /// Callback URL of the inspection service, e.g.
    /// `http://10.0.0.1:5050/v1/continue`. Empty = BMC setter disabled.
    pub callback_url: String,
    /// Extra attempts after the first failed BMC update.
    pub bmc_retries: u32,
    /// Pause between BMC attempts in seconds.
    pub bmc_retry_interval_sec: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// trace, debug, info, warn, error, critical
    pub level: String,
    /// Append logs to this file instead of the terminal.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

// ── Defaults ─────────────────────────────────────────────────────────

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            arcconf:   "/opt/arcconf/cmdline/arcconf".into(),
            megacli:   "/opt/MegaRAID/MegaCli/MegaCli64".into(),
            ipmitool:  "ipmitool".into(),
            dmidecode: "dmidecode".into(),
            lsblk:     "lsblk".into(),
            curl:      "curl".into(),
        }
    }
}

impl Default for InspectionConfig {
    fn default() -> Self {
        Self {
            callback_url:           String::new(),
            bmc_retries:            0,
            bmc_retry_interval_sec: 60,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { level: "info".into(), path: None }
    }
}

// ── Load / Save ───────────────────────────────────────────────────────

impl Config {
    /// Load from the default location, falling back to defaults.
    pub fn load() -> Self {
        match try_load() {
            Ok(c)  => c,
            Err(_) => {
                // Write defaults on first run (best-effort)
                let _ = try_write_defaults();
                Config::default()
            }
        }
    }

    /// Load an explicitly named file. Unlike [Config::load], a missing or
    /// malformed file is an error.
    pub fn load_from(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("raidmgr").join("raidmgr.toml"))
    }
}

fn try_load() -> Result<Config> {
    let path = Config::config_path().ok_or_else(|| anyhow::anyhow!("no config dir"))?;
    Config::load_from(&path)
}

fn try_write_defaults() -> Result<()> {
    let path = Config::config_path().ok_or_else(|| anyhow::anyhow!("no config dir"))?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let text = toml::to_string_pretty(&Config::default())?;
    fs::write(path, format!("# raidmgr configuration\n# Generated on first run, edit freely\n\n{}", text))?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let cfg: Config = toml::from_str(
            "[tools]\nmegacli = \"/usr/sbin/megacli\"\n\n[inspection]\nbmc_retries = 3\n",
        )
        .unwrap();
        assert_eq!(cfg.tools.megacli, "/usr/sbin/megacli");
        assert_eq!(cfg.tools.arcconf, "/opt/arcconf/cmdline/arcconf");
        assert_eq!(cfg.inspection.bmc_retries, 3);
        assert_eq!(cfg.inspection.bmc_retry_interval_sec, 60);
        assert_eq!(cfg.log.level, "info");
    }

    #[test]
    fn test_defaults_round_trip() {
        let text = toml::to_string_pretty(&Config::default()).unwrap();
        let cfg: Config = toml::from_str(&text).unwrap();
        assert_eq!(cfg.tools.curl, "curl");
        assert!(cfg.log.path.is_none());
    }
}
