//! Configuration management for hydra CLI

use anyhow::{bail, Context, Result};
use hydra::AssetKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub export_dir: PathBuf,
    pub keep_decoded: bool,
    pub process_name: String,
    pub profile: String,
    /// Per-kind switches keyed by kind name; missing kinds are enabled
    pub kinds: BTreeMap<String, bool>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            export_dir: PathBuf::from("exported_files"),
            keep_decoded: false,
            process_name: hydra::profile::T7_PC.process_name.to_string(),
            profile: hydra::profile::T7_PC.name.to_string(),
            kinds: AssetKind::ALL
                .iter()
                .map(|kind| (kind.name().to_string(), true))
                .collect(),
        }
    }
}

impl Config {
    /// Get the path to the config file
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?
            .join("hydra");

        Ok(config_dir.join("config.toml"))
    }

    /// Load configuration from file, or create default if it doesn't exist
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Config::default());
        }

        let contents = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config from {}", config_path.display()))?;

        toml::from_str(&contents).context("Failed to parse config file")
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory at {}", parent.display())
            })?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(config_path, contents)
            .with_context(|| format!("Failed to write config to {}", config_path.display()))?;

        Ok(())
    }

    pub fn is_enabled(&self, kind: AssetKind) -> bool {
        self.kinds.get(kind.name()).copied().unwrap_or(true)
    }

    /// Turn a kind on or off by name
    pub fn set_kind(&mut self, name: &str, enabled: bool) -> Result<()> {
        let Some(kind) = AssetKind::from_pool_name(name) else {
            let known: Vec<_> = AssetKind::ALL.iter().map(|k| k.name()).collect();
            bail!("Unknown asset kind '{}'. Known kinds: {}", name, known.join(", "));
        };
        self.kinds.insert(kind.name().to_string(), enabled);
        Ok(())
    }

    /// The configured game profile
    pub fn profile(&self) -> Result<&'static hydra::Profile> {
        hydra::profile::by_name(&self.profile)
            .with_context(|| format!("Unknown profile '{}'", self.profile))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_enables_every_kind() {
        let config = Config::default();
        assert_eq!(config.export_dir, PathBuf::from("exported_files"));
        assert_eq!(config.process_name, "BlackOps3");
        assert!(AssetKind::ALL.iter().all(|&k| config.is_enabled(k)));
        assert!(config.profile().is_ok());
    }

    #[test]
    fn test_config_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hydra").join("config.toml");

        let mut config = Config::default();
        config.keep_decoded = true;
        config.export_dir = PathBuf::from("/tmp/out");
        config.set_kind("rumble", false).unwrap();
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
        assert!(!loaded.is_enabled(AssetKind::Rumble));
        assert!(loaded.is_enabled(AssetKind::XCam));
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = Config::load_from(&dir.path().join("none.toml")).unwrap();
        assert_eq!(loaded, Config::default());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "keep_decoded = true\n\n[kinds]\nxcam = false\n").unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert!(loaded.keep_decoded);
        assert_eq!(loaded.profile, "t7-pc");
        assert!(!loaded.is_enabled(AssetKind::XCam));
        assert!(loaded.is_enabled(AssetKind::RawFile));
    }

    #[test]
    fn test_set_unknown_kind() {
        let mut config = Config::default();
        assert!(config.set_kind("sound", true).is_err());
    }
}
