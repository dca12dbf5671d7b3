//! Configuration command handlers
//!
//! Handles the `configure` subcommand for setting up hydra CLI defaults.

use crate::config::Config;
use anyhow::Result;
use std::path::PathBuf;

/// Values to change, as given on the command line
#[derive(Debug, Default)]
pub struct Changes {
    pub export_dir: Option<PathBuf>,
    pub keep_decoded: Option<bool>,
    pub process_name: Option<String>,
    pub profile: Option<String>,
    pub enable: Vec<String>,
    pub disable: Vec<String>,
}

impl Changes {
    fn is_empty(&self) -> bool {
        self.export_dir.is_none()
            && self.keep_decoded.is_none()
            && self.process_name.is_none()
            && self.profile.is_none()
            && self.enable.is_empty()
            && self.disable.is_empty()
    }
}

/// Handle the configure command
pub fn handle(changes: Changes, show: bool) -> Result<()> {
    let mut config = Config::load()?;

    if show {
        show_config(&config);
        return Ok(());
    }

    if changes.is_empty() {
        show_usage();
        return Ok(());
    }

    apply(&mut config, changes)?;
    config.save()?;

    println!("Configuration updated");
    if let Ok(path) = Config::config_path() {
        println!("Config saved to: {}", path.display());
    }

    Ok(())
}

fn apply(config: &mut Config, changes: Changes) -> Result<()> {
    if let Some(dir) = changes.export_dir {
        config.export_dir = dir;
    }
    if let Some(keep) = changes.keep_decoded {
        config.keep_decoded = keep;
    }
    if let Some(name) = changes.process_name {
        config.process_name = name;
    }
    if let Some(profile) = changes.profile {
        config.profile = profile;
        config.profile()?;
    }
    for name in &changes.enable {
        config.set_kind(name, true)?;
    }
    for name in &changes.disable {
        config.set_kind(name, false)?;
    }
    Ok(())
}

/// Display current configuration
fn show_config(config: &Config) {
    println!("Export directory: {}", config.export_dir.display());
    println!("Keep decoded:     {}", config.keep_decoded);
    println!("Process name:     {}", config.process_name);
    println!("Profile:          {}", config.profile);
    println!();
    println!("Asset kinds:");
    for kind in hydra::AssetKind::ALL {
        let state = if config.is_enabled(kind) { "enabled" } else { "disabled" };
        println!("  {:<20} {}", kind.name(), state);
    }

    if let Ok(path) = Config::config_path() {
        println!();
        println!("Config file: {}", path.display());
    }
}

/// Show usage help for the configure command
fn show_usage() {
    println!("Usage: hydra configure --export-dir DIR");
    println!("   or: hydra configure --enable rawfile --disable xcam");
    println!("   or: hydra configure --show");
}

#[cfg(test)]
mod tests {
    use super::*;
    use hydra::AssetKind;

    #[test]
    fn test_apply_changes() {
        let mut config = Config::default();
        apply(
            &mut config,
            Changes {
                export_dir: Some(PathBuf::from("out")),
                keep_decoded: Some(true),
                disable: vec!["rumble".to_string(), "xcam".to_string()],
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(config.export_dir, PathBuf::from("out"));
        assert!(config.keep_decoded);
        assert!(!config.is_enabled(AssetKind::Rumble));
        assert!(!config.is_enabled(AssetKind::XCam));
        assert!(config.is_enabled(AssetKind::RawFile));
    }

    #[test]
    fn test_apply_rejects_unknown_profile() {
        let mut config = Config::default();
        let changes = Changes {
            profile: Some("t8-pc".to_string()),
            ..Default::default()
        };
        assert!(apply(&mut config, changes).is_err());
    }

    #[test]
    fn test_empty_changes() {
        assert!(Changes::default().is_empty());
    }
}
