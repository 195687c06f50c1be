//! Configuration CLI commands.
//!
//! Provides `config path` and `config list` for inspecting the settings the
//! other commands run with.

use std::path::Path;

use clap::Subcommand;
use mapmotion::config::{config_file_path, ConfigFile};

use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// List all configuration settings
    List,

    /// Show the configuration file path
    Path,

    /// Write the current settings (defaults for anything unset) to the config file
    Init,
}

/// Run a config subcommand.
pub fn run(
    command: ConfigCommands,
    config: &ConfigFile,
    override_path: Option<&Path>,
) -> Result<(), CliError> {
    match command {
        ConfigCommands::List => {
            print!("{}", render_list(config));
            Ok(())
        }
        ConfigCommands::Path => {
            let path = resolve_path(override_path)?;
            println!("{}", path.display());
            Ok(())
        }
        ConfigCommands::Init => {
            let path = resolve_path(override_path)?;
            config.save_to(&path)?;
            println!("Wrote {}", path.display());
            Ok(())
        }
    }
}

fn resolve_path(override_path: Option<&Path>) -> Result<std::path::PathBuf, CliError> {
    match override_path {
        Some(path) => Ok(path.to_path_buf()),
        None => config_file_path().ok_or_else(|| {
            CliError::Config("could not determine the user config directory".to_string())
        }),
    }
}

/// All settings grouped by section.
fn render_list(config: &ConfigFile) -> String {
    let mut out = String::from("Configuration Settings\n======================\n");
    let mut current_section = String::new();

    for (section, key, value) in config.entries() {
        // Print section header when section changes
        if section != current_section {
            out.push_str(&format!("\n[{}]\n", section));
            current_section = section;
        }
        if value.is_empty() {
            out.push_str(&format!("  {} = (not set)\n", key));
        } else {
            out.push_str(&format!("  {} = {}\n", key, value));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_groups_by_section() {
        let text = render_list(&ConfigFile::default());

        assert!(text.contains("[animation]\n  duration_ms = 2000"));
        assert!(text.contains("[hover]"));
        assert!(text.contains("  file = (not set)"));
        assert_eq!(text.matches("[animation]").count(), 1);
    }

    #[test]
    fn test_init_writes_override_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.ini");

        run(ConfigCommands::Init, &ConfigFile::default(), Some(&path)).unwrap();

        let loaded = ConfigFile::load_from(&path).unwrap();
        assert_eq!(loaded, ConfigFile::default());
    }

    #[test]
    fn test_path_prefers_override() {
        let path = resolve_path(Some(Path::new("/tmp/mapmotion.ini"))).unwrap();
        assert_eq!(path, Path::new("/tmp/mapmotion.ini"));
    }
}
