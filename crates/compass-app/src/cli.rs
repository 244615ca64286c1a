//! CLI argument definitions for the compass binary.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::Parser;
use std::path::PathBuf;

use compass_core::config::CompassConfig;
use compass_core::Role;

/// Strategic Compass: a strategy chat for design leads.
#[derive(Parser, Debug)]
#[command(name = "compass", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,

    /// Role to run the session as (admin, manager, designer, viewer).
    #[arg(short = 'r', long = "role")]
    pub role: Option<Role>,

    /// Simulated thinking time before each answer, in milliseconds.
    #[arg(long = "delay-ms")]
    pub delay_ms: Option<u64>,

    /// Workflow catalog (TOML) to use instead of the built-in one.
    #[arg(long = "catalog")]
    pub catalog: Option<PathBuf>,

    /// Directory exported transcripts are written to.
    #[arg(short = 'o', long = "export-dir")]
    pub export_dir: Option<PathBuf>,
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > COMPASS_CONFIG env var > ~/.compass/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("COMPASS_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Apply flag overrides on top of the loaded configuration.
    pub fn apply_overrides(&self, config: &mut CompassConfig) {
        if let Some(ref level) = self.log_level {
            config.general.log_level = level.clone();
        }
        if let Some(role) = self.role {
            config.general.role = role;
        }
        if let Some(delay) = self.delay_ms {
            config.chat.response_delay_ms = delay;
        }
        if let Some(ref catalog) = self.catalog {
            config.chat.catalog_path = Some(catalog.to_string_lossy().to_string());
        }
        if let Some(ref dir) = self.export_dir {
            config.export.dir = dir.to_string_lossy().to_string();
        }
    }
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".compass").join("config.toml");
    }
    #[cfg(not(target_os = "windows"))]
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".compass").join("config.toml");
    }
    PathBuf::from("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_all_flags() {
        let args = CliArgs::try_parse_from([
            "compass",
            "--config",
            "/tmp/compass.toml",
            "--log-level",
            "debug",
            "--role",
            "viewer",
            "--delay-ms",
            "0",
            "--catalog",
            "/tmp/workflows.toml",
            "--export-dir",
            "/tmp/out",
        ])
        .unwrap();

        assert_eq!(args.resolve_config_path(), PathBuf::from("/tmp/compass.toml"));
        assert_eq!(args.role, Some(Role::Viewer));
        assert_eq!(args.delay_ms, Some(0));
    }

    #[test]
    fn test_unknown_role_rejected() {
        assert!(CliArgs::try_parse_from(["compass", "--role", "intern"]).is_err());
    }

    #[test]
    fn test_overrides_replace_config_values() {
        let args = CliArgs::try_parse_from([
            "compass",
            "-l",
            "warn",
            "-r",
            "admin",
            "--delay-ms",
            "10",
            "--catalog",
            "custom.toml",
            "-o",
            "exports",
        ])
        .unwrap();
        let mut config = CompassConfig::default();
        args.apply_overrides(&mut config);

        assert_eq!(config.general.log_level, "warn");
        assert_eq!(config.general.role, Role::Admin);
        assert_eq!(config.chat.response_delay_ms, 10);
        assert_eq!(config.chat.catalog_path.as_deref(), Some("custom.toml"));
        assert_eq!(config.export.dir, "exports");
    }

    #[test]
    fn test_no_flags_keep_config() {
        let args = CliArgs::try_parse_from(["compass"]).unwrap();
        let mut config = CompassConfig::default();
        args.apply_overrides(&mut config);

        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.general.role, Role::Designer);
        assert_eq!(config.chat.response_delay_ms, 1500);
        assert!(config.chat.catalog_path.is_none());
    }
}
