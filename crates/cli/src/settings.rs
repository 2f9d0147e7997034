//! Layered settings: defaults, optional TOML file, `ADAS__*` environment

use adas::AdasConfig;
use anyhow::Context;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use signal_bus::{ControllerConfig, MonitorConfig, ReplayConfig};
use std::path::Path;
use trace_io::ZoneConfig;

/// Environment prefix; `ADAS__OVERSPEED__HOLD_S=3` sets `overspeed.hold_s`
pub const ENV_PREFIX: &str = "ADAS";

/// Everything the binary can be configured with
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Rule thresholds, at the top level of the file
    #[serde(flatten)]
    pub adas: AdasConfig,
    pub monitor: MonitorConfig,
    pub replay: ReplayConfig,
    pub controller: ControllerConfig,
    pub zones: ZoneConfig,
}

/// Load settings. A given file must exist; environment variables override it.
pub fn load_settings(path: Option<&Path>) -> anyhow::Result<Settings> {
    let mut builder = Config::builder();
    if let Some(path) = path {
        builder = builder.add_source(File::from(path).required(true));
    }
    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .try_parsing(true),
    );

    let settings: Settings = builder
        .build()
        .context("failed to read configuration")?
        .try_deserialize()
        .context("invalid configuration")?;
    settings.adas.validate()?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use adas::PolicyKind;
    use std::io::Write;

    fn write_toml(name: &str, body: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("adas-settings-{}-{}.toml", name, std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(body.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_defaults_without_file() {
        let settings = load_settings(None).unwrap();
        assert_eq!(settings.adas.overspeed.max_speed_kmh, 120.0);
        assert_eq!(settings.monitor.hz, 1.0);
        assert_eq!(settings.zones.school_limit_kmh, 50.0);
    }

    #[test]
    fn test_partial_file() {
        let path = write_toml(
            "partial",
            r#"
policy = "cruise"

[overspeed]
max_speed_kmh = 100
hold_s = 1.5

[monitor]
hz = 4.0
max_cycles = 10
"#,
        );
        let settings = load_settings(Some(&path)).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(settings.adas.policy, PolicyKind::Cruise);
        assert_eq!(settings.adas.overspeed.max_speed_kmh, 100.0);
        assert_eq!(settings.adas.overspeed.hold_s, 1.5);
        // Untouched fields keep their defaults
        assert_eq!(settings.adas.overspeed.tolerance_kmh, 0.0);
        assert_eq!(settings.adas.gap.safe_distance_m, 10.0);
        assert_eq!(settings.monitor.max_cycles, Some(10));
        assert!(settings.monitor.auto_brake);
    }

    #[test]
    fn test_invalid_thresholds_rejected() {
        let path = write_toml(
            "invalid",
            r#"
[gap]
critical_distance_m = 20.0
"#,
        );
        let result = load_settings(Some(&path));
        std::fs::remove_file(&path).ok();
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_file_is_error() {
        let path = std::env::temp_dir().join("adas-settings-does-not-exist.toml");
        assert!(load_settings(Some(&path)).is_err());
    }
}
