//! Config file discovery, loading, and environment variable overlay.

use crate::{ConfigError, WarbleConfig};
use std::env;
use std::path::{Path, PathBuf};

/// Information about where config values came from.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    /// Config files that were loaded (in order)
    pub files: Vec<PathBuf>,
    /// Environment variables that overrode config values
    pub env_overrides: Vec<String>,
}

/// Discover config files in standard locations.
///
/// Returns paths in load order (system, user, local).
/// Only returns files that exist.
pub fn discover_config_files() -> Vec<PathBuf> {
    discover_config_files_with_override(None)
}

/// Discover config files, optionally with a CLI override path.
///
/// If `cli_path` is provided and exists, it replaces the local override.
/// Returns paths in load order (system, user, local/cli).
pub fn discover_config_files_with_override(cli_path: Option<&Path>) -> Vec<PathBuf> {
    let mut files = Vec::new();

    let system = PathBuf::from("/etc/warble/config.toml");
    if system.exists() {
        files.push(system);
    }

    // User config (XDG_CONFIG_HOME or ~/.config)
    if let Some(config_dir) = directories::BaseDirs::new().map(|d| d.config_dir().to_path_buf()) {
        let user = config_dir.join("warble/config.toml");
        if user.exists() {
            files.push(user);
        }
    }

    // CLI override takes precedence over local
    if let Some(path) = cli_path {
        if path.exists() {
            files.push(path.to_path_buf());
            return files;
        }
    }

    let local = PathBuf::from("warble.toml");
    if local.exists() {
        files.push(local);
    }

    files
}

/// Read a TOML file and layer the keys it sets onto `config`.
pub fn apply_file(config: &mut WarbleConfig, path: &Path) -> Result<(), ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    apply_toml(config, &contents, path)
}

/// Layer a TOML document onto `config`. Keys the document does not mention
/// keep their current value, so earlier files survive later partial ones.
pub fn apply_toml(config: &mut WarbleConfig, contents: &str, path: &Path) -> Result<(), ConfigError> {
    let table: toml::Table = contents.parse().map_err(|e: toml::de::Error| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    if let Some(bind) = table.get("bind").and_then(|v| v.as_table()) {
        if let Some(v) = bind.get("listen").and_then(|v| v.as_str()) {
            config.infra.bind.listen = v.to_string();
        }
        if let Some(v) = bind.get("peer").and_then(|v| v.as_str()) {
            config.infra.bind.peer = v.to_string();
        }
    }

    if let Some(telemetry) = table.get("telemetry").and_then(|v| v.as_table()) {
        if let Some(v) = telemetry.get("log_level").and_then(|v| v.as_str()) {
            config.infra.telemetry.log_level = v.to_string();
        }
    }

    if let Some(model) = table.get("model").and_then(|v| v.as_table()) {
        let m = &mut config.bootstrap.model;
        if let Some(v) = model.get("max_duration") {
            m.max_duration = float_value(v, "model.max_duration", path)?;
        }
        if let Some(v) = model.get("note_order") {
            m.note_order = count_value(v, "model.note_order", path)?;
        }
        if let Some(v) = model.get("time_order") {
            m.time_order = count_value(v, "model.time_order", path)?;
        }
        if let Some(v) = model.get("divisions") {
            m.divisions = count_value(v, "model.divisions", path)?;
        }
        if let Some(v) = model.get("note_rate") {
            m.note_rate = float_value(v, "model.note_rate", path)?;
        }
        if let Some(v) = model.get("time_rate") {
            m.time_rate = float_value(v, "model.time_rate", path)?;
        }
        if let Some(v) = model.get("seed") {
            m.seed = Some(count_value(v, "model.seed", path)? as u64);
        }
    }

    Ok(())
}

/// Integers are accepted where a float is expected (`max_duration = 2`).
fn float_value(value: &toml::Value, key: &str, path: &Path) -> Result<f64, ConfigError> {
    value
        .as_float()
        .or_else(|| value.as_integer().map(|i| i as f64))
        .ok_or_else(|| invalid(key, path, format!("expected a number, got {value}")))
}

fn count_value(value: &toml::Value, key: &str, path: &Path) -> Result<usize, ConfigError> {
    let raw = value
        .as_integer()
        .ok_or_else(|| invalid(key, path, format!("expected an integer, got {value}")))?;
    usize::try_from(raw).map_err(|_| invalid(key, path, format!("must not be negative, got {raw}")))
}

fn invalid(key: &str, path: &Path, message: String) -> ConfigError {
    ConfigError::InvalidValue {
        path: path.to_path_buf(),
        key: key.to_string(),
        message,
    }
}

/// Apply environment variable overrides to config.
pub fn apply_env_overrides(config: &mut WarbleConfig, sources: &mut ConfigSources) {
    apply_env_overrides_from(config, sources, env::vars());
}

/// Apply overrides from an explicit set of variables.
///
/// Unparseable numeric values are skipped, leaving the file value in place.
pub fn apply_env_overrides_from(
    config: &mut WarbleConfig,
    sources: &mut ConfigSources,
    vars: impl IntoIterator<Item = (String, String)>,
) {
    let vars: std::collections::HashMap<String, String> = vars.into_iter().collect();
    let mut take = |name: &str| -> Option<String> {
        let value = vars.get(name)?.clone();
        sources.env_overrides.push(name.to_string());
        Some(value)
    };

    if let Some(v) = take("WARBLE_LISTEN") {
        config.infra.bind.listen = v;
    }
    if let Some(v) = take("WARBLE_PEER") {
        config.infra.bind.peer = v;
    }
    if let Some(v) = take("WARBLE_LOG_LEVEL") {
        config.infra.telemetry.log_level = v;
    }
    // Also support RUST_LOG
    if let Some(v) = take("RUST_LOG") {
        config.infra.telemetry.log_level = v;
    }

    let model = &mut config.bootstrap.model;
    if let Some(Ok(v)) = take("WARBLE_MAX_DURATION").map(|v| v.parse::<f64>()) {
        model.max_duration = v;
    }
    if let Some(Ok(v)) = take("WARBLE_NOTE_ORDER").map(|v| v.parse::<usize>()) {
        model.note_order = v;
    }
    if let Some(Ok(v)) = take("WARBLE_TIME_ORDER").map(|v| v.parse::<usize>()) {
        model.time_order = v;
    }
    if let Some(Ok(v)) = take("WARBLE_DIVISIONS").map(|v| v.parse::<usize>()) {
        model.divisions = v;
    }
    if let Some(Ok(v)) = take("WARBLE_NOTE_RATE").map(|v| v.parse::<f64>()) {
        model.note_rate = v;
    }
    if let Some(Ok(v)) = take("WARBLE_TIME_RATE").map(|v| v.parse::<f64>()) {
        model.time_rate = v;
    }
    if let Some(Ok(v)) = take("WARBLE_SEED").map(|v| v.parse::<u64>()) {
        model.seed = Some(v);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_discover_config_files() {
        // Just verify it doesn't panic
        let _files = discover_config_files();
    }

    #[test]
    fn test_parse_minimal_toml() {
        let mut config = WarbleConfig::default();
        let toml = r#"
[bind]
listen = "127.0.0.1:9000"
"#;
        apply_toml(&mut config, toml, Path::new("test.toml")).unwrap();
        assert_eq!(config.infra.bind.listen, "127.0.0.1:9000");
        // Other values should be defaults
        assert_eq!(config.infra.bind.peer, "127.0.0.1:8001");
        assert_eq!(config.bootstrap.model.divisions, 15);
    }

    #[test]
    fn test_parse_full_toml() {
        let mut config = WarbleConfig::default();
        let toml = r#"
[bind]
listen = "0.0.0.0:7000"
peer = "10.0.0.5:7001"

[telemetry]
log_level = "debug"

[model]
max_duration = 4
note_order = 2
time_order = 4
divisions = 8
note_rate = 0.25
time_rate = 0.05
seed = 1234
"#;
        apply_toml(&mut config, toml, Path::new("test.toml")).unwrap();

        assert_eq!(config.infra.bind.listen, "0.0.0.0:7000");
        assert_eq!(config.infra.bind.peer, "10.0.0.5:7001");
        assert_eq!(config.infra.telemetry.log_level, "debug");
        let m = &config.bootstrap.model;
        assert_eq!(m.max_duration, 4.0);
        assert_eq!(m.note_order, 2);
        assert_eq!(m.time_order, 4);
        assert_eq!(m.divisions, 8);
        assert_eq!(m.note_rate, 0.25);
        assert_eq!(m.time_rate, 0.05);
        assert_eq!(m.seed, Some(1234));
    }

    #[test]
    fn test_later_layer_only_overrides_what_it_sets() {
        let mut config = WarbleConfig::default();
        apply_toml(&mut config, "[model]\nnote_order = 5\n", Path::new("a.toml")).unwrap();
        apply_toml(&mut config, "[model]\ndivisions = 6\n", Path::new("b.toml")).unwrap();
        assert_eq!(config.bootstrap.model.note_order, 5);
        assert_eq!(config.bootstrap.model.divisions, 6);
    }

    #[test]
    fn test_negative_count_rejected() {
        let mut config = WarbleConfig::default();
        let err = apply_toml(&mut config, "[model]\nnote_order = -1\n", Path::new("x.toml"))
            .unwrap_err();
        match err {
            ConfigError::InvalidValue { key, .. } => assert_eq!(key, "model.note_order"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_malformed_toml_reports_path() {
        let mut config = WarbleConfig::default();
        let err = apply_toml(&mut config, "[model\n", Path::new("broken.toml")).unwrap_err();
        assert!(err.to_string().contains("broken.toml"));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = WarbleConfig::default();
        let mut sources = ConfigSources::default();
        apply_env_overrides_from(
            &mut config,
            &mut sources,
            vars(&[
                ("WARBLE_PEER", "192.168.1.2:9001"),
                ("WARBLE_DIVISIONS", "10"),
                ("WARBLE_SEED", "99"),
                ("WARBLE_NOTE_RATE", "not-a-number"),
                ("UNRELATED", "x"),
            ]),
        );
        assert_eq!(config.infra.bind.peer, "192.168.1.2:9001");
        assert_eq!(config.bootstrap.model.divisions, 10);
        assert_eq!(config.bootstrap.model.seed, Some(99));
        assert_eq!(config.bootstrap.model.note_rate, 0.1);
        assert!(sources.env_overrides.contains(&"WARBLE_DIVISIONS".to_string()));
        assert!(!sources.env_overrides.contains(&"UNRELATED".to_string()));
    }

    #[test]
    fn test_rust_log_wins_over_warble_log_level() {
        let mut config = WarbleConfig::default();
        let mut sources = ConfigSources::default();
        apply_env_overrides_from(
            &mut config,
            &mut sources,
            vars(&[("WARBLE_LOG_LEVEL", "warn"), ("RUST_LOG", "warbled=trace")]),
        );
        assert_eq!(config.infra.telemetry.log_level, "warbled=trace");
    }
}
