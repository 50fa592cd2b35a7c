use std::{collections::HashMap, fs, net::SocketAddr, path::Path};

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    pub server_bind: String,
    pub sensor_command: String,
    pub drift_path: String,
    pub recording_path: String,
    pub webroot: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_bind: "0.0.0.0:8000".into(),
            sensor_command: "bin/euler_60".into(),
            drift_path: "drift".into(),
            recording_path: "webroot/fps-test/data.json".into(),
            webroot: "./webroot".into(),
        }
    }
}

pub fn load_settings() -> Settings {
    load_settings_from(Path::new("server.toml"), |key| std::env::var(key).ok())
}

/// Defaults, then the flat string table in `config_path`, then environment.
pub fn load_settings_from(config_path: &Path, env: impl Fn(&str) -> Option<String>) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(config_path) {
        if let Ok(file_cfg) = toml::from_str::<HashMap<String, String>>(&raw) {
            if let Some(v) = file_cfg.get("bind_addr") {
                settings.server_bind = v.clone();
            }
            if let Some(v) = file_cfg.get("sensor_command") {
                settings.sensor_command = v.clone();
            }
            if let Some(v) = file_cfg.get("drift_path") {
                settings.drift_path = v.clone();
            }
            if let Some(v) = file_cfg.get("recording_path") {
                settings.recording_path = v.clone();
            }
            if let Some(v) = file_cfg.get("webroot") {
                settings.webroot = v.clone();
            }
        }
    }

    if let Some(v) = env("SERVER_BIND") {
        settings.server_bind = v;
    }
    if let Some(v) = env("APP__BIND_ADDR") {
        settings.server_bind = v;
    }
    if let Some(v) = env("APP__SENSOR_COMMAND") {
        settings.sensor_command = v;
    }
    if let Some(v) = env("APP__DRIFT_PATH") {
        settings.drift_path = v;
    }
    if let Some(v) = env("APP__RECORDING_PATH") {
        settings.recording_path = v;
    }
    if let Some(v) = env("APP__WEBROOT") {
        settings.webroot = v;
    }

    settings
}

/// Resolves the listen address, letting `--port` replace the configured port.
pub fn bind_addr(settings: &Settings, port: Option<u16>) -> anyhow::Result<SocketAddr> {
    let mut addr: SocketAddr = settings
        .server_bind
        .parse()
        .with_context(|| format!("invalid bind address '{}'", settings.server_bind))?;
    if let Some(port) = port {
        addr.set_port(port);
    }
    Ok(addr)
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
