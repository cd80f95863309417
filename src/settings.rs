use std::{env, fs, io, path::Path};

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::models::{ValidationOptions, DEFAULT_POINT_TOLERANCE_MIN};

pub const SETTINGS_PATH: &str = "data/settings.json";
pub const SETTINGS_ENV: &str = "GOAL_SCHEDULER_SETTINGS";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub bind_addr: String,
    pub point_tolerance_min: i64, // +/- minutes around a point range
    pub log_filter: String,       // default tracing directive, RUST_LOG wins
}

impl Default for EngineSettings {
    fn default() -> Self {
        EngineSettings {
            bind_addr: "127.0.0.1:3000".to_string(),
            point_tolerance_min: DEFAULT_POINT_TOLERANCE_MIN,
            log_filter: "info".to_string(),
        }
    }
}

impl EngineSettings {
    pub fn validation_options(&self) -> ValidationOptions {
        ValidationOptions {
            point_tolerance: Duration::minutes(self.point_tolerance_min),
        }
    }
}

/// Load settings from `$GOAL_SCHEDULER_SETTINGS`, else `data/settings.json`.
/// A missing file means defaults.
pub fn load_settings() -> io::Result<EngineSettings> {
    let path = env::var(SETTINGS_ENV).unwrap_or_else(|_| SETTINGS_PATH.to_string());
    load_settings_from(Path::new(&path))
}

pub fn load_settings_from(path: &Path) -> io::Result<EngineSettings> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(EngineSettings::default()),
        Err(e) => return Err(e),
    };

    let settings: EngineSettings =
        serde_json::from_str(&text).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    if settings.point_tolerance_min < 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("point_tolerance_min must be >= 0, got {}", settings.point_tolerance_min),
        ));
    }

    Ok(settings)
}
