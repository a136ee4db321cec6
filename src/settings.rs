use std::path::Path;

use serde::{Deserialize, Serialize};

/// Runtime configuration. Every field has a default so partial files work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Initial drawing surface size in pixels.
    pub width: u32,
    pub height: u32,
    /// Real-time frame rate target for the scheduler.
    pub target_fps: u32,
    /// Upper bound on the elapsed time fed to `tick`, in seconds. None = unclamped.
    pub max_frame_delta: Option<f64>,
    /// Log and skip a failing entity instead of aborting the frame.
    pub isolate_entity_errors: bool,
    /// File extension picked up by the directory source.
    pub script_extension: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            target_fps: 60,
            max_frame_delta: None,
            isolate_entity_errors: true,
            script_extension: "ryx".to_string(),
        }
    }
}

impl RuntimeConfig {
    /// Frame period derived from `target_fps`. Zero fps falls back to 60.
    pub fn frame_period(&self) -> std::time::Duration {
        let fps = if self.target_fps == 0 { 60 } else { self.target_fps };
        std::time::Duration::from_secs_f64(1.0 / f64::from(fps))
    }

    /// Apply `max_frame_delta` to a measured elapsed time.
    pub fn clamp_delta(&self, dt: f64) -> f64 {
        let dt = dt.max(0.0);
        match self.max_frame_delta {
            Some(max) if dt > max => max,
            _ => dt,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Load config from a JSON file. A missing file yields defaults.
pub fn load_config(path: &Path) -> Result<RuntimeConfig, ConfigError> {
    if !path.exists() {
        return Ok(RuntimeConfig::default());
    }
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| ConfigError::Json {
        path: path.display().to_string(),
        source,
    })
}
