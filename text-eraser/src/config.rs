use std::{io, path::PathBuf};

/// Environment variable overriding [`Config::endpoint`].
pub const ENDPOINT_ENV: &str = "TEXT_ERASER_ENDPOINT";

#[derive(serde::Deserialize, Debug)]
#[serde(default)]
pub struct Config {
    /// Inpainting service receiving `{image_url, mask_url}`.
    pub endpoint: String,
    /// Where autosaved masks live. Defaults to the platform data directory.
    pub store_dir: Option<PathBuf>,
    /// Images loaded on start-up, unless a directory is passed on the command line.
    pub image_dir: Option<PathBuf>,
    pub brush_radius: u32,
    pub egui: crate::app::Config,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8000/process-image".into(),
            store_dir: None,
            image_dir: None,
            brush_radius: 30,
            egui: Default::default(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config: {0}")]
    Io(#[from] io::Error),
    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

impl Config {
    /// Reads `path` if it exists, falling back to the defaults otherwise.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let mut config = match std::fs::File::open(path) {
            Ok(f) => serde_json::from_reader(f)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => Self::default(),
            Err(e) => return Err(e.into()),
        };
        if let Ok(endpoint) = std::env::var(ENDPOINT_ENV) {
            config.endpoint = endpoint;
        }
        Ok(config)
    }

    pub fn store_dir(&self) -> PathBuf {
        self.store_dir.clone().unwrap_or_else(|| {
            dirs::data_local_dir()
                .or_else(dirs::home_dir)
                .unwrap_or_else(|| PathBuf::from("."))
                .join("text-eraser")
        })
    }
}
