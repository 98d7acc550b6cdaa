use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::app_dirs::AppDirs;
use crate::record::QualityFloor;
use crate::session::DurationMode;
use crate::text_supply::WordGenConfig;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub mode_secs: u32,
    pub punctuation: bool,
    pub numbers: bool,
    pub min_wpm: u32,
    pub min_accuracy: u32,
    pub email: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        let floor = QualityFloor::default();
        Self {
            mode_secs: DurationMode::default().secs(),
            punctuation: false,
            numbers: false,
            min_wpm: floor.min_wpm,
            min_accuracy: floor.min_accuracy,
            email: None,
        }
    }
}

impl Config {
    pub fn mode(&self) -> DurationMode {
        DurationMode::from_secs(self.mode_secs)
    }

    pub fn quality_floor(&self) -> QualityFloor {
        QualityFloor {
            min_wpm: self.min_wpm,
            min_accuracy: self.min_accuracy.min(100),
        }
    }

    pub fn word_gen_config(&self) -> WordGenConfig {
        WordGenConfig {
            punctuation: self.punctuation,
            numbers: self.numbers,
        }
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    pub fn new() -> Self {
        Self {
            path: AppDirs::config_path(),
        }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(_) => return Config::default(),
        };
        match serde_json::from_slice::<Config>(&bytes) {
            Ok(cfg) => cfg,
            Err(err) => {
                tracing::warn!("Failed to parse config at {:?}: {}", self.path, err);
                Config::default()
            }
        }
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg)?;
        fs::write(&self.path, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn roundtrip_default_config() {
        let dir = tempdir().unwrap();
        let store = FileConfigStore::with_path(dir.path().join("config.json"));
        let cfg = Config::default();
        store.save(&cfg).unwrap();
        assert_eq!(cfg, store.load());
    }

    #[test]
    fn save_and_load_custom_config() {
        let dir = tempdir().unwrap();
        let store = FileConfigStore::with_path(dir.path().join("nested").join("config.json"));
        let cfg = Config {
            mode_secs: 60,
            punctuation: true,
            numbers: true,
            min_wpm: 20,
            min_accuracy: 90,
            email: Some("ada@example.com".into()),
        };
        store.save(&cfg).unwrap();
        assert_eq!(cfg, store.load());
    }

    #[test]
    fn missing_or_broken_file_gives_default() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        let store = FileConfigStore::with_path(&path);
        assert_eq!(store.load(), Config::default());

        fs::write(&path, b"{ not json").unwrap();
        assert_eq!(store.load(), Config::default());
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, br#"{ "mode_secs": 60 }"#).unwrap();

        let cfg = FileConfigStore::with_path(&path).load();
        assert_eq!(cfg.mode(), DurationMode::SIXTY);
        assert_eq!(cfg.quality_floor(), QualityFloor::default());
    }

    #[test]
    fn derived_settings() {
        let cfg = Config {
            min_accuracy: 150,
            punctuation: true,
            ..Config::default()
        };
        assert_eq!(cfg.quality_floor().min_accuracy, 100);
        assert!(cfg.word_gen_config().punctuation);
        assert!(!cfg.word_gen_config().numbers);
    }
}
