//! Configuration: optional ~/.solfa/config.yaml with per-field defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Settings shared by the `parse` and `render` commands.
/// Every field falls back to its default when absent from the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding the reference images (`Note_H1.JPG`, ...).
    pub references_dir: Option<PathBuf>,
    /// Directory holding one `<entry>.wav` clip per emitted entry.
    pub music_dir: PathBuf,
    /// Where `output_fa.wav` and `output_sol.wav` are written.
    pub output_dir: PathBuf,
    pub sample_rate: u32,
    /// Seconds cut from the end of every clip before concatenation.
    pub tail_trim_secs: f32,
    /// Playback volume, clamped to 0.0..=1.0 on the audio thread.
    pub volume: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            references_dir: None,
            music_dir: PathBuf::from("music"),
            output_dir: PathBuf::from("output"),
            sample_rate: 44_100,
            tail_trim_secs: 1.3,
            volume: 1.0,
        }
    }
}

/// Get the config file path.
pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".solfa").join("config.yaml"))
}

impl Config {
    /// Load from the standard path, or defaults when there is none.
    pub fn load() -> Self {
        match config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Load from `path`. A missing file gives the defaults; a malformed one
    /// is reported and also gives the defaults.
    pub fn load_from(path: &Path) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(_) => {
                debug!(path = %path.display(), "no config file, using defaults");
                return Self::default();
            }
        };
        match Self::from_yaml(&content) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), "ignoring malformed config: {e}");
                Self::default()
            }
        }
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        // An empty document deserializes as unit, not as an empty map.
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(yaml)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.references_dir, None);
        assert_eq!(config.output_dir, PathBuf::from("output"));
        assert_eq!(config.sample_rate, 44_100);
        assert!((config.tail_trim_secs - 1.3).abs() < f32::EPSILON);
        assert_eq!(config.volume, 1.0);
    }

    #[test]
    fn partial_yaml_keeps_other_defaults() {
        let config = Config::from_yaml("music_dir: /srv/clips\ntail_trim_secs: 0.5\n").unwrap();
        assert_eq!(config.music_dir, PathBuf::from("/srv/clips"));
        assert!((config.tail_trim_secs - 0.5).abs() < f32::EPSILON);
        assert_eq!(config.sample_rate, 44_100);
        assert_eq!(config.output_dir, PathBuf::from("output"));
    }

    #[test]
    fn full_yaml() {
        let yaml = r#"
references_dir: refs
music_dir: clips
output_dir: out
sample_rate: 22050
tail_trim_secs: 0.0
volume: 0.4
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.references_dir, Some(PathBuf::from("refs")));
        assert_eq!(config.sample_rate, 22_050);
        assert_eq!(config.tail_trim_secs, 0.0);
        assert!((config.volume - 0.4).abs() < f32::EPSILON);
    }

    #[test]
    fn empty_yaml_is_default() {
        assert_eq!(Config::from_yaml("").unwrap(), Config::default());
    }

    #[test]
    fn load_from_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(Config::load_from(&dir.path().join("config.yaml")), Config::default());
    }

    #[test]
    fn load_from_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "sample_rate: [not, a, number]\n").unwrap();
        assert_eq!(Config::load_from(&path), Config::default());
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "output_dir: rendered\n").unwrap();
        assert_eq!(Config::load_from(&path).output_dir, PathBuf::from("rendered"));
    }

    #[test]
    fn config_path_under_home() {
        if let Some(path) = config_path() {
            assert!(path.ends_with(".solfa/config.yaml"));
        }
    }
}
