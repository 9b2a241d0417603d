use flightsum_core::EngineConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

const DATA_DIR_NAME: &str = ".flightsum";

/// Local `.flightsum` directory, used when the home directory is unusable.
fn local_data_dir() -> PathBuf {
    let local = PathBuf::from(DATA_DIR_NAME);
    if let Err(e) = fs::create_dir_all(&local) {
        warn!(error = %e, "Could not create local .flightsum either");
    }
    local
}

/// Returns the ~/.flightsum directory, creating it if needed.
pub fn flightsum_data_dir() -> PathBuf {
    let Some(home) = dirs::home_dir() else {
        warn!("No home directory, using local .flightsum");
        return local_data_dir();
    };
    let path = home.join(DATA_DIR_NAME);
    match fs::create_dir_all(&path) {
        Ok(()) => path,
        Err(e) => {
            warn!(error = %e, path = %path.display(), "Using local .flightsum");
            local_data_dir()
        }
    }
}

/// Where run outputs are written. File names get `.json` appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_mean_summary")]
    pub mean_summary: String,
    #[serde(default = "default_alpha_summary")]
    pub alpha_summary: String,
    #[serde(default = "default_association")]
    pub association: String,
}

fn default_directory() -> PathBuf {
    PathBuf::from("Data")
}

fn default_mean_summary() -> String {
    "rewrite_mean".to_string()
}

fn default_alpha_summary() -> String {
    "rewrite_alpha".to_string()
}

fn default_association() -> String {
    "assoc".to_string()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_directory(),
            mean_summary: default_mean_summary(),
            alpha_summary: default_alpha_summary(),
            association: default_association(),
        }
    }
}

impl OutputConfig {
    pub fn mean_summary_path(&self) -> PathBuf {
        self.directory.join(&self.mean_summary)
    }

    pub fn alpha_summary_path(&self) -> PathBuf {
        self.directory.join(&self.alpha_summary)
    }

    pub fn association_path(&self) -> PathBuf {
        self.directory.join(&self.association)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl Config {
    pub fn get_config_path() -> PathBuf {
        let mut path = flightsum_data_dir();
        path.push("config.toml");
        path
    }

    /// Loads `path`, or the default location when `None`.
    /// A missing file is created with default settings.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let path = path.map_or_else(Self::get_config_path, Path::to_path_buf);

        if !path.exists() {
            let config = Config::default();
            config.save(&path)?;
            return Ok(config);
        }

        let content = fs::read_to_string(&path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let toml = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_config_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let config = Config::load(Some(path.as_path())).unwrap();
        assert!(path.exists());
        assert_eq!(config.engine.batch_size, 10_000);
        assert_eq!(config.output.mean_summary_path(), PathBuf::from("Data/rewrite_mean"));
    }

    #[test]
    fn test_partial_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[engine]\nbatch_size = 250\n\n[output]\ndirectory = \"out\"\n").unwrap();
        let config = Config::load(Some(path.as_path())).unwrap();
        assert_eq!(config.engine.batch_size, 250);
        assert_eq!(config.engine.comment_marker, '#');
        assert_eq!(config.output.association_path(), PathBuf::from("out/assoc"));
    }

    #[test]
    fn test_save_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("config.toml");
        Config::load(Some(path.as_path())).unwrap();
        assert!(path.is_file());
    }

    #[test]
    fn test_data_dir_is_named_flightsum() {
        let dir = flightsum_data_dir();
        assert!(dir.ends_with(DATA_DIR_NAME));
        assert!(dir.is_dir());
    }
}
