//! Reading and writing `~/.mappacker/config.ini`.
//!
//! The file holds the job defaults (`[output]`, `[workspace]`, `[render]`),
//! download limits, provider credentials, the spool queue layout and the log
//! file. Keys absent from the file keep their [`ConfigFile::default`] value.

use super::settings::ConfigFile;
use ini::Ini;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Directory under the home directory holding the config file.
const CONFIG_DIR_NAME: &str = ".mappacker";

const CONFIG_FILE_NAME: &str = "config.ini";

#[derive(Debug, Error)]
pub enum ConfigFileError {
    /// The file exists but is not valid INI, or could not be read
    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: ini::Error,
    },

    #[error("cannot write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A key holds a value the packager cannot use
    #[error("Invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },
}

impl ConfigFile {
    /// Loads `~/.mappacker/config.ini`, or defaults when there is none.
    pub fn load() -> Result<Self, ConfigFileError> {
        Self::load_from(&config_file_path())
    }

    /// Loads `path` over the defaults. A missing file is not an error; a
    /// malformed one is.
    pub fn load_from(path: &Path) -> Result<Self, ConfigFileError> {
        let ini = match Ini::load_from_file(path) {
            Ok(ini) => ini,
            Err(ini::Error::Io(e)) if e.kind() == ErrorKind::NotFound => {
                return Ok(Self::default())
            }
            Err(source) => {
                return Err(ConfigFileError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        super::parser::parse_ini(&ini)
    }

    /// Writes every setting to `path`, creating `~/.mappacker` as needed.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigFileError> {
        let write_error = |path: &Path, source| ConfigFileError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| write_error(parent, e))?;
        }
        std::fs::write(path, self.to_ini_string()).map_err(|e| write_error(path, e))
    }

    /// The INI text `config show` prints and `save_to` writes.
    pub fn to_ini_string(&self) -> String {
        super::writer::to_config_string(self)
    }
}

/// `~/.mappacker`, or `./.mappacker` without a home directory. Also the
/// parent of the default output, workspace and queue directories.
pub fn config_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR_NAME)
}

pub fn config_file_path() -> PathBuf {
    config_directory().join(CONFIG_FILE_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::defaults::*;
    use crate::render::ImageFormat;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_yields_job_defaults() {
        let dir = TempDir::new().unwrap();
        let config = ConfigFile::load_from(&dir.path().join("absent.ini")).unwrap();

        assert_eq!(config.download.timeout, DEFAULT_DOWNLOAD_TIMEOUT_SECS);
        assert_eq!(config.download.parallel, 5);
        assert_eq!(config.render.tile_size, 512);
        assert_eq!(config.render.format, ImageFormat::Jpg);
        assert_eq!(config.queue.poll_interval, 10);
        assert!(config.provider.mapbox_access_token.is_none());
        assert!(config.queue.destination_dir.is_none());
        assert_eq!(config.output.directory, ConfigFile::default().output.directory);
    }

    #[test]
    fn test_malformed_file_is_read_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.ini");
        std::fs::write(&path, "[render\ntile_size = 256\n").unwrap();

        let err = ConfigFile::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigFileError::Read { .. }), "{}", err);
        assert!(err.to_string().contains("config.ini"));
    }

    #[test]
    fn test_save_creates_config_directory() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME);

        ConfigFile::default().save_to(&path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_config_path_under_home() {
        assert!(config_file_path().ends_with(".mappacker/config.ini"));
    }
}
