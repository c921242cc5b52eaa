use pid_link::config::{SettingsStore, StorageError, StoredSettings};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Settings record kept in a file on the host
pub struct SettingsFile {
    path: PathBuf,
}

impl SettingsFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for SettingsFile {
    fn read(&mut self) -> Result<StoredSettings, StorageError> {
        let data = fs::read(&self.path).map_err(|e| {
            debug!("Failed to read {}: {}", self.path.display(), e);
            StorageError::ReadFailed
        })?;

        StoredSettings::from_bytes(&data)
    }

    fn write(&mut self, settings: &StoredSettings) -> Result<(), StorageError> {
        fs::write(&self.path, settings.to_bytes()).map_err(|e| {
            warn!("Failed to write {}: {}", self.path.display(), e);
            StorageError::WriteFailed
        })?;

        info!("Settings written to {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pid_link::config::load_or_initialize;
    use pid_link::{Gains, OutputLimits};

    fn temp_path(name: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "pid-link-{}-{}.settings",
            name,
            std::process::id()
        ));
        let _ = fs::remove_file(&path);
        path
    }

    #[test]
    fn test_missing_file_initializes_defaults() {
        let path = temp_path("missing");
        let mut file = SettingsFile::new(&path);

        assert_eq!(file.read(), Err(StorageError::ReadFailed));
        assert_eq!(load_or_initialize(&mut file), StoredSettings::default());
        assert_eq!(file.read(), Ok(StoredSettings::default()));

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_saved_gains_reloaded() {
        let path = temp_path("saved");
        let mut file = SettingsFile::new(&path);

        let settings = StoredSettings {
            output_limits: OutputLimits::Bounded { min: -5.0, max: 5.0 },
            ..StoredSettings::default()
        }
        .with_gains(Gains::new(0.7, 0.03, 0.2));
        file.write(&settings).unwrap();

        let mut reopened = SettingsFile::new(file.path());
        assert_eq!(load_or_initialize(&mut reopened), settings);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_corrupted_file_replaced_with_defaults() {
        let path = temp_path("corrupted");
        fs::write(&path, b"not a settings record").unwrap();

        let mut file = SettingsFile::new(&path);
        assert_eq!(file.read(), Err(StorageError::InvalidSize));
        assert_eq!(load_or_initialize(&mut file), StoredSettings::default());
        assert!(file.read().is_ok());

        fs::remove_file(&path).unwrap();
    }
}
