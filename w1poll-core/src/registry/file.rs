//! JSON-file-backed device registry
//!
//! Every mutation rewrites the whole file through a sibling temp file and a
//! rename, so a crash never leaves a half-written registry behind. The
//! in-memory view only changes once the new state is on disk.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::{DeviceEntry, DeviceRegistry, MemoryRegistry, NewDevice};
use crate::error::{RegistryError, RegistryResult};

/// Current on-disk format version
const REGISTRY_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct RegistryFile {
    version: u32,
    #[serde(default)]
    devices: Vec<DeviceEntry>,
}

/// Registry persisted to a JSON file
#[derive(Debug)]
pub struct FileRegistry {
    path: PathBuf,
    inner: MemoryRegistry,
}

impl FileRegistry {
    /// Opens the registry at `path`, starting empty if the file is missing
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or decoded.
    pub fn open(path: impl Into<PathBuf>) -> RegistryResult<Self> {
        let path = path.into();
        let inner = if path.exists() {
            let contents = fs::read_to_string(&path).map_err(|source| RegistryError::Io {
                path: path.clone(),
                source,
            })?;
            let file: RegistryFile = serde_json::from_str(&contents)
                .map_err(|e| RegistryError::Decode(e.to_string()))?;
            if file.version > REGISTRY_FORMAT_VERSION {
                return Err(RegistryError::Decode(format!(
                    "unsupported registry version {}",
                    file.version
                )));
            }
            MemoryRegistry::with_devices(file.devices)?
        } else {
            MemoryRegistry::new()
        };
        tracing::debug!(path = %path.display(), devices = inner.len(), "Opened device registry");
        Ok(Self { path, inner })
    }

    /// Path of the backing file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Applies `change` to a copy of the registry and keeps it once written
    fn commit(
        &mut self,
        change: impl FnOnce(&mut MemoryRegistry) -> RegistryResult<()>,
    ) -> RegistryResult<()> {
        let mut candidate = self.inner.clone();
        change(&mut candidate)?;
        self.persist(&candidate)?;
        self.inner = candidate;
        Ok(())
    }

    fn persist(&self, state: &MemoryRegistry) -> RegistryResult<()> {
        let io_err = |source: std::io::Error| RegistryError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let file = RegistryFile {
            version: REGISTRY_FORMAT_VERSION,
            devices: state.devices(),
        };
        let json =
            serde_json::to_string_pretty(&file).map_err(|e| RegistryError::Decode(e.to_string()))?;

        let mut tmp_name = self.path.file_name().unwrap_or_default().to_os_string();
        tmp_name.push(".tmp");
        let tmp_path = self.path.with_file_name(tmp_name);
        fs::write(&tmp_path, json).map_err(io_err)?;
        fs::rename(&tmp_path, &self.path).map_err(io_err)?;
        Ok(())
    }
}

impl DeviceRegistry for FileRegistry {
    fn devices(&self) -> Vec<DeviceEntry> {
        self.inner.devices()
    }

    fn create_device(&mut self, device: NewDevice) -> RegistryResult<()> {
        self.commit(|registry| registry.create_device(device))
    }

    fn update_value(&mut self, unit: u32, value: &str) -> RegistryResult<()> {
        self.commit(|registry| registry.update_value(unit, value))
    }
}
