//! Key file persistence.
//!
//! A `KeyStore` reads and writes exported keys under one explicit base
//! directory. File names are plain names; anything that could escape the base
//! directory is rejected.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::{KeysealError, Result};
use crate::export;
use crate::keys::{KeyHalf, KeyMaterial};

#[derive(Debug, Clone)]
pub struct KeyStore {
    base_dir: PathBuf,
}

impl KeyStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.key_dir.clone())
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Resolve `name` inside the base directory.
    pub fn path(&self, name: &str) -> Result<PathBuf> {
        if name.is_empty()
            || name == "."
            || name == ".."
            || name.contains(['/', '\\'])
        {
            return Err(KeysealError::InvalidOperation(format!(
                "invalid key file name {:?}",
                name
            )));
        }
        Ok(self.base_dir.join(name))
    }

    pub fn write_text(&self, name: &str, text: &str) -> Result<()> {
        self.write_bytes(name, text.as_bytes())
    }

    pub fn read_text(&self, name: &str) -> Result<String> {
        Ok(fs::read_to_string(self.path(name)?)?)
    }

    /// Write raw bytes, creating the base directory if needed.
    pub fn write_bytes(&self, name: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path(name)?;
        fs::create_dir_all(&self.base_dir)?;
        fs::write(&path, bytes)?;
        tracing::debug!(path = %path.display(), "wrote key file");
        Ok(())
    }

    pub fn read_bytes(&self, name: &str) -> Result<Vec<u8>> {
        Ok(fs::read(self.path(name)?)?)
    }

    /// Export `half` of `material` as key text and write it to `name`.
    pub fn save(&self, name: &str, material: &KeyMaterial, half: KeyHalf) -> Result<()> {
        let text = export::export_as_text(material, half)?;
        self.write_text(name, &text)
    }

    /// Read key text from `name` and import it.
    pub fn load(&self, name: &str) -> Result<KeyMaterial> {
        let text = self.read_text(name)?;
        export::import_from_text(&text)
    }
}
