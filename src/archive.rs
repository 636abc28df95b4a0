//! Persistent storage for leveled fields and front masks.
//!
//! The pipeline only talks to storage through the `ArchiveStore` trait. `MemoryArchive` keeps
//! everything in a map and is what the tests use, `NetCdfArchive` reads and writes CF style
//! NetCDF files and needs the `netcdf` feature.

use crate::{
    error::{AnalysisError, Result},
    field::LeveledField,
    fronts::FrontMask,
    preprocess::Variable,
};
use metfor::{HectoPascal, Quantity};
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

/// Read and write access to the archives used by the pipeline.
pub trait ArchiveStore {
    /// Check if an archive exists at `path`.
    fn exists(&self, path: &Path) -> bool;

    /// Read the variable `variable` from the archive at `path`.
    fn read_leveled(&self, path: &Path, variable: &str) -> Result<LeveledField>;

    /// Write a field to a new archive at `path`, replacing anything already there.
    fn write_leveled(&mut self, path: &Path, field: &LeveledField) -> Result<()>;

    /// Read a front mask.
    fn read_mask(&self, path: &Path) -> Result<FrontMask>;

    /// Write a front mask to a new archive at `path`, replacing anything already there.
    fn write_mask(&mut self, path: &Path, mask: &FrontMask) -> Result<()>;
}

/// Location of the preprocessed archive for a variable.
pub fn processed_path(output_dir: &Path, variable: Variable) -> PathBuf {
    output_dir.join(variable.processed_file_name())
}

/// Location of the front mask archive for a pressure level, e.g. `front_mask_850hPa.nc`.
pub fn mask_path(output_dir: &Path, level: HectoPascal) -> PathBuf {
    output_dir.join(format!("front_mask_{:.0}hPa.nc", level.unpack()))
}

#[derive(Debug, Clone)]
enum Stored {
    Leveled(LeveledField),
    Mask(FrontMask),
}

/// An archive store that keeps everything in memory, keyed by path.
#[derive(Debug, Clone, Default)]
pub struct MemoryArchive {
    entries: HashMap<PathBuf, Stored>,
}

impl MemoryArchive {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to add a field.
    pub fn with_leveled<P: Into<PathBuf>>(mut self, path: P, field: LeveledField) -> Self {
        self.entries.insert(path.into(), Stored::Leveled(field));
        self
    }

    /// The number of stored archives.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if nothing has been stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove an archive, returning whether it was there.
    pub fn remove(&mut self, path: &Path) -> bool {
        self.entries.remove(path).is_some()
    }

    fn get(&self, path: &Path) -> Result<&Stored> {
        self.entries
            .get(path)
            .ok_or_else(|| AnalysisError::MissingFile(path.to_path_buf()))
    }
}

impl ArchiveStore for MemoryArchive {
    fn exists(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    fn read_leveled(&self, path: &Path, variable: &str) -> Result<LeveledField> {
        match self.get(path)? {
            Stored::Leveled(field) if field.name() == variable => Ok(field.clone()),
            _ => Err(AnalysisError::MissingVariable(format!(
                "{} in {}",
                variable,
                path.display()
            ))),
        }
    }

    fn write_leveled(&mut self, path: &Path, field: &LeveledField) -> Result<()> {
        self.entries
            .insert(path.to_path_buf(), Stored::Leveled(field.clone()));
        Ok(())
    }

    fn read_mask(&self, path: &Path) -> Result<FrontMask> {
        match self.get(path)? {
            Stored::Mask(mask) => Ok(mask.clone()),
            Stored::Leveled(_) => Err(AnalysisError::MissingVariable(format!(
                "{} in {}",
                crate::fronts::FRONT_MASK_NAME,
                path.display()
            ))),
        }
    }

    fn write_mask(&mut self, path: &Path, mask: &FrontMask) -> Result<()> {
        self.entries
            .insert(path.to_path_buf(), Stored::Mask(mask.clone()));
        Ok(())
    }
}

#[cfg(feature = "netcdf")]
pub use self::netcdf_io::NetCdfArchive;

#[cfg(feature = "netcdf")]
mod netcdf_io;
