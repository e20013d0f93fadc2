use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use object::{Object, ObjectKind};
use regex::Regex;

use super::{find_symbols, ObjFile, Sym};

/// An ELF object opened for a specific mapping.
#[derive(Debug)]
pub struct ElfFile {
    path: PathBuf,
    base: u64,
    build_id: String,
    nm: PathBuf,
}

impl ElfFile {
    /// Parse `path` and compute its load base for the mapping
    /// `[start, limit)` at file offset `offset`.
    ///
    /// # Errors
    /// Returns an error if the file can't be read or parsed.
    pub fn open(path: &Path, start: u64, limit: u64, offset: u64, nm: PathBuf) -> Result<Self> {
        let data =
            fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
        let obj = object::File::parse(&*data)
            .with_context(|| format!("Failed to parse object file {}", path.display()))?;

        let build_id = match obj.build_id() {
            Ok(Some(id)) => hex::encode(id),
            _ => String::new(),
        };

        // Executables are linked at their runtime address. Shared objects
        // and PIEs are relocated to wherever the mapping starts.
        let base = match obj.kind() {
            ObjectKind::Dynamic if limit > start => start.saturating_sub(offset),
            _ => 0,
        };

        Ok(Self { path: path.to_path_buf(), base, build_id, nm })
    }
}

impl ObjFile for ElfFile {
    fn name(&self) -> &Path {
        &self.path
    }

    fn base(&self) -> u64 {
        self.base
    }

    fn build_id(&self) -> &str {
        &self.build_id
    }

    fn symbols(&self, pattern: Option<&Regex>, addr: u64) -> Result<Vec<Sym>> {
        find_symbols(&self.nm, &self.path, pattern, addr)
    }
}
