//! Object file inspection
//!
//! [`ObjTool`] is the capability the binary locator and the symbolizer use to
//! look at local executables. [`Binutils`] implements it by parsing ELF files
//! directly and shelling out to `nm` / `objdump` for symbol listings and
//! disassembly.

mod elf;
pub mod nm;
pub mod objdump;

use std::path::{Path, PathBuf};

use anyhow::Result;
use regex::Regex;

pub use elf::ElfFile;
pub use nm::find_symbols;
pub use objdump::disassemble;

/// A symbol, possibly with several names sharing one address range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sym {
    pub names: Vec<String>,
    pub file: String,
    pub start: u64,
    /// Inclusive.
    pub end: u64,
}

/// One disassembled instruction with the source context objdump gave it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Inst {
    pub addr: u64,
    pub text: String,
    pub function: String,
    pub file: String,
    pub line: u32,
}

/// Opens object files and disassembles address ranges.
pub trait ObjTool: Send + Sync {
    /// Open the object at `path`, as mapped at `[start, limit)` with file
    /// offset `offset`.
    ///
    /// # Errors
    /// Returns an error if the file can't be read or isn't a supported object.
    fn open(&self, path: &Path, start: u64, limit: u64, offset: u64) -> Result<Box<dyn ObjFile>>;

    /// Disassemble `[start, end]` of the object at `path`.
    ///
    /// # Errors
    /// Returns an error if the disassembler fails.
    fn disassemble(&self, path: &Path, start: u64, end: u64) -> Result<Vec<Inst>>;
}

/// An opened object file.
pub trait ObjFile {
    fn name(&self) -> &Path;

    /// Difference between runtime and file-relative addresses.
    fn base(&self) -> u64;

    /// Hex-encoded GNU build id, empty if the object has none.
    fn build_id(&self) -> &str;

    /// Symbols whose name matches `pattern` or whose range contains `addr`.
    ///
    /// # Errors
    /// Returns an error if the symbol listing can't be produced.
    fn symbols(&self, pattern: Option<&Regex>, addr: u64) -> Result<Vec<Sym>>;
}

/// [`ObjTool`] backed by ELF parsing plus the GNU binutils programs.
#[derive(Debug, Clone)]
pub struct Binutils {
    pub nm: PathBuf,
    pub objdump: PathBuf,
}

impl Default for Binutils {
    fn default() -> Self {
        Self { nm: PathBuf::from("nm"), objdump: PathBuf::from("objdump") }
    }
}

impl ObjTool for Binutils {
    fn open(&self, path: &Path, start: u64, limit: u64, offset: u64) -> Result<Box<dyn ObjFile>> {
        let file = ElfFile::open(path, start, limit, offset, self.nm.clone())?;
        Ok(Box::new(file))
    }

    fn disassemble(&self, path: &Path, start: u64, end: u64) -> Result<Vec<Inst>> {
        disassemble(&self.objdump, path, start, end)
    }
}
