use addr2line::Context;
use anyhow::{Context as _, Result};
use gimli::{EndianRcSlice, RunTimeEndian};
use object::{Object, ObjectSection};
use rustc_demangle::demangle;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::rc::Rc;

/// DWARF-backed resolver for file-relative addresses of one binary
///
/// Includes a cache because the same address is usually shared by many
/// locations of a merged profile.
pub struct Symbolizer {
    ctx: Context<EndianRcSlice<RunTimeEndian>>,
    /// Cache of resolved frames by address
    cache: RefCell<HashMap<u64, Vec<InlinedFrame>>>,
}

impl Symbolizer {
    /// Create a new symbolizer for the given binary
    ///
    /// # Errors
    /// Returns an error if the binary file cannot be read or parsed, or if DWARF debug info is missing
    pub fn new<P: AsRef<Path>>(binary_path: P) -> Result<Self> {
        let binary_data = fs::read(binary_path.as_ref()).context("Failed to read binary file")?;

        let obj_file = object::File::parse(&*binary_data).context("Failed to parse object file")?;

        let endian =
            if obj_file.is_little_endian() { RunTimeEndian::Little } else { RunTimeEndian::Big };

        let load_section =
            |id: gimli::SectionId| -> Result<EndianRcSlice<RunTimeEndian>, gimli::Error> {
                let data = obj_file
                    .section_by_name(id.name())
                    .and_then(|section| section.uncompressed_data().ok())
                    .unwrap_or(std::borrow::Cow::Borrowed(&[][..]));
                Ok(EndianRcSlice::new(Rc::from(&*data), endian))
            };

        let dwarf = gimli::Dwarf::load(&load_section)?;
        let ctx = Context::from_dwarf(dwarf).context("Failed to load DWARF debug information")?;

        Ok(Self { ctx, cache: RefCell::new(HashMap::new()) })
    }

    /// Resolve a file-relative address to its inlined frames, innermost first
    ///
    /// Frames without a function name are left out; an empty result means the
    /// address is unknown to the debug info.
    pub fn resolve(&self, addr: u64) -> Vec<InlinedFrame> {
        if let Some(cached) = self.cache.borrow().get(&addr) {
            return cached.clone();
        }

        let mut result = Vec::new();

        if let Ok(mut frame_iter) = self.ctx.find_frames(addr).skip_all_loads() {
            while let Ok(Some(frame)) = frame_iter.next() {
                let Some(function) = frame.function.as_ref() else {
                    continue;
                };
                let system_name = function.raw_name().map(|n| n.to_string()).unwrap_or_default();
                let name = function
                    .demangle()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|_| Self::demangle_symbol(&system_name));

                let (file, line) = frame
                    .location
                    .map(|loc| {
                        (loc.file.map(std::string::ToString::to_string), loc.line)
                    })
                    .unwrap_or_default();

                result.push(InlinedFrame { name, system_name, file, line });
            }
        }

        self.cache.borrow_mut().insert(addr, result.clone());
        result
    }

    /// Demangle a Rust symbol name, without the trailing hash
    #[must_use]
    pub fn demangle_symbol(symbol: &str) -> String {
        format!("{:#}", demangle(symbol))
    }
}

/// One frame at an address; inlined callees come before their callers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlinedFrame {
    pub name: String,
    pub system_name: String,
    pub file: Option<String>,
    pub line: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demangle_strips_hash() {
        assert_eq!(
            Symbolizer::demangle_symbol("_ZN4core3fmt5write17h0123456789abcdefE"),
            "core::fmt::write"
        );
        assert_eq!(Symbolizer::demangle_symbol("main"), "main");
    }

    #[test]
    fn test_rejects_non_object() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("junk");
        fs::write(&path, b"junk").unwrap();
        assert!(Symbolizer::new(&path).is_err());
    }
}
