//! # Local Symbolization
//!
//! Profiles fetched from remote agents often carry nothing but addresses:
//! the agent had no debug information, or chose not to spend time resolving
//! frames. Once the binary locator has pointed a mapping at a local copy of
//! the executable, this module turns those addresses into function names,
//! source files and line numbers.
//!
//! ## Address Translation
//!
//! Profile locations hold **runtime addresses**. DWARF describes **file
//! addresses**. For a position-independent executable or a shared library
//! the two differ by the load base of the mapping:
//!
//! ```text
//! base         = mapping.start - mapping.offset      (dynamic objects)
//! file address = location.address - base
//! ```
//!
//! Non-PIE executables are linked at their runtime address, so their base is
//! zero. The base comes from [`crate::binutils::ObjFile::base`].
//!
//! ## Modes
//!
//! - [`SymbolizeMode::None`](crate::domain::SymbolizeMode::None): leave the profile alone
//! - [`SymbolizeMode::Local`](crate::domain::SymbolizeMode::Local): only mappings
//!   that don't have function information yet
//! - [`SymbolizeMode::Force`](crate::domain::SymbolizeMode::Force): every
//!   mapping with a readable local binary, replacing existing lines
//!
//! ## Inlining
//!
//! `addr2line` reports the inlined call chain at an address innermost first,
//! which is the order pprof expects in `Location.lines`. A location with more
//! than one line marks its mapping as having inline frames.
//!
//! ## Module Structure
//!
//! - **`symbolizer`**: DWARF lookups for one binary, with a per-address cache
//! - **`local`**: walks a profile's mappings and rewrites locations in place
//!
//! ## Limitations
//!
//! - **Requires debug info**: binaries without DWARF are skipped
//! - **ELF only**: the object parser is built with ELF support alone

pub mod local;
pub mod symbolizer;

pub use local::symbolize;
pub use symbolizer::Symbolizer;
