//! # profgrab - Profile Retrieval and Merging
//!
//! profgrab collects pprof profiles from many places at once (local files,
//! HTTP endpoints, raw `perf record` captures), weights them, points their
//! mappings at local copies of the profiled binaries, and merges everything
//! into one aggregate profile.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Source descriptor                            │
//! │     sources (×1) + base (×-1), duration, timeout, overrides     │
//! └───────────────────────┬─────────────────────────────────────────┘
//!                         │ fetch units
//!                         ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │            Chunked orchestrator (batches of 64)                 │
//! │                                                                 │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────┐         │
//! │  │  transport   │   │   convert    │   │    locate    │         │
//! │  │ (URL / HTTP) │   │  (PERFILE2)  │   │ (build ids)  │         │
//! │  └──────┬───────┘   └──────┬───────┘   └──────▲───────┘         │
//! │         └────── profile ───┴─── validate ─────┘                 │
//! │                         │ scale                                 │
//! │                         ▼                                       │
//! │                ┌──────────────────┐                             │
//! │                │ combine_profiles │ units → batch → aggregate   │
//! │                └────────┬─────────┘                             │
//! └─────────────────────────┼───────────────────────────────────────┘
//!                           ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  symbolize → remove_uninteresting → save (remote only) → check  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Structure
//!
//! ### Pipeline
//!
//! - [`fetch`]: [`ProfileGrabber`](fetch::ProfileGrabber) and the stages it
//!   runs: single-source grab, chunked fan-out, merge and mapping provenance
//! - [`transport`]: URL resolution and HTTP retrieval
//! - [`convert`]: `perf record` detection and conversion
//! - [`locate`]: resolve mappings to local binaries
//! - [`symbolization`]: DWARF symbolization of the merged profile
//! - [`tmpdir`]: scratch directory and saved copies of merged profiles
//!
//! ### Capabilities
//!
//! - [`binutils`]: object inspection ([`ObjTool`](binutils::ObjTool)), `nm`
//!   symbol lookup and `objdump` disassembly
//! - [`ui`]: user messaging ([`Ui`](ui::Ui))
//!
//! ### Configuration and Types
//!
//! - [`config`]: [`FetchConfig`](config::FetchConfig), built once from the
//!   environment at the process boundary
//! - [`domain`]: the [`Source`](domain::Source) descriptor and error types
//! - [`cli`]: command-line argument parsing
//!
//! ## Typical Usage
//!
//! ```bash
//! # Merge heap profiles from two replicas
//! profgrab -o heap.pb.gz host1:6060/debug/pprof/heap host2:6060/debug/pprof/heap
//!
//! # What changed since the last deploy?
//! profgrab --base before.pb.gz --seconds 30 http://host:6060/debug/pprof/profile
//! ```
//!
//! ## Key Concepts
//!
//! - **Baseline**: a profile subtracted from the targets (scale -1)
//! - **Build id**: content hash embedded in a binary; identifies the exact
//!   executable a mapping came from
//! - **Mapping sources**: which remote origins referenced which binary, kept
//!   for later symbolization

pub mod binutils;
pub mod cli;
pub mod config;
pub mod convert;
pub mod domain;
pub mod fetch;
pub mod locate;
pub mod symbolization;
pub mod tmpdir;
pub mod transport;
pub mod ui;
