//! # Fetch Pipeline
//!
//! [`ProfileGrabber::fetch_profiles`] turns a [`Source`] descriptor into one
//! merged profile:
//!
//! ```text
//! Source ──▶ units (targets ×1, baselines ×-1)
//!              │
//!              ▼
//!        chunked_grab ──▶ batch 0 ─┐  each unit on its own thread:
//!                         batch 1 ─┤  fetch → validate → scale → locate
//!                         ...     ─┘
//!              │  fold in input order via combine_profiles
//!              ▼
//!        symbolize → remove_uninteresting → save (if remote) → check_valid
//! ```
//!
//! Errors come through two channels. A source that can't be fetched is
//! reported and recorded in [`FetchReport::failures`]; the run goes on.
//! Anything that prevents producing a correct aggregate is a [`GrabError`].

mod chunked;
mod combine;
mod grab;
mod sources;

use std::path::PathBuf;
use std::sync::Arc;

use log::{info, warn};
use profgrab_profile::Profile;
use url::Url;

pub use chunked::{Aggregate, FetchUnit};
pub use combine::combine_profiles;
pub use grab::{FetchedProfile, Fetcher, Grabbed};
pub use sources::{MappingSource, MappingSources};

use crate::binutils::ObjTool;
use crate::config::FetchConfig;
use crate::domain::{FetchError, GrabError, Source};
use crate::symbolization::symbolize;
use crate::tmpdir::{resolve_tmp_dir, save_profile};
use crate::ui::Ui;

/// A source that produced no profile, and why.
#[derive(Debug)]
pub struct SourceFailure {
    pub addr: String,
    pub error: FetchError,
}

/// Result of a successful fetch operation.
#[derive(Debug)]
pub struct FetchReport {
    pub profile: Profile,
    /// Origins of every mapping seen in remote profiles.
    pub sources: MappingSources,
    pub requested: usize,
    pub fetched: usize,
    pub failures: Vec<SourceFailure>,
    /// Where the merged profile was saved, if any source was remote.
    pub saved: Option<PathBuf>,
    pub tmp_dir: PathBuf,
}

/// Fetches and merges profiles according to an explicit configuration.
pub struct ProfileGrabber {
    config: FetchConfig,
    fetcher: Option<Box<dyn Fetcher>>,
    obj: Box<dyn ObjTool>,
    ui: Arc<dyn Ui>,
}

impl ProfileGrabber {
    #[must_use]
    pub fn new(config: FetchConfig, obj: Box<dyn ObjTool>, ui: Arc<dyn Ui>) -> Self {
        Self { config, fetcher: None, obj, ui }
    }

    /// Route every source through `fetcher` before the built-in retrieval.
    #[must_use]
    pub fn with_fetcher(mut self, fetcher: Box<dyn Fetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Fetch every source and baseline of `source` and merge them.
    ///
    /// Sources that fail are reported and skipped. A partial result is still
    /// a success.
    ///
    /// # Errors
    /// Returns an error if no temp directory is usable, no source could be
    /// fetched, fetched profiles can't be merged, or the merged profile fails
    /// validation.
    pub fn fetch_profiles(&self, source: &Source) -> Result<FetchReport, GrabError> {
        let tmp_dir = resolve_tmp_dir(&self.config, self.ui.as_ref())?;

        let units: Vec<FetchUnit> = source
            .sources
            .iter()
            .map(FetchUnit::target)
            .chain(source.base.iter().map(FetchUnit::baseline))
            .collect();

        let agg = self.chunked_grab(source, &units, &tmp_dir)?;
        let Some(mut profile) = agg.profile else {
            return Err(GrabError::NoProfiles);
        };

        let requested = source.requested();
        if agg.count < requested {
            let msg = format!("fetched {} profiles out of {requested}", agg.count);
            warn!("{msg}");
            self.ui.print_err(&msg);
        }

        let symbolized = symbolize(&mut profile, source.symbolize, self.obj.as_ref());
        if symbolized > 0 {
            info!("symbolized {symbolized} locations");
        }

        if let Err(e) = profile.remove_uninteresting() {
            warn!("keeping all frames: {e}");
        }
        unsource_mappings(&mut profile);

        let saved = if agg.save { self.save(&profile, &tmp_dir) } else { None };

        profile.check_valid().map_err(GrabError::Invalid)?;

        Ok(FetchReport {
            profile,
            sources: agg.sources,
            requested,
            fetched: agg.count,
            failures: agg.failures,
            saved,
            tmp_dir,
        })
    }

    fn save(&self, profile: &Profile, dir: &std::path::Path) -> Option<PathBuf> {
        match save_profile(profile, dir) {
            Ok(path) => {
                self.ui.print_err(&format!("Saved profile in {}", path.display()));
                Some(path)
            }
            Err(e) => {
                self.ui.print_err(&format!("Could not save profile: {e:#}"));
                None
            }
        }
    }
}

/// Clear files that [`MappingSources::collect`] set to an origin URL.
fn unsource_mappings(profile: &mut Profile) {
    for m in &mut profile.mappings {
        if m.build_id.is_empty() && Url::parse(&m.file).is_ok() {
            m.file.clear();
        }
    }
}
