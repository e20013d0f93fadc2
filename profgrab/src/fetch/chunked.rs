//! Bounded fan-out over many sources
//!
//! Units are processed in batches of `chunk_size`. Within a batch every unit
//! gets its own scoped thread and the batch is joined completely before any
//! result is looked at. Results are folded in input order, never completion
//! order, so mapping provenance is reproducible.

use std::path::Path;
use std::thread;

use log::debug;
use profgrab_profile::Profile;

use super::combine::combine_profiles;
use super::grab::Grabbed;
use super::sources::MappingSources;
use super::{ProfileGrabber, SourceFailure};
use crate::domain::{FetchError, GrabError, Source};

/// One address to fetch and the weight its samples get.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchUnit {
    pub addr: String,
    /// `1.0` for targets, `-1.0` for baselines.
    pub scale: f64,
}

impl FetchUnit {
    #[must_use]
    pub fn target(addr: impl Into<String>) -> Self {
        Self { addr: addr.into(), scale: 1.0 }
    }

    #[must_use]
    pub fn baseline(addr: impl Into<String>) -> Self {
        Self { addr: addr.into(), scale: -1.0 }
    }
}

/// Running result of a chunked grab.
#[derive(Debug, Default)]
pub struct Aggregate {
    pub profile: Option<Profile>,
    pub sources: MappingSources,
    /// At least one unit was fetched from a remote origin.
    pub save: bool,
    pub count: usize,
    pub failures: Vec<SourceFailure>,
}

impl ProfileGrabber {
    /// Fetch every unit and fold the results into one profile.
    ///
    /// Per-unit failures are reported through the UI and collected in
    /// [`Aggregate::failures`]. A failure to combine fetched profiles aborts
    /// the whole grab.
    ///
    /// # Errors
    /// Returns [`GrabError::Merge`] if fetched profiles can't be combined.
    pub fn chunked_grab(
        &self,
        source: &Source,
        units: &[FetchUnit],
        tmp_dir: &Path,
    ) -> Result<Aggregate, GrabError> {
        let mut agg = Aggregate::default();

        for (i, chunk) in units.chunks(self.config.chunk_size.max(1)).enumerate() {
            debug!("fetching batch {i} ({} sources)", chunk.len());
            let batch = self.concurrent_grab(source, chunk, tmp_dir)?;
            agg.failures.extend(batch.failures);

            let Some(batch_profile) = batch.profile else {
                continue;
            };
            agg.save |= batch.save;
            agg.count += batch.count;

            match agg.profile.take() {
                None => {
                    agg.profile = Some(batch_profile);
                    agg.sources = batch.sources;
                }
                Some(running) => {
                    let (p, ms) = combine_profiles(
                        vec![running, batch_profile],
                        vec![std::mem::take(&mut agg.sources), batch.sources],
                    )
                    .map_err(GrabError::Merge)?;
                    agg.profile = Some(p);
                    agg.sources = ms;
                }
            }
        }

        Ok(agg)
    }

    fn concurrent_grab(
        &self,
        source: &Source,
        chunk: &[FetchUnit],
        tmp_dir: &Path,
    ) -> Result<Aggregate, GrabError> {
        let results: Vec<Result<Grabbed, FetchError>> = thread::scope(|scope| {
            let handles: Vec<_> = chunk
                .iter()
                .enumerate()
                .map(|(i, unit)| {
                    thread::Builder::new()
                        .name(format!("profgrab-fetch-{i}"))
                        .spawn_scoped(scope, move || {
                            self.grab_profile(source, &unit.addr, unit.scale, tmp_dir)
                        })
                })
                .collect();

            handles
                .into_iter()
                .map(|spawned| match spawned {
                    Ok(handle) => handle.join().unwrap_or(Err(FetchError::WorkerPanicked)),
                    Err(e) => Err(FetchError::Io(e)),
                })
                .collect()
        });

        let mut batch = Aggregate::default();
        let mut profiles = Vec::new();
        let mut sources = Vec::new();

        for (unit, result) in chunk.iter().zip(results) {
            match result {
                Ok(grabbed) => {
                    batch.save |= grabbed.remote;
                    profiles.push(grabbed.profile);
                    sources.push(grabbed.sources);
                }
                Err(error) => {
                    self.ui.print_err(&format!("{}: {error}", unit.addr));
                    batch.failures.push(SourceFailure { addr: unit.addr.clone(), error });
                }
            }
        }

        if profiles.is_empty() {
            return Ok(batch);
        }

        batch.count = profiles.len();
        let (p, ms) = combine_profiles(profiles, sources).map_err(GrabError::Merge)?;
        batch.profile = Some(p);
        batch.sources = ms;
        Ok(batch)
    }
}
