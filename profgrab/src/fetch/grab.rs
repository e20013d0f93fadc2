//! Single-source retrieval

use std::path::Path;
use std::time::Duration;

use log::debug;
use profgrab_profile::Profile;

use super::sources::MappingSources;
use super::ProfileGrabber;
use crate::convert::profile_proto_reader;
use crate::domain::{FetchError, Source};
use crate::locate::locate_binaries;
use crate::transport::{adjust_url, fetch_url};

/// A profile produced by a [`Fetcher`].
#[derive(Debug, Clone)]
pub struct FetchedProfile {
    pub profile: Profile,
    /// Where the profile came from. `Some` marks the fetch as remote.
    pub origin: Option<String>,
}

/// Replacement for the built-in HTTP / file retrieval.
///
/// Returning `Ok(None)` defers to the built-in retrieval for that source.
pub trait Fetcher: Send + Sync {
    /// # Errors
    /// An error fails this one source.
    fn fetch(
        &self,
        source: &str,
        duration: Duration,
        timeout: Duration,
    ) -> anyhow::Result<Option<FetchedProfile>>;
}

/// Outcome of one successful fetch unit.
#[derive(Debug, Clone)]
pub struct Grabbed {
    pub profile: Profile,
    pub sources: MappingSources,
    pub remote: bool,
}

impl ProfileGrabber {
    /// Fetch, validate and scale the profile at `addr`, then resolve its
    /// binaries against the local search path.
    ///
    /// # Errors
    /// Any error is attributable to `addr` alone.
    pub fn grab_profile(
        &self,
        source: &Source,
        addr: &str,
        scale: f64,
        tmp_dir: &Path,
    ) -> Result<Grabbed, FetchError> {
        let overridden = match &self.fetcher {
            Some(fetcher) => fetcher
                .fetch(addr, source.duration, source.timeout)
                .map_err(FetchError::Override)?,
            None => None,
        };
        let FetchedProfile { mut profile, origin } = match overridden {
            Some(fetched) => fetched,
            None => self.fetch(addr, source.duration, source.timeout, tmp_dir)?,
        };

        profile.check_valid()?;
        profile.scale(scale);

        locate_binaries(
            &mut profile,
            source,
            &self.config.binary_search_path,
            self.obj.as_ref(),
            self.ui.as_ref(),
        );

        let (sources, remote) = match origin {
            Some(origin) => (MappingSources::collect(&mut profile, &origin), true),
            None => (MappingSources::default(), false),
        };

        Ok(Grabbed { profile, sources, remote })
    }

    /// Built-in retrieval: HTTP for URLs, the local file system otherwise.
    fn fetch(
        &self,
        addr: &str,
        duration: Duration,
        timeout: Duration,
        tmp_dir: &Path,
    ) -> Result<FetchedProfile, FetchError> {
        if let Some(resolved) = adjust_url(addr, duration, timeout) {
            self.ui.print(&format!("Fetching profile over HTTP from {}", resolved.url));
            if duration > Duration::ZERO {
                self.ui.print(&format!("Please wait... ({duration:?})"));
            }
            let body = fetch_url(&resolved.url, resolved.timeout)?;
            let profile = Profile::parse(&body)?;
            return Ok(FetchedProfile { profile, origin: Some(resolved.url.to_string()) });
        }

        debug!("reading local profile {addr}");
        let reader = profile_proto_reader(
            Path::new(addr),
            &self.config.perf_converter,
            tmp_dir,
            self.ui.as_ref(),
        )?;
        if let Some(converted) = reader.converted_path() {
            debug!("{addr} converted to {}", converted.display());
        }
        let profile = Profile::parse_reader(reader)?;
        Ok(FetchedProfile { profile, origin: None })
    }
}
