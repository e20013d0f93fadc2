#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use profgrab::binutils::{Inst, ObjFile, ObjTool};
use profgrab::config::FetchConfig;
use profgrab::fetch::{FetchedProfile, Fetcher, ProfileGrabber};
use profgrab::ui::Ui;
use profgrab_profile::{Function, Line, Location, Mapping, Profile, Sample, ValueType};

/// `main` → `work` CPU profile with every value multiplied by `weight`.
pub fn cpu_profile(weight: i64, build_id: &str) -> Profile {
    Profile {
        sample_types: vec![ValueType::new("samples", "count"), ValueType::new("cpu", "nanoseconds")],
        samples: vec![
            Sample { location_ids: vec![1, 2], values: vec![2 * weight, 100 * weight], labels: vec![] },
            Sample { location_ids: vec![2], values: vec![weight, 50 * weight], labels: vec![] },
        ],
        mappings: vec![Mapping {
            id: 1,
            start: 0x40_0000,
            limit: 0x48_0000,
            file: "/remote/bin/server".to_string(),
            build_id: build_id.to_string(),
            has_functions: true,
            ..Mapping::default()
        }],
        locations: vec![
            Location {
                id: 1,
                mapping_id: 1,
                address: 0x40_1100,
                lines: vec![Line { function_id: 2, line: 12 }],
                is_folded: false,
            },
            Location {
                id: 2,
                mapping_id: 1,
                address: 0x40_1200,
                lines: vec![Line { function_id: 1, line: 30 }],
                is_folded: false,
            },
        ],
        functions: vec![
            Function { id: 1, name: "main".into(), system_name: "main".into(), filename: "main.c".into(), start_line: 28 },
            Function { id: 2, name: "work".into(), system_name: "work".into(), filename: "work.c".into(), start_line: 10 },
        ],
        duration_nanos: 10_000_000_000,
        time_nanos: 1_700_000_000_000_000_000,
        period_type: Some(ValueType::new("cpu", "nanoseconds")),
        period: 10_000_000,
        ..Profile::default()
    }
}

pub fn heap_profile() -> Profile {
    Profile {
        sample_types: vec![ValueType::new("alloc_objects", "count"), ValueType::new("alloc_space", "bytes")],
        samples: vec![Sample { values: vec![1, 4096], ..Sample::default() }],
        ..Profile::default()
    }
}

#[derive(Default)]
pub struct RecordingUi {
    out: Mutex<Vec<String>>,
    err: Mutex<Vec<String>>,
}

impl RecordingUi {
    pub fn messages(&self) -> Vec<String> {
        self.out.lock().unwrap().clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.err.lock().unwrap().clone()
    }
}

impl Ui for RecordingUi {
    fn print(&self, msg: &str) {
        self.out.lock().unwrap().push(msg.to_string());
    }

    fn print_err(&self, msg: &str) {
        self.err.lock().unwrap().push(msg.to_string());
    }
}

/// Object tool that can't open anything.
pub struct NoObjects;

impl ObjTool for NoObjects {
    fn open(&self, path: &Path, _: u64, _: u64, _: u64) -> Result<Box<dyn ObjFile>> {
        bail!("{} is not an object", path.display())
    }

    fn disassemble(&self, _: &Path, _: u64, _: u64) -> Result<Vec<Inst>> {
        Ok(Vec::new())
    }
}

/// What a [`MapFetcher`] does for one address.
#[derive(Clone)]
pub enum Canned {
    Local(Profile),
    Remote(Profile, String),
    Fail(String),
}

/// Serves canned results by address; unknown addresses fall through to the
/// built-in retrieval. Tracks peak concurrency.
#[derive(Default)]
pub struct MapFetcher {
    pub canned: HashMap<String, Canned>,
    pub delay: Duration,
    pub in_flight: AtomicUsize,
    pub peak: Arc<AtomicUsize>,
}

impl MapFetcher {
    pub fn with(mut self, addr: impl Into<String>, canned: Canned) -> Self {
        self.canned.insert(addr.into(), canned);
        self
    }
}

impl Fetcher for MapFetcher {
    fn fetch(
        &self,
        source: &str,
        _duration: Duration,
        _timeout: Duration,
    ) -> Result<Option<FetchedProfile>> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match self.canned.get(source) {
            None => Ok(None),
            Some(Canned::Local(p)) => Ok(Some(FetchedProfile { profile: p.clone(), origin: None })),
            Some(Canned::Remote(p, origin)) => {
                Ok(Some(FetchedProfile { profile: p.clone(), origin: Some(origin.clone()) }))
            }
            Some(Canned::Fail(msg)) => Err(anyhow!("{msg}")),
        }
    }
}

pub fn config(tmp_dir: &Path) -> FetchConfig {
    FetchConfig {
        tmp_dir: Some(tmp_dir.to_path_buf()),
        home_dir: None,
        binary_search_path: Vec::<PathBuf>::new(),
        ..FetchConfig::default()
    }
}

pub fn grabber(config: FetchConfig, ui: Arc<RecordingUi>) -> ProfileGrabber {
    ProfileGrabber::new(config, Box::new(NoObjects), ui)
}
