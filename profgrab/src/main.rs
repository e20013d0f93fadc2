//! # profgrab - Main Entry Point
//!
//! Reads the environment once into a [`FetchConfig`], fetches and merges the
//! requested sources, and optionally writes the merged profile and the mapping
//! provenance of remote sources.

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use std::fs::File;
use std::io::BufWriter;
use std::sync::Arc;

use profgrab::binutils::Binutils;
use profgrab::cli::Args;
use profgrab::config::FetchConfig;
use profgrab::domain::GrabError;
use profgrab::fetch::ProfileGrabber;
use profgrab::ui::TerminalUi;

// Exit codes
const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_NOPROFILES: i32 = 3;

fn main() {
    env_logger::init();
    std::process::exit(match run() {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            let code = exit_code_for(&e);
            eprintln!("error: {e:#}");
            code
        }
    });
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<GrabError>() {
        Some(GrabError::NoProfiles) => EXIT_NOPROFILES,
        _ => EXIT_ERROR,
    }
}

fn run() -> Result<()> {
    let args = Args::parse();
    let quiet = args.quiet;

    let config = FetchConfig::from_env();
    info!(
        "binary search path: {:?}, converter: {}",
        config.binary_search_path,
        config.perf_converter.display()
    );

    let grabber =
        ProfileGrabber::new(config, Box::new(Binutils::default()), Arc::new(TerminalUi { quiet }));
    let report = grabber.fetch_profiles(&args.source())?;

    if !quiet {
        println!("profgrab v{}", env!("CARGO_PKG_VERSION"));
        println!("fetched: {}/{}", report.fetched, report.requested);
        println!("samples: {}", report.profile.samples.len());
        for (i, st) in report.profile.sample_types.iter().enumerate() {
            println!("total {st}: {}", report.profile.total(i));
        }
    }

    if let Some(ref output) = args.output {
        let file = File::create(output)
            .with_context(|| format!("Failed to create {}", output.display()))?;
        report
            .profile
            .write(BufWriter::new(file))
            .with_context(|| format!("Failed to write profile to {}", output.display()))?;
        if !quiet {
            println!("saved: {}", output.display());
        }
    }

    if let Some(ref path) = args.provenance {
        let file = File::create(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &report.sources)
            .context("Failed to write mapping provenance")?;
        if !quiet {
            println!("provenance: {}", path.display());
        }
    }

    Ok(())
}
