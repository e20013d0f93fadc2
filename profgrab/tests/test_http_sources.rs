mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{config, cpu_profile, grabber, RecordingUi};
use httpmock::prelude::*;
use profgrab::domain::{FetchError, Source};
use profgrab_profile::Profile;

fn gzipped(p: &Profile) -> Vec<u8> {
    let mut buf = Vec::new();
    p.write(&mut buf).unwrap();
    buf
}

#[test]
fn test_http_source_is_fetched_recorded_and_saved() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET).path("/debug/pprof/profile").query_param("seconds", "3");
        then.status(200).body(gzipped(&cpu_profile(1, "abc123")));
    });

    let dir = tempfile::tempdir().unwrap();
    let ui = Arc::new(RecordingUi::default());
    let g = grabber(config(dir.path()), ui.clone());

    let src = Source {
        sources: vec![format!("{}/debug/pprof/profile", server.address())],
        duration: Duration::from_secs(3),
        ..Source::default()
    };
    let report = g.fetch_profiles(&src).unwrap();

    mock.assert();
    assert_eq!(report.fetched, 1);
    assert_eq!(report.profile.total(1), 150);

    let origin = format!("http://{}/debug/pprof/profile?seconds=3", server.address());
    let recorded = report.sources.get("abc123").unwrap();
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].source, origin);
    assert_eq!(recorded[0].start, 0x40_0000);

    assert!(ui.messages().contains(&format!("Fetching profile over HTTP from {origin}")));
    assert!(ui.messages().contains(&"Please wait... (3s)".to_string()));

    let saved = report.saved.unwrap();
    assert_eq!(saved, dir.path().join("pprof.server.samples.cpu.001.pb.gz"));
    assert!(saved.exists());
}

#[test]
fn test_http_error_status_fails_only_that_source() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/good");
        then.status(200).body(gzipped(&cpu_profile(2, "")));
    });
    server.mock(|when, then| {
        when.method(GET).path("/gone");
        then.status(404);
    });

    let dir = tempfile::tempdir().unwrap();
    let ui = Arc::new(RecordingUi::default());
    let g = grabber(config(dir.path()), ui.clone());

    let src = Source {
        sources: vec![server.url("/good"), server.url("/gone")],
        ..Source::default()
    };
    let report = g.fetch_profiles(&src).unwrap();

    assert_eq!(report.fetched, 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].addr, server.url("/gone"));
    assert!(matches!(report.failures[0].error, FetchError::Status(_)));
    assert_eq!(report.profile.total(1), 300);
    assert!(ui.errors().contains(&"fetched 1 profiles out of 2".to_string()));
}

#[test]
fn test_local_and_remote_sources_merge() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/heap");
        then.status(200).body(gzipped(&cpu_profile(1, "")));
    });

    let dir = tempfile::tempdir().unwrap();
    let local = dir.path().join("local.pb.gz");
    cpu_profile(4, "").write(std::fs::File::create(&local).unwrap()).unwrap();

    let g = grabber(config(dir.path()), Arc::new(RecordingUi::default()));
    let src = Source {
        sources: vec![local.to_str().unwrap().to_string()],
        base: vec![server.url("/heap")],
        ..Source::default()
    };
    let report = g.fetch_profiles(&src).unwrap();

    assert_eq!(report.fetched, 2);
    assert_eq!(report.profile.total(1), 150 * 3);
    // any remote fetch triggers a save
    assert!(report.saved.is_some());
}

#[test]
fn test_seconds_in_url_alone_does_not_prompt_to_wait() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/debug/pprof/profile").query_param("seconds", "2");
        then.status(200).body(gzipped(&cpu_profile(1, "")));
    });

    let dir = tempfile::tempdir().unwrap();
    let ui = Arc::new(RecordingUi::default());
    let g = grabber(config(dir.path()), ui.clone());

    let src = Source {
        sources: vec![server.url("/debug/pprof/profile?seconds=2")],
        ..Source::default()
    };
    let report = g.fetch_profiles(&src).unwrap();

    assert_eq!(report.fetched, 1);
    assert!(ui.messages().iter().any(|m| m.starts_with("Fetching profile over HTTP from ")));
    assert!(!ui.messages().iter().any(|m| m.starts_with("Please wait")));
}
