use std::path::Path;
use std::process::Command;

use profgrab::binutils::{Binutils, ObjTool};
use profgrab::symbolization::Symbolizer;
use regex::Regex;

fn have_nm() -> bool {
    Command::new("nm").arg("--version").output().is_ok_and(|o| o.status.success())
}

#[test]
fn test_symbolizer_creation() {
    let binary_path = env!("CARGO_BIN_EXE_profgrab");

    let symbolizer = Symbolizer::new(binary_path);
    assert!(symbolizer.is_ok(), "Failed to create symbolizer: {:?}", symbolizer.err());
}

#[test]
fn test_symbolizer_resolves_text_symbols() {
    if !have_nm() {
        eprintln!("nm not available, skipping");
        return;
    }
    let binary_path = env!("CARGO_BIN_EXE_profgrab");
    let symbolizer = Symbolizer::new(binary_path).unwrap();

    let output = Command::new("nm").args(["-n", binary_path]).output().unwrap();
    let listing = String::from_utf8_lossy(&output.stdout);

    let mut resolved_any = false;
    for line in listing.lines().filter(|l| l.contains(" T ")).take(20) {
        let Some(addr) = line.split_whitespace().next().and_then(|a| u64::from_str_radix(a, 16).ok())
        else {
            continue;
        };
        if symbolizer.resolve(addr).iter().any(|f| !f.name.is_empty()) {
            resolved_any = true;
            break;
        }
    }

    assert!(resolved_any, "no text symbol of {binary_path} resolved to a function");
}

#[test]
fn test_binutils_opens_own_binary() {
    let binary_path = Path::new(env!("CARGO_BIN_EXE_profgrab"));

    let file = Binutils::default().open(binary_path, 0, 0, 0).unwrap();

    assert_eq!(file.name(), binary_path);
    assert_eq!(file.base(), 0);
    assert!(file.build_id().chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn test_binutils_finds_main_by_pattern() {
    if !have_nm() {
        eprintln!("nm not available, skipping");
        return;
    }
    let binary_path = Path::new(env!("CARGO_BIN_EXE_profgrab"));
    let file = Binutils::default().open(binary_path, 0, 0, 0).unwrap();

    let pattern = Regex::new("^main$").unwrap();
    let syms = file.symbols(Some(&pattern), 0).unwrap();

    assert!(syms.iter().any(|s| s.names.iter().any(|n| n == "main")));
    assert!(syms.iter().all(|s| s.start <= s.end));
}
