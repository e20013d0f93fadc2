//! Symbol lookup through `nm -n`

use std::path::Path;
use std::process::Command;
use std::sync::OnceLock;

use anyhow::{bail, Context, Result};
use regex::Regex;
use rustc_demangle::try_demangle;

use super::Sym;

fn nm_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*([[:xdigit:]]+)\s+(.)\s+(.*)").expect("Failed to compile nm regex")
    })
}

/// Run `nm -n object` and select symbols from its output.
///
/// # Errors
/// Returns an error if `nm` can't be run or exits unsuccessfully.
pub fn find_symbols(
    nm: &Path,
    object: &Path,
    pattern: Option<&Regex>,
    address: u64,
) -> Result<Vec<Sym>> {
    let output = Command::new(nm)
        .arg("-n")
        .arg(object)
        .output()
        .with_context(|| format!("Failed to run {}", nm.display()))?;
    if !output.status.success() {
        bail!(
            "{} {}: {}",
            nm.display(),
            object.display(),
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    Ok(select_symbols(
        &String::from_utf8_lossy(&output.stdout),
        &object.to_string_lossy(),
        pattern,
        address,
    ))
}

/// Group address-sorted `nm` output by address and select the groups that
/// contain `address` or have a name matching `pattern`.
///
/// A group spans up to the address of the next group, so the final group
/// has no known end and is never selected.
pub fn select_symbols(
    listing: &str,
    file: &str,
    pattern: Option<&Regex>,
    address: u64,
) -> Vec<Sym> {
    let mut symbols = Vec::new();
    let mut names: Vec<String> = Vec::new();
    let mut start = 0u64;

    for (addr, name) in listing.lines().filter_map(parse_line) {
        if addr == start {
            names.push(name);
            continue;
        }
        let end = addr.saturating_sub(1);
        if let Some(selected) = match_symbol(&names, start, end, pattern, address) {
            symbols.push(Sym { names: selected, file: file.to_string(), start, end });
        }
        names = vec![name];
        start = addr;
    }

    symbols
}

fn parse_line(line: &str) -> Option<(u64, String)> {
    let caps = nm_line().captures(line)?;
    let addr = u64::from_str_radix(&caps[1], 16).ok()?;
    Some((addr, caps[3].to_string()))
}

fn match_symbol(
    names: &[String],
    start: u64,
    end: u64,
    pattern: Option<&Regex>,
    address: u64,
) -> Option<Vec<String>> {
    if names.is_empty() {
        return None;
    }
    if address != 0 && (start..=end).contains(&address) {
        return Some(names.to_vec());
    }
    for name in names {
        let Some(re) = pattern else {
            return Some(vec![name.clone()]);
        };
        if re.is_match(name) {
            return Some(vec![name.clone()]);
        }
        if let Ok(demangled) = try_demangle(name) {
            let demangled = format!("{demangled:#}");
            if re.is_match(&demangled) {
                return Some(vec![demangled]);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = "\
                 w __gmon_start__
0000000000001000 t lineA001
0000000000001000 t lineA002
0000000000001000 t line1000
0000000000002000 t line200A
0000000000002000 t line2000
0000000000002000 t line200B
0000000000003000 t line3000
0000000000003000 T _ZN4core3fmt5write17h0123456789abcdefE
0000000000003000 t lineB00C
0000000000003000 t line300D
0000000000004000 t _the_end
";

    fn re(s: &str) -> Regex {
        Regex::new(s).unwrap()
    }

    #[test]
    fn test_pattern_selects_first_matching_name_per_group() {
        let syms = select_symbols(LISTING, "object.o", Some(&re("line.*[AC]")), 0);
        let got: Vec<_> = syms.iter().map(|s| (s.names.clone(), s.start, s.end)).collect();
        assert_eq!(
            got,
            vec![
                (vec!["lineA001".to_string()], 0x1000, 0x1fff),
                (vec!["line200A".to_string()], 0x2000, 0x2fff),
                (vec!["lineB00C".to_string()], 0x3000, 0x3fff),
            ]
        );
        assert!(syms.iter().all(|s| s.file == "object.o"));
    }

    #[test]
    fn test_pattern_matches_demangled_name() {
        let syms = select_symbols(LISTING, "object.o", Some(&re("core::fmt::write")), 0);
        assert_eq!(syms.len(), 1);
        assert_eq!(syms[0].names, vec!["core::fmt::write".to_string()]);
        assert_eq!((syms[0].start, syms[0].end), (0x3000, 0x3fff));
    }

    #[test]
    fn test_address_selects_whole_group() {
        let syms = select_symbols(LISTING, "object.o", Some(&re("^nomatch$")), 0x2abc);
        assert_eq!(syms.len(), 1);
        assert_eq!(syms[0].names, vec!["line200A", "line2000", "line200B"]);
    }

    #[test]
    fn test_last_group_is_never_selected() {
        let syms = select_symbols(LISTING, "object.o", Some(&re("the_end")), 0);
        assert!(syms.is_empty());
    }

    #[test]
    fn test_no_pattern_selects_every_bounded_group() {
        let syms = select_symbols(LISTING, "object.o", None, 0);
        assert_eq!(syms.len(), 3);
        assert_eq!(syms[1].names, vec!["line200A".to_string()]);
    }

    #[cfg(unix)]
    #[test]
    fn test_missing_nm_is_error() {
        let err = find_symbols(
            Path::new("/definitely/not/nm"),
            Path::new("object.o"),
            None,
            0,
        );
        assert!(err.is_err());
    }
}
