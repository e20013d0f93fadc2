//! Disassembly through `objdump -d -l`

use std::path::Path;
use std::process::Command;
use std::sync::OnceLock;

use anyhow::{bail, Context, Result};
use regex::Regex;

use super::Inst;

struct Patterns {
    asm: Regex,
    file_line: Regex,
    function: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        asm: Regex::new(r"^\s*([[:xdigit:]]+):\s+(.*)").expect("Failed to compile asm regex"),
        file_line: Regex::new(r"^;?\s?(.*):([0-9]+)").expect("Failed to compile file:line regex"),
        function: Regex::new(r"^;?\s?(\S.*)\(\):").expect("Failed to compile function regex"),
    })
}

/// Disassemble `[start, end]` of `object` with `objdump`.
///
/// # Errors
/// Returns an error if `objdump` can't be run or exits unsuccessfully.
pub fn disassemble(objdump: &Path, object: &Path, start: u64, end: u64) -> Result<Vec<Inst>> {
    let output = Command::new(objdump)
        .args(["-d", "-C", "--no-show-raw-insn", "-l"])
        .arg(format!("--start-address={start:#x}"))
        .arg(format!("--stop-address={end:#x}"))
        .arg(object)
        .output()
        .with_context(|| format!("Failed to run {}", objdump.display()))?;
    if !output.status.success() {
        bail!(
            "{} {}: {}",
            objdump.display(),
            object.display(),
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    Ok(parse_disassembly(&String::from_utf8_lossy(&output.stdout)))
}

/// Parse `objdump -d -l` output.
///
/// Instruction lines inherit the most recent `function():` and `file:line`
/// context. Any other line clears that context.
#[must_use]
pub fn parse_disassembly(listing: &str) -> Vec<Inst> {
    let re = patterns();
    let mut function = String::new();
    let mut file = String::new();
    let mut line = 0u32;
    let mut insts = Vec::new();

    for input in listing.lines().map(str::trim) {
        if let Some(caps) = re.asm.captures(input) {
            if let Ok(addr) = u64::from_str_radix(&caps[1], 16) {
                insts.push(Inst {
                    addr,
                    text: caps[2].to_string(),
                    function: function.clone(),
                    file: file.clone(),
                    line,
                });
                continue;
            }
        }
        if let Some(caps) = re.file_line.captures(input) {
            if let Ok(l) = caps[2].parse::<u32>() {
                file = caps[1].to_string();
                line = l;
            }
            continue;
        }
        if let Some(caps) = re.function.captures(input) {
            function = caps[1].to_string();
            continue;
        }
        function.clear();
        file.clear();
        line = 0;
    }

    insts
}
