//! User messaging capability

use log::{info, warn};

/// Fire-and-forget sink for user-facing messages.
///
/// Shared by every fetch worker of a batch, so implementations must be
/// callable from several threads at once.
pub trait Ui: Send + Sync {
    fn print(&self, msg: &str);
    fn print_err(&self, msg: &str);
}

/// Writes to the terminal and mirrors every message to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalUi {
    pub quiet: bool,
}

impl Ui for TerminalUi {
    fn print(&self, msg: &str) {
        info!("{msg}");
        if !self.quiet {
            println!("{msg}");
        }
    }

    fn print_err(&self, msg: &str) {
        warn!("{msg}");
        eprintln!("{msg}");
    }
}

/// Records messages instead of printing them.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct RecordingUi {
    pub out: std::sync::Mutex<Vec<String>>,
    pub err: std::sync::Mutex<Vec<String>>,
}

#[cfg(test)]
impl RecordingUi {
    pub fn errors(&self) -> Vec<String> {
        self.err.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.out.lock().map(|o| o.clone()).unwrap_or_default()
    }
}

#[cfg(test)]
impl Ui for RecordingUi {
    fn print(&self, msg: &str) {
        if let Ok(mut out) = self.out.lock() {
            out.push(msg.to_string());
        }
    }

    fn print_err(&self, msg: &str) {
        if let Ok(mut err) = self.err.lock() {
            err.push(msg.to_string());
        }
    }
}
