//! Output handling
//!
//! Human-readable output goes through styled tables; `--json` switches every
//! command to strict JSON on stdout. Logs and progress always use stderr.

mod formatter;

pub use formatter::Formatter;

/// Output settings shared by all commands
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputConfig {
    pub json: bool,
    pub no_color: bool,
    pub quiet: bool,
}
