//! Exit codes for the `tw` CLI.
//!
//! Exit codes communicate the run outcome without output parsing:
//! - 0: clean run (input EOF or user quit)
//! - 10-19: user/environment errors (recoverable by user action)
//! - 20-29: internal errors

/// Exit codes for `tw` runs.
///
/// These are a stable contract for scripts wrapping the tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Clean run: input EOF or user quit.
    Clean = 0,

    /// Invalid arguments or configuration.
    ArgsError = 10,

    /// Input could not be opened (missing file, TTY stdin with no --in).
    InputError = 11,

    /// Fatal ingest error (replay without timestamps, broken record stream,
    /// mid-stream read failure).
    IngestError = 12,

    /// Internal error (bug - please report).
    InternalError = 20,

    /// IO error during terminal setup or teardown.
    IoError = 21,
}

impl ExitCode {
    /// Convert to i32 for process exit.
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// True for user/environment errors (codes 10-19).
    pub fn is_user_error(self) -> bool {
        (10..20).contains(&(self as i32))
    }

    /// True for internal errors (codes 20+).
    pub fn is_internal_error(self) -> bool {
        (self as i32) >= 20
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}
