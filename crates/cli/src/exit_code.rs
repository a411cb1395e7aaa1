//! Process exit codes

/// Exit codes returned by publish-artifacts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Every upload succeeded
    Success = 0,
    /// At least one upload failed, or the step output could not be written
    GeneralError = 1,
    /// Missing or invalid configuration; nothing was uploaded
    UsageError = 2,
}

impl ExitCode {
    pub fn code(self) -> i32 {
        self as i32
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        std::process::ExitCode::from(code.code() as u8)
    }
}
