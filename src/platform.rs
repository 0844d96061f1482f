use std::process;

use chunkagg::{AggError, ErrorKind};

/// Standard Unix exit codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success = 0,
    GeneralError = 1,
    InvalidUsage = 2,
}

impl ExitCode {
    pub fn exit(self) -> ! {
        process::exit(self as i32)
    }

    /// Configuration mistakes are usage errors; everything else is a runtime failure
    pub fn for_error(err: &anyhow::Error) -> Self {
        match err.downcast_ref::<AggError>().map(AggError::kind) {
            Some(ErrorKind::Config) => ExitCode::InvalidUsage,
            _ => ExitCode::GeneralError,
        }
    }
}
