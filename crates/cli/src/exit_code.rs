//! Process exit codes

use ghstat_core::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,
    GeneralError = 1,
    UsageError = 2,
    AuthError = 3,
    NotFound = 4,
    /// Rate limited, unavailable, transport failure or open circuit
    NetworkError = 5,
    /// Interrupted by the user (128 + SIGINT)
    Cancelled = 130,
}

impl ExitCode {
    pub fn from_error(error: &Error) -> Self {
        match error {
            Error::Cancelled => ExitCode::Cancelled,
            Error::Auth(_) => ExitCode::AuthError,
            Error::NotFound(_) => ExitCode::NotFound,
            Error::RateLimited { .. }
            | Error::Unavailable(_)
            | Error::Network(_)
            | Error::CircuitOpen { .. } => ExitCode::NetworkError,
            Error::Config(_) => ExitCode::UsageError,
            Error::Api { .. } | Error::Decode { .. } | Error::Io(_) | Error::Serde(_) => {
                ExitCode::GeneralError
            }
        }
    }

    pub fn code(self) -> i32 {
        self as i32
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        std::process::ExitCode::from(code.code() as u8)
    }
}
