//! Process exit codes for the `toolrun` binary.
//!
//! # Exit Code Table
//!
//! | Code | Constant | Description |
//! |------|----------|-------------|
//! | 0 | `SUCCESS` | Operation completed successfully |
//! | 1 | `INTERNAL` | General/internal failure |
//! | 2 | `CLI_ARGS` | Invalid CLI arguments or configuration |
//! | 3 | `VALIDATION` | Invocation is missing a required argument |
//! | 10 | `TIMEOUT` | Tool exceeded the configured timeout |
//! | 70 | `TOOL_FAILURE` | Tool exited unsuccessfully |
//! | 126 | `PERMISSION_DENIED` | Tool could not be executed |
//! | 127 | `LAUNCH_FAILURE` | Tool could not be started |
//! | 130 | `CANCELLED` | Run was interrupted |

/// Exit codes matching the table above.
///
/// ```rust
/// use toolrun::ExitCode;
///
/// assert_eq!(ExitCode::SUCCESS.as_i32(), 0);
/// assert_eq!(ExitCode::TOOL_FAILURE, ExitCode::from_i32(70));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(i32);

impl ExitCode {
    /// Success - operation completed successfully
    pub const SUCCESS: ExitCode = ExitCode(0);

    /// Internal error - general failure
    pub const INTERNAL: ExitCode = ExitCode(1);

    /// CLI arguments error - invalid flags or configuration
    pub const CLI_ARGS: ExitCode = ExitCode(2);

    /// Validation error - a required argument has no value
    pub const VALIDATION: ExitCode = ExitCode(3);

    /// Timeout - the tool ran longer than allowed and was terminated
    pub const TIMEOUT: ExitCode = ExitCode(10);

    /// Tool failure - the tool exited with a nonzero status or a signal
    pub const TOOL_FAILURE: ExitCode = ExitCode(70);

    /// Permission denied - the executable exists but cannot be run
    pub const PERMISSION_DENIED: ExitCode = ExitCode(126);

    /// Launch failure - the executable could not be started
    pub const LAUNCH_FAILURE: ExitCode = ExitCode(127);

    /// Cancelled - interrupted by the user
    pub const CANCELLED: ExitCode = ExitCode(130);

    /// Numeric value for `std::process::exit()`.
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0
    }

    #[must_use]
    pub const fn from_i32(code: i32) -> Self {
        ExitCode(code)
    }
}

impl From<i32> for ExitCode {
    fn from(code: i32) -> Self {
        ExitCode(code)
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_values() {
        assert_eq!(ExitCode::SUCCESS.as_i32(), 0);
        assert_eq!(ExitCode::INTERNAL.as_i32(), 1);
        assert_eq!(ExitCode::CLI_ARGS.as_i32(), 2);
        assert_eq!(ExitCode::VALIDATION.as_i32(), 3);
        assert_eq!(ExitCode::TIMEOUT.as_i32(), 10);
        assert_eq!(ExitCode::TOOL_FAILURE.as_i32(), 70);
        assert_eq!(ExitCode::PERMISSION_DENIED.as_i32(), 126);
        assert_eq!(ExitCode::LAUNCH_FAILURE.as_i32(), 127);
        assert_eq!(ExitCode::CANCELLED.as_i32(), 130);
    }

    #[test]
    fn test_conversions() {
        assert_eq!(ExitCode::from(70), ExitCode::TOOL_FAILURE);
        assert_eq!(i32::from(ExitCode::CANCELLED), 130);
    }
}
