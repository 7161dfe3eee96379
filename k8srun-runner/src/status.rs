//! Exit status of a run

use crate::error::RunError;

/// Exit code reported when the runner itself failed
pub const MACHINERY_FAILURE: i32 = 128;

/// Exit code reported for a failed pod that gave no exit code of its own
pub const GENERIC_FAILURE: i32 = 1;

/// Outcome of `Runner::run`
///
/// `error` is set only for machinery failures, in which case `code` is
/// always `MACHINERY_FAILURE`. A pod that exits non-zero yields its own code
/// and no error.
#[derive(Debug)]
pub struct ExitStatus {
    pub code: i32,
    pub error: Option<RunError>,
}

impl ExitStatus {
    /// The pod ran to completion with `code`
    pub fn exited(code: i32) -> Self {
        Self { code, error: None }
    }

    /// The runner failed
    pub fn failed(error: RunError) -> Self {
        Self {
            code: MACHINERY_FAILURE,
            error: Some(error),
        }
    }

    pub fn success(&self) -> bool {
        self.code == 0 && self.error.is_none()
    }

    pub fn into_result(self) -> Result<i32, RunError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.code),
        }
    }
}

impl From<Result<i32, RunError>> for ExitStatus {
    fn from(result: Result<i32, RunError>) -> Self {
        match result {
            Ok(code) => Self::exited(code),
            Err(error) => Self::failed(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_failure_is_not_an_error() {
        let status = ExitStatus::from(Ok(3));
        assert_eq!(status.code, 3);
        assert!(status.error.is_none());
        assert!(!status.success());
    }

    #[test]
    fn test_machinery_failure_uses_128() {
        let status = ExitStatus::from(Err(RunError::Cancelled));
        assert_eq!(status.code, MACHINERY_FAILURE);
        assert!(matches!(status.into_result(), Err(RunError::Cancelled)));
    }

    #[test]
    fn test_success() {
        assert!(ExitStatus::exited(0).success());
    }
}
