//! Probe Outcome
//!
//! Result record of one probe execution, feeding both metric families.

use crate::error::ProbeError;

/// Outcome status label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Succeeded,
    Failed,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Succeeded => "Succeeded",
            Status::Failed => "Failed",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one probe execution.
///
/// `reason` is empty exactly when `code` is 0. The fields are private so
/// the only way to build one is through [`Outcome::success`] or
/// [`Outcome::failure`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    code: u8,
    status: Status,
    reason: String,
    kind: Option<&'static str>,
}

impl Outcome {
    pub fn success() -> Self {
        Self {
            code: 0,
            status: Status::Succeeded,
            reason: String::new(),
            kind: None,
        }
    }

    pub fn failure(err: &ProbeError) -> Self {
        let mut reason = err.to_string();
        if reason.is_empty() {
            reason = err.kind().to_string();
        }
        Self {
            code: 1,
            status: Status::Failed,
            reason,
            kind: Some(err.kind()),
        }
    }

    pub fn from_result(result: &Result<(), ProbeError>) -> Self {
        match result {
            Ok(()) => Self::success(),
            Err(e) => Self::failure(e),
        }
    }

    /// 0 on success, 1 on failure
    pub fn code(&self) -> u8 {
        self.code
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Error class of a failed outcome
    pub fn kind(&self) -> Option<&'static str> {
        self.kind
    }

    pub fn is_success(&self) -> bool {
        self.code == 0
    }

    /// Availability gauge value: 1 healthy, 0 unhealthy
    pub fn availability(&self) -> f64 {
        f64::from(1 - self.code)
    }
}
