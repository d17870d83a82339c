//! Terminal outcome of one host run.

use std::fmt;

use crate::error::FailureKind;

/// How a host run ended. Drives both the log line and the artifact name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunOutcome {
    Success,
    AuthenticationFailure,
    TimeoutFailure,
    ProtocolFailure,
    UnclassifiedFailure,
}

impl RunOutcome {
    /// Every outcome that renames its artifact.
    pub const FAILURES: [RunOutcome; 4] = [
        RunOutcome::AuthenticationFailure,
        RunOutcome::TimeoutFailure,
        RunOutcome::ProtocolFailure,
        RunOutcome::UnclassifiedFailure,
    ];

    pub fn from_kind(kind: FailureKind) -> Self {
        match kind {
            FailureKind::Authentication => RunOutcome::AuthenticationFailure,
            FailureKind::Timeout => RunOutcome::TimeoutFailure,
            FailureKind::Protocol => RunOutcome::ProtocolFailure,
            FailureKind::Unclassified => RunOutcome::UnclassifiedFailure,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunOutcome::Success => "Success",
            RunOutcome::AuthenticationFailure => "AuthenticationFailure",
            RunOutcome::TimeoutFailure => "TimeoutFailure",
            RunOutcome::ProtocolFailure => "ProtocolFailure",
            RunOutcome::UnclassifiedFailure => "UnclassifiedFailure",
        }
    }

    /// Suffix appended to the artifact name; none for success.
    pub fn suffix(&self) -> Option<&'static str> {
        match self {
            RunOutcome::Success => None,
            other => Some(other.as_str()),
        }
    }

    pub fn is_success(&self) -> bool {
        *self == RunOutcome::Success
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
