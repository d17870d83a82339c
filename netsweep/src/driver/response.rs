//! Result of running one command.

use std::time::Duration;

/// Response from a command execution.
#[derive(Debug, Clone)]
pub struct Response {
    /// The command that was executed.
    pub command: String,

    /// Output with the command echo and trailing prompt removed.
    pub result: String,

    /// Output as read from the channel (ANSI-stripped).
    pub raw_result: String,

    /// The prompt the device returned to after the command.
    pub prompt: String,

    pub elapsed: Duration,

    /// Failure pattern found in the output when the device rejected the command.
    pub failure_message: Option<String>,
}

impl Response {
    pub fn new(
        command: impl Into<String>,
        result: impl Into<String>,
        raw_result: impl Into<String>,
        prompt: impl Into<String>,
        elapsed: Duration,
    ) -> Self {
        Self {
            command: command.into(),
            result: result.into(),
            raw_result: raw_result.into(),
            prompt: prompt.into(),
            elapsed,
            failure_message: None,
        }
    }

    /// Mark the response as rejected by the device.
    pub fn with_failure(mut self, message: impl Into<String>) -> Self {
        self.failure_message = Some(message.into());
        self
    }

    /// Check if the device accepted the command.
    pub fn is_success(&self) -> bool {
        self.failure_message.is_none()
    }
}

impl std::fmt::Display for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_response() {
        let response = Response::new(
            "show interfaces bogus",
            "% Invalid input detected at '^' marker.",
            "show interfaces bogus\n% Invalid input detected at '^' marker.\nedge1#",
            "edge1#",
            Duration::from_millis(40),
        );
        assert!(response.is_success());

        let response = response.with_failure("% Invalid input detected");
        assert!(!response.is_success());
        assert_eq!(response.to_string(), "% Invalid input detected at '^' marker.");
    }
}
