//! Aggregated operation output.

use std::fmt;

/// Exit code signalling success with a reboot required.
pub const REBOOT_EXIT_CODE: i32 = 3010;

/// Overall status of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResultStatus {
    #[default]
    Success,
    SuccessAndReboot,
    Failed,
    InProgress,
    Cancelled,
}

impl ResultStatus {
    /// Returns true for either success variant.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success | Self::SuccessAndReboot)
    }
}

impl fmt::Display for ResultStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Success => "Success",
            Self::SuccessAndReboot => "SuccessAndReboot",
            Self::Failed => "Failed",
            Self::InProgress => "InProgress",
            Self::Cancelled => "Cancelled",
        };
        f.write_str(name)
    }
}

/// Result of an install or uninstall, or of one action document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PluginOutput {
    pub status: ResultStatus,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

fn append_line(buffer: &mut String, text: &str) {
    if text.is_empty() {
        return;
    }
    if !buffer.is_empty() && !buffer.ends_with('\n') {
        buffer.push('\n');
    }
    buffer.push_str(text);
}

impl PluginOutput {
    /// An in-progress output with no text.
    pub fn new() -> Self {
        Self {
            status: ResultStatus::InProgress,
            ..Default::default()
        }
    }

    /// Append to stdout.
    pub fn append_output(&mut self, text: &str) {
        append_line(&mut self.stdout, text);
    }

    /// Append to stderr.
    pub fn append_error(&mut self, text: &str) {
        append_line(&mut self.stderr, text);
    }

    /// Mark success, keeping a pending reboot request.
    pub fn mark_success(&mut self) {
        if self.status != ResultStatus::SuccessAndReboot {
            self.status = ResultStatus::Success;
            self.exit_code = 0;
        }
    }

    /// Mark success with a reboot required.
    pub fn mark_reboot(&mut self) {
        self.status = ResultStatus::SuccessAndReboot;
        self.exit_code = REBOOT_EXIT_CODE;
    }

    /// Mark failure and record why.
    pub fn mark_failed(&mut self, error: impl fmt::Display) {
        self.append_error(&error.to_string());
        self.status = ResultStatus::Failed;
        if self.exit_code == 0 || self.exit_code == REBOOT_EXIT_CODE {
            self.exit_code = 1;
        }
    }

    /// Mark the operation cancelled.
    pub fn mark_cancelled(&mut self) {
        self.append_output("Operation cancelled");
        self.status = ResultStatus::Cancelled;
        self.exit_code = 1;
    }

    /// Fold a step's output into this one. Text is appended; a failed step
    /// fails the whole, and a reboot request is carried forward.
    pub fn merge(&mut self, step: &PluginOutput) {
        self.append_output(&step.stdout);
        self.append_error(&step.stderr);
        match step.status {
            ResultStatus::Failed => {
                self.status = ResultStatus::Failed;
                self.exit_code = if step.exit_code == 0 { 1 } else { step.exit_code };
            }
            ResultStatus::Cancelled => self.mark_cancelled(),
            ResultStatus::SuccessAndReboot if self.status != ResultStatus::Failed => self.mark_reboot(),
            _ => {}
        }
    }

    /// Returns true if the operation has failed or been cancelled.
    pub fn is_failed(&self) -> bool {
        matches!(self.status, ResultStatus::Failed | ResultStatus::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_failure_sticks() {
        let mut output = PluginOutput::new();
        output.merge(&PluginOutput {
            status: ResultStatus::Failed,
            exit_code: 2,
            stdout: "step one".to_string(),
            stderr: "bad".to_string(),
        });
        output.merge(&PluginOutput {
            status: ResultStatus::SuccessAndReboot,
            exit_code: REBOOT_EXIT_CODE,
            stdout: "step two".to_string(),
            ..Default::default()
        });
        assert_eq!(output.status, ResultStatus::Failed);
        assert_eq!(output.exit_code, 2);
        assert_eq!(output.stdout, "step one\nstep two");
    }

    #[test]
    fn test_reboot_survives_mark_success() {
        let mut output = PluginOutput::new();
        output.mark_reboot();
        output.mark_success();
        assert_eq!(output.status, ResultStatus::SuccessAndReboot);
        assert_eq!(output.exit_code, REBOOT_EXIT_CODE);
    }

    #[test]
    fn test_mark_failed_appends_error() {
        let mut output = PluginOutput::new();
        output.append_error("first");
        output.mark_failed("second");
        assert_eq!(output.stderr, "first\nsecond");
        assert_eq!(output.exit_code, 1);
        assert!(output.is_failed());
    }
}
