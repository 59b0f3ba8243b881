//! Action documents and the shell runner.
//!
//! A package may ship `install.json`, `uninstall.json`, `start.json` and
//! `stop.json` at its root. Each lists steps whose commands run in the
//! package directory:
//!
//! ```text
//! { "mainSteps": [ { "name": "install", "runCommand": ["./install.sh"] } ] }
//! ```

use std::fmt;
use std::fs;
use std::path::Path;
use std::process::Command;

use serde::Deserialize;
use tracing::{debug, info};

use super::output::{PluginOutput, ResultStatus, REBOOT_EXIT_CODE};

/// Per-action documents a package may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageScript {
    Install,
    Uninstall,
    Start,
    Stop,
}

impl PackageScript {
    /// Document file name at the package root.
    pub fn file_name(&self) -> &'static str {
        match self {
            Self::Install => "install.json",
            Self::Uninstall => "uninstall.json",
            Self::Start => "start.json",
            Self::Stop => "stop.json",
        }
    }
}

impl fmt::Display for PackageScript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Install => "install",
            Self::Uninstall => "uninstall",
            Self::Start => "start",
            Self::Stop => "stop",
        };
        f.write_str(name)
    }
}

/// Executes one action document.
pub trait ActionRunner: Send + Sync {
    /// Run `document` with `working_dir` as the current directory.
    fn run_document(&self, document: &Path, working_dir: &Path) -> PluginOutput;
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct StepInputs {
    run_command: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct Step {
    name: String,
    run_command: Vec<String>,
    inputs: StepInputs,
}

impl Step {
    fn commands(&self) -> Vec<&str> {
        self.run_command
            .iter()
            .chain(&self.inputs.run_command)
            .map(|line| line.as_str())
            .filter(|line| !line.trim().is_empty())
            .collect()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ActionDocument {
    #[serde(alias = "runtimeConfig")]
    main_steps: Vec<Step>,
}

/// Runs action documents through the platform shell.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellActionRunner;

impl ShellActionRunner {
    pub fn new() -> Self {
        Self
    }

    fn shell(script: &str) -> Command {
        if cfg!(windows) {
            let mut command = Command::new("cmd");
            command.arg("/C").arg(script);
            command
        } else {
            let mut command = Command::new("sh");
            command.arg("-c").arg(script);
            command
        }
    }

    fn run_step(step: &Step, script: &str, working_dir: &Path) -> PluginOutput {
        let mut output = PluginOutput::new();
        let result = Self::shell(script).current_dir(working_dir).output();
        let process = match result {
            Ok(process) => process,
            Err(e) => {
                output.mark_failed(format!("step {}: failed to start shell: {}", step.name, e));
                return output;
            }
        };

        output.append_output(String::from_utf8_lossy(&process.stdout).trim_end());
        output.append_error(String::from_utf8_lossy(&process.stderr).trim_end());

        match process.status.code() {
            Some(0) => output.mark_success(),
            Some(REBOOT_EXIT_CODE) => output.mark_reboot(),
            Some(code) => {
                output.status = ResultStatus::Failed;
                output.exit_code = code;
                output.append_error(&format!("step {} exited with code {}", step.name, code));
            }
            None => output.mark_failed(format!("step {} was terminated by a signal", step.name)),
        }
        output
    }
}

impl ActionRunner for ShellActionRunner {
    fn run_document(&self, document: &Path, working_dir: &Path) -> PluginOutput {
        let mut output = PluginOutput::new();

        let parsed = fs::read_to_string(document)
            .map_err(|e| e.to_string())
            .and_then(|content| {
                serde_json::from_str::<ActionDocument>(&content).map_err(|e| e.to_string())
            });
        let parsed = match parsed {
            Ok(parsed) => parsed,
            Err(reason) => {
                output.mark_failed(format!("invalid action document {}: {}", document.display(), reason));
                return output;
            }
        };

        let steps: Vec<(&Step, String)> = parsed
            .main_steps
            .iter()
            .map(|step| (step, step.commands().join("\n")))
            .filter(|(_, script)| !script.is_empty())
            .collect();
        if steps.is_empty() {
            output.mark_failed(format!(
                "action document {} has no executable steps",
                document.display()
            ));
            return output;
        }

        for (step, script) in steps {
            debug!(document = %document.display(), step = %step.name, "Running step");
            let step_output = Self::run_step(step, &script, working_dir);
            output.merge(&step_output);
            if output.is_failed() {
                return output;
            }
        }

        if output.status != ResultStatus::SuccessAndReboot {
            output.mark_success();
        }
        info!(document = %document.display(), status = %output.status, "Action document finished");
        output
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn document(temp: &TempDir, body: &str) -> std::path::PathBuf {
        let path = temp.path().join("install.json");
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_runs_steps_in_working_dir() {
        let temp = TempDir::new().unwrap();
        let doc = document(
            &temp,
            r#"{"mainSteps":[{"name":"a","runCommand":["echo one > marker"]},{"name":"b","inputs":{"runCommand":["cat marker"]}}]}"#,
        );
        let output = ShellActionRunner::new().run_document(&doc, temp.path());
        assert_eq!(output.status, ResultStatus::Success);
        assert_eq!(output.stdout, "one");
        assert!(temp.path().join("marker").is_file());
    }

    #[test]
    fn test_failure_stops_and_reports() {
        let temp = TempDir::new().unwrap();
        let doc = document(
            &temp,
            r#"{"mainSteps":[{"name":"bad","runCommand":["echo oops >&2; exit 4"]},{"name":"never","runCommand":["touch never"]}]}"#,
        );
        let output = ShellActionRunner::new().run_document(&doc, temp.path());
        assert_eq!(output.status, ResultStatus::Failed);
        assert_eq!(output.exit_code, 4);
        assert!(output.stderr.contains("oops"));
        assert!(!temp.path().join("never").exists());
    }

    #[test]
    fn test_reboot_exit_code() {
        let temp = TempDir::new().unwrap();
        let doc = document(&temp, r#"{"runtimeConfig":[{"name":"r","runCommand":["exit 3010"]}]}"#);
        let output = ShellActionRunner::new().run_document(&doc, temp.path());
        assert_eq!(output.status, ResultStatus::SuccessAndReboot);
        assert_eq!(output.exit_code, REBOOT_EXIT_CODE);
    }

    #[test]
    fn test_zero_steps_is_malformed() {
        let temp = TempDir::new().unwrap();
        for body in [r#"{"mainSteps":[]}"#, r#"{"mainSteps":[{"name":"empty","runCommand":[" "]}]}"#, "{}"] {
            let doc = document(&temp, body);
            let output = ShellActionRunner::new().run_document(&doc, temp.path());
            assert_eq!(output.status, ResultStatus::Failed, "body: {}", body);
            assert!(output.stderr.contains("no executable steps"));
        }
    }

    #[test]
    fn test_unparseable_document() {
        let temp = TempDir::new().unwrap();
        let doc = document(&temp, "not json");
        let output = ShellActionRunner::new().run_document(&doc, temp.path());
        assert_eq!(output.status, ResultStatus::Failed);
        assert!(output.stderr.contains("invalid action document"));
    }
}
