//! GitHub Actions runner backed by file commands and workflow commands

use super::{Command, Env, RunContext, Runner, RunnerError};
use parking_lot::Mutex;
use std::fs::OpenOptions;
use std::io::{self, Write};
use tracing::{debug, warn};
use uuid::Uuid;

const ENV_FILE: &str = "GITHUB_ENV";
const OUTPUT_FILE: &str = "GITHUB_OUTPUT";

/// Runner talking to GitHub Actions.
///
/// Variables and outputs are appended to the `GITHUB_ENV`/`GITHUB_OUTPUT`
/// files when present, otherwise emitted as workflow commands.
pub struct GitHubRunner {
    env: Env,
    stdout: Mutex<Box<dyn Write + Send>>,
}

impl GitHubRunner {
    /// Runner over the process environment and stdout
    pub fn new() -> Self {
        Self::with_writer(Env::real(), Box::new(io::stdout()))
    }

    /// Runner over a custom environment and command sink
    pub fn with_writer(env: Env, stdout: Box<dyn Write + Send>) -> Self {
        Self {
            env,
            stdout: Mutex::new(stdout),
        }
    }

    fn issue(&self, command: Command<'_>) -> Result<(), RunnerError> {
        let mut out = self.stdout.lock();
        writeln!(out, "{}", command)?;
        out.flush()?;
        Ok(())
    }

    /// Append `name<<delimiter` block to the file named by `file_var`.
    /// Returns `false` when the runner does not provide that file.
    fn file_command(&self, file_var: &str, name: &str, value: &str) -> Result<bool, RunnerError> {
        let path = match self.env.get(file_var) {
            Some(path) if !path.is_empty() => path,
            _ => return Ok(false),
        };

        let delimiter = format!("ghadelimiter_{}", Uuid::new_v4());
        if name.contains(&delimiter) || value.contains(&delimiter) {
            return Err(RunnerError::Delimiter {
                name: name.to_string(),
                delimiter,
            });
        }

        let entry = format!("{name}<<{delimiter}\n{value}\n{delimiter}\n");
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .and_then(|mut file| file.write_all(entry.as_bytes()))
            .map_err(|source| RunnerError::FileCommand {
                path: path.clone(),
                source,
            })?;

        debug!(file = file_var, name, "Wrote file command");
        Ok(true)
    }
}

impl Default for GitHubRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl Runner for GitHubRunner {
    fn context(&self) -> RunContext {
        RunContext {
            event_name: self.env.get("GITHUB_EVENT_NAME").unwrap_or_default(),
            repository: self.env.get("GITHUB_REPOSITORY").unwrap_or_default(),
            git_ref: self.env.get("GITHUB_REF").unwrap_or_default(),
        }
    }

    fn input(&self, name: &str) -> Option<String> {
        let key = format!("INPUT_{}", name.replace(' ', "_").to_uppercase());
        self.env
            .get(&key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn export_variable(&self, name: &str, value: &str) -> Result<(), RunnerError> {
        if self.file_command(ENV_FILE, name, value)? {
            return Ok(());
        }
        self.issue(Command::new("set-env", value).property("name", name))
    }

    fn set_output(&self, name: &str, value: &str) -> Result<(), RunnerError> {
        if self.file_command(OUTPUT_FILE, name, value)? {
            return Ok(());
        }
        self.issue(Command::new("set-output", value).property("name", name))
    }

    fn add_mask(&self, value: &str) {
        if value.is_empty() {
            return;
        }
        if let Err(e) = self.issue(Command::new("add-mask", value)) {
            warn!(error = %e, "Failed to mask value");
        }
    }

    fn set_failed(&self, message: &str) {
        if let Err(e) = self.issue(Command::new("error", message)) {
            warn!(error = %e, "Failed to report failure");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    /// Shared buffer standing in for stdout
    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().clone()).unwrap()
        }
    }

    fn runner(vars: &[(&str, &str)]) -> (GitHubRunner, Captured) {
        let out = Captured::default();
        let runner = GitHubRunner::with_writer(Env::from_slice(vars), Box::new(out.clone()));
        (runner, out)
    }

    #[test]
    fn test_context() {
        let (runner, _) = runner(&[
            ("GITHUB_EVENT_NAME", "push"),
            ("GITHUB_REPOSITORY", "octo-org/test-repo"),
            ("GITHUB_REF", "refs/heads/main"),
        ]);
        let ctx = runner.context();
        assert_eq!(ctx.event_name, "push");
        assert_eq!(ctx.repo(), "test-repo");
        assert_eq!(ctx.git_ref, "refs/heads/main");
    }

    #[test]
    fn test_inputs() {
        let (runner, _) = runner(&[
            ("INPUT_NAME", "  deploy "),
            ("INPUT_ACCOUNT", ""),
            ("INPUT_MULTI-ACCOUNT", "true"),
            ("INPUT_SOME_VALUE", "x"),
        ]);
        assert_eq!(runner.input("name").as_deref(), Some("deploy"));
        assert_eq!(runner.input("account"), None);
        assert!(runner.bool_input("multi-account"));
        assert!(!runner.bool_input("name"));
        assert_eq!(runner.input("some value").as_deref(), Some("x"));
    }

    #[test]
    fn test_file_commands() {
        let dir = tempfile::tempdir().unwrap();
        let env_file = dir.path().join("env");
        let output_file = dir.path().join("output");
        let (runner, out) = runner(&[
            ("GITHUB_ENV", env_file.to_str().unwrap()),
            ("GITHUB_OUTPUT", output_file.to_str().unwrap()),
        ]);

        runner
            .export_variable("AWS_AVAILABLE_ROLES", r#"{"dev":"dev-role"}"#)
            .unwrap();
        runner.set_output("aws-account-id", "123456789012").unwrap();

        let env = std::fs::read_to_string(&env_file).unwrap();
        let lines: Vec<_> = env.lines().collect();
        assert_eq!(lines.len(), 3);
        let delimiter = lines[0].strip_prefix("AWS_AVAILABLE_ROLES<<").unwrap();
        assert!(delimiter.starts_with("ghadelimiter_"));
        assert_eq!(lines[1], r#"{"dev":"dev-role"}"#);
        assert_eq!(lines[2], delimiter);

        let output = std::fs::read_to_string(&output_file).unwrap();
        assert!(output.starts_with("aws-account-id<<ghadelimiter_"));
        assert!(output.contains("\n123456789012\n"));

        // nothing went to stdout
        assert!(out.text().is_empty());
    }

    #[test]
    fn test_command_fallback() {
        let (runner, out) = runner(&[]);
        runner.export_variable("AWS_AVAILABLE_ROLES", "{}").unwrap();
        runner.set_output("aws-account-id", "123").unwrap();
        runner.add_mask("secret");
        runner.add_mask("");
        runner.set_failed("pull requests are not supported (yet)");

        assert_eq!(
            out.text(),
            "::set-env name=AWS_AVAILABLE_ROLES::{}\n\
             ::set-output name=aws-account-id::123\n\
             ::add-mask::secret\n\
             ::error::pull requests are not supported (yet)\n"
        );
    }
}
