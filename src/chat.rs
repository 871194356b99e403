//! Question answering through an external helper script.
//!
//! The helper is run once per question as `{interpreter} {script} {question}` and must print a
//! single JSON document on stdout.

use crate::cli::CommandLineArgs;
use crate::error::{with_timeout, AirwatchError};

use serde_json::Value;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Bytes of stderr kept in error messages.
const STDERR_TAIL: usize = 512;

/// Runs the question-answering helper.
#[derive(Clone, Debug)]
pub struct ChatHelper {
    interpreter: String,
    script: Option<String>,
    timeout: Duration,
}

impl ChatHelper {
    /// Create a helper runner.
    ///
    /// # Arguments
    ///
    /// * `interpreter`: Program that runs the script
    /// * `script`: Script path, or `None` to disable chat
    /// * `timeout`: Bound on one run
    pub fn new(interpreter: &str, script: Option<&str>, timeout: Duration) -> Self {
        Self {
            interpreter: interpreter.to_string(),
            script: script.map(str::to_string),
            timeout,
        }
    }

    /// Create a helper runner from command line arguments.
    pub fn from_args(args: &CommandLineArgs) -> Self {
        Self::new(
            &args.chat_interpreter,
            args.chat_script.as_deref(),
            Duration::from_secs(args.chat_timeout),
        )
    }

    /// Ask the helper a question and return its JSON answer.
    ///
    /// The child is killed if it is still running when the time limit expires.
    ///
    /// # Arguments
    ///
    /// * `query`: Question text, passed as a single argument
    #[tracing::instrument(level = "DEBUG", skip(self))]
    pub async fn ask(&self, query: &str) -> Result<Value, AirwatchError> {
        let script = self.script.as_ref().ok_or(AirwatchError::ChatDisabled)?;
        let child = Command::new(&self.interpreter)
            .arg(script)
            .arg(query)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;
        let output = with_timeout("chat helper", self.timeout, child.wait_with_output()).await?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.is_empty() {
            tracing::debug!(stderr = %stderr, "chat helper stderr");
        }
        if !output.status.success() {
            let tail_start = stderr
                .char_indices()
                .rev()
                .nth(STDERR_TAIL - 1)
                .map_or(0, |(index, _)| index);
            return Err(AirwatchError::ChatFailed {
                reason: format!("{}: {}", output.status, stderr[tail_start..].trim()),
            });
        }
        serde_json::from_slice(&output.stdout).map_err(|err| AirwatchError::ChatFailed {
            reason: format!("output is not JSON: {}", err),
        })
    }
}
