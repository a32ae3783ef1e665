use super::InvocationOutcome;
use crate::api::Engine;
use crate::config::{EngineConfig, ENGINE_ENV};
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, error, trace};

////////////////////////////////////////////////////////////////////////////////////////////////////
//
// External engine, spawned as a child process
//
////////////////////////////////////////////////////////////////////////////////////////////////////

/// Runs the engine as `program [args..] <input>` in its own working directory, with the
/// inherited environment plus [`ENGINE_ENV`].
///
/// Each call spawns an independent process, so a single `ProcessEngine` can serve
/// concurrent requests.
pub struct ProcessEngine {
    config: EngineConfig,
}

impl ProcessEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The input is made absolute first; relative to `working_dir` it would name a
    /// different file.
    fn command(&self, input: &Path) -> std::io::Result<Command> {
        let input = std::path::absolute(input)?;
        let mut cmd = Command::new(&self.config.program);
        cmd.args(&self.config.args)
            .arg(input)
            .current_dir(&self.config.working_dir)
            .envs(ENGINE_ENV)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // dropping the child on timeout kills it
            .kill_on_drop(true);
        Ok(cmd)
    }
}

#[async_trait]
impl Engine for ProcessEngine {
    async fn invoke(&self, input: &Path) -> InvocationOutcome {
        let time = std::time::Instant::now();
        let program = self.config.program.display();

        let child = match self.command(input).and_then(|mut cmd| cmd.spawn()) {
            Ok(child) => child,
            Err(e) => {
                error!("failed to start engine `{program}`: {e}");
                return InvocationOutcome::SpawnFailed {
                    reason: format!("failed to start engine `{program}`: {e}"),
                };
            }
        };
        trace!("engine `{program}` spawned with pid {:?}", child.id());

        // `wait_with_output` drains stdout & stderr to EOF before reaping the exit status
        let output = match tokio::time::timeout(self.config.timeout, child.wait_with_output()).await
        {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                error!("failed to collect engine output: {e}");
                return InvocationOutcome::SpawnFailed {
                    reason: format!("failed to collect engine output: {e}"),
                };
            }
            Err(_) => {
                error!(
                    "engine `{program}` timed out after {} ms; killed",
                    self.config.timeout.as_millis()
                );
                return InvocationOutcome::TimedOut {
                    after: self.config.timeout,
                };
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        debug!(
            "engine exited with {}, elapsed time: {} ms",
            output.status,
            time.elapsed().as_millis()
        );
        trace!("engine stdout:\n{stdout}");

        InvocationOutcome::Completed {
            stdout,
            stderr,
            exit_code: output.status.code(),
        }
    }
}
