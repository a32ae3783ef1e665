pub mod artifact;
pub mod extract;
pub mod process;

pub use artifact::{InputArtifact, InputSource};
pub use extract::{extract, ExtractedPayload, END_MARKER, START_MARKER};
pub use process::ProcessEngine;

use crate::error::{PipelineFailure, SIGNALLED_CODE, SPAWN_FAILED_CODE, TIMED_OUT_CODE};
use std::time::Duration;

/// Terminal state of one engine run. Only produced once the process has exited and both
/// of its streams have closed.
#[derive(Clone, Debug, PartialEq)]
pub enum InvocationOutcome {
    Completed {
        stdout: String,
        stderr: String,
        /// `None` when the process was terminated by a signal.
        exit_code: Option<i32>,
    },
    SpawnFailed {
        reason: String,
    },
    TimedOut {
        after: Duration,
    },
}

impl InvocationOutcome {
    /// Resolve the outcome to the engine's stdout; the exit status takes precedence over
    /// whatever stdout contains.
    pub fn into_stdout(self) -> Result<String, PipelineFailure> {
        match self {
            InvocationOutcome::Completed {
                stdout,
                exit_code: Some(0),
                ..
            } => Ok(stdout),
            InvocationOutcome::Completed {
                stderr, exit_code, ..
            } => Err(PipelineFailure::EngineNonZeroExit {
                exit_code: exit_code.unwrap_or(SIGNALLED_CODE),
                diagnostic: stderr,
            }),
            InvocationOutcome::SpawnFailed { reason } => Err(PipelineFailure::EngineNonZeroExit {
                exit_code: SPAWN_FAILED_CODE,
                diagnostic: reason,
            }),
            InvocationOutcome::TimedOut { after } => Err(PipelineFailure::EngineNonZeroExit {
                exit_code: TIMED_OUT_CODE,
                diagnostic: format!("engine timed out after {} ms", after.as_millis()),
            }),
        }
    }
}
