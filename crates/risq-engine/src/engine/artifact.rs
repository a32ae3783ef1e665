use crate::error::{PipelineFailure, SPAWN_FAILED_CODE};
use crate::schema::FeatureVector;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempPath;
use tracing::{error, trace};
use uuid::Uuid;

/// Where the engine's input file comes from.
#[derive(Debug)]
pub enum InputSource {
    /// Serialize the feature vector to a fresh, request-scoped file.
    Features(FeatureVector),
    /// Hand the engine a file that already exists; it is never removed.
    ExistingFile(PathBuf),
}

/// The input file of one invocation. A scoped artifact is deleted when this is dropped,
/// on every exit path; deletion failures are ignored.
#[derive(Debug)]
pub enum InputArtifact {
    Scoped(TempPath),
    Existing(PathBuf),
}

impl InputArtifact {
    /// Materialise `source` in `scratch_dir`. Scoped names embed the request id, so
    /// concurrent requests never share a path.
    pub fn stage(
        source: InputSource,
        scratch_dir: &Path,
        request_id: Uuid,
    ) -> Result<Self, PipelineFailure> {
        // the engine runs from its own directory, so it is only ever handed absolute paths
        match source {
            InputSource::ExistingFile(path) => std::path::absolute(&path)
                .map(InputArtifact::Existing)
                .map_err(|e| {
                    error!("failed to resolve engine input {}: {e}", path.display());
                    PipelineFailure::EngineNonZeroExit {
                        exit_code: SPAWN_FAILED_CODE,
                        diagnostic: format!("failed to stage engine input: {e}"),
                    }
                }),
            InputSource::Features(features) => {
                write_scoped(&features, scratch_dir, request_id).map_err(|e| {
                    error!("[{}] failed to stage engine input: {e}", features.symbol);
                    PipelineFailure::EngineNonZeroExit {
                        exit_code: SPAWN_FAILED_CODE,
                        diagnostic: format!("failed to stage engine input: {e}"),
                    }
                })
            }
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            InputArtifact::Scoped(path) => &**path,
            InputArtifact::Existing(path) => path.as_path(),
        }
    }
}

fn write_scoped(
    features: &FeatureVector,
    scratch_dir: &Path,
    request_id: Uuid,
) -> anyhow::Result<InputArtifact> {
    let mut file = tempfile::Builder::new()
        .prefix(&format!("risq-{request_id}-"))
        .suffix(".json")
        .tempfile_in(std::path::absolute(scratch_dir)?)?;
    serde_json::to_writer_pretty(file.as_file_mut(), features)?;
    file.as_file_mut().flush()?;

    let path = file.into_temp_path();
    trace!("[{}] engine input staged at {}", features.symbol, path.display());
    Ok(InputArtifact::Scoped(path))
}
