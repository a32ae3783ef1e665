use anyhow::{anyhow, Result};
use dotenv::var;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_PROGRAM: &str = "python";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Environment flags forcing unbuffered, utf-8 text output from the engine.
pub const ENGINE_ENV: [(&str, &str); 2] = [("PYTHONUNBUFFERED", "1"), ("PYTHONIOENCODING", "utf-8")];

/// How to launch the external engine: `program [args..] <input.json>`, run from
/// `working_dir`.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
    pub timeout: Duration,
    /// Where scoped input artifacts are written.
    pub scratch_dir: PathBuf,
}

impl EngineConfig {
    /// Engine run as `program <script> <input.json>` from the script's own directory.
    ///
    /// The script is resolved against the current directory first, so a relative path
    /// still names the same file once the child runs from elsewhere.
    pub fn for_script(program: impl Into<PathBuf>, script: impl AsRef<Path>) -> Result<Self> {
        let script = std::path::absolute(script.as_ref())?;
        let working_dir = script
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| anyhow!("engine script {} has no parent directory", script.display()))?;

        Ok(Self {
            program: program.into(),
            args: vec![script.display().to_string()],
            working_dir,
            timeout: DEFAULT_TIMEOUT,
            scratch_dir: std::env::temp_dir(),
        })
    }

    /// Read the engine configuration from the environment (and `.env`).
    ///
    /// `RISQ_ENGINE_SCRIPT` is required; `RISQ_ENGINE_PROGRAM`, `RISQ_ENGINE_DIR`,
    /// `RISQ_ENGINE_TIMEOUT_SECS` and `RISQ_SCRATCH_DIR` are optional.
    pub fn from_env() -> Result<Self> {
        Self::from_env_with_script(None)
    }

    /// As [`EngineConfig::from_env`], with `script` standing in for `RISQ_ENGINE_SCRIPT`.
    pub fn from_env_with_script(script: Option<PathBuf>) -> Result<Self> {
        let script = match script {
            Some(script) => script,
            None => var("RISQ_ENGINE_SCRIPT")
                .map(PathBuf::from)
                .map_err(|_| anyhow!("RISQ_ENGINE_SCRIPT must be set to the engine's entry script"))?,
        };
        let program = var("RISQ_ENGINE_PROGRAM").unwrap_or_else(|_| DEFAULT_PROGRAM.to_string());

        let mut config = Self::for_script(program, script)?;
        if let Ok(dir) = var("RISQ_ENGINE_DIR") {
            config.working_dir = std::path::absolute(dir)?;
        }
        if let Ok(secs) = var("RISQ_ENGINE_TIMEOUT_SECS") {
            let secs: u64 = secs
                .parse()
                .map_err(|e| anyhow!("RISQ_ENGINE_TIMEOUT_SECS is not a whole number: {e}"))?;
            config.timeout = Duration::from_secs(secs);
        }
        if let Ok(dir) = var("RISQ_SCRATCH_DIR") {
            config.scratch_dir = std::path::absolute(dir)?;
        }

        Ok(config)
    }
}
