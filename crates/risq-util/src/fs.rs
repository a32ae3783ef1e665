use anyhow::Result;
use std::path::Path;
use tracing::{error, trace};

/// Reads a `.json` file from `path`.
///
/// ```ignore
/// let record: CompanyFinancialRecord = risq_util::read_json(path).await?;
/// ```
pub async fn read_json<T: serde::de::DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    trace!("reading file at path: \"{}\"", path.display());
    let file = tokio::fs::read(path).await.map_err(|e| {
        error!("failed to read file at \"{}\": {e}", path.display());
        e
    })?;
    let data: T = serde_json::from_slice(&file)?;
    Ok(data)
}

/// Writes `data` as pretty-printed `.json` to `path`.
///
/// Parent directories are created, as necessary, before the file is written.
pub async fn write_json<T: serde::Serialize>(data: &T, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(dir) = path.parent() {
        tokio::fs::create_dir_all(dir).await?;
    }
    let bytes = serde_json::to_vec_pretty(data)?;
    tokio::fs::write(path, bytes).await?;
    trace!("{} written", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Cell {
        dated: String,
        val: f64,
    }

    #[tokio::test]
    async fn write_then_read_creates_missing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/cell.json");
        let cell = Cell {
            dated: "2024-12-31".to_string(),
            val: 1.5,
        };

        write_json(&cell, &path).await.unwrap();
        let back: Cell = read_json(&path).await.unwrap();
        assert_eq!(back, cell);
    }

    #[tokio::test]
    async fn read_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result: Result<Cell> = read_json(dir.path().join("absent.json")).await;
        assert!(result.is_err());
    }
}
