use std::path::{Component, Path, PathBuf};

use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("invalid artifact path: {0}")]
    InvalidPath(String),

    #[error("artifact is not valid JSON: {0}")]
    ParseError(String),

    #[error("artifact read failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Read access to files written under a job's output directory.
///
/// Absence resolves to `None` rather than an error; a present-but-unparsable
/// JSON artifact is a parse error, distinct from absence.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        ArtifactStore { root: root.into() }
    }

    pub async fn read_text(
        &self,
        output_dir: &str,
        filename: &str,
    ) -> Result<Option<String>, ArtifactError> {
        let path = self.resolve(output_dir, filename)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn read_json(
        &self,
        output_dir: &str,
        filename: &str,
    ) -> Result<Option<Value>, ArtifactError> {
        let Some(content) = self.read_text(output_dir, filename).await? else {
            return Ok(None);
        };
        let value = serde_json::from_str(&content)
            .map_err(|e| ArtifactError::ParseError(format!("{}: {}", filename, e)))?;
        Ok(Some(value))
    }

    /// Join `<root>/<output_dir>/<filename>`, rejecting parent-directory and
    /// absolute components so a request cannot escape the results root.
    fn resolve(&self, output_dir: &str, filename: &str) -> Result<PathBuf, ArtifactError> {
        validate_relative(output_dir)?;
        validate_relative(filename)?;
        Ok(self.root.join(output_dir).join(filename))
    }
}

fn validate_relative(segment: &str) -> Result<(), ArtifactError> {
    let path = Path::new(segment);
    let safe = !segment.is_empty()
        && path
            .components()
            .all(|component| matches!(component, Component::Normal(_)));
    if safe {
        Ok(())
    } else {
        Err(ArtifactError::InvalidPath(segment.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_store(case: &str) -> (ArtifactStore, PathBuf) {
        let root = std::env::temp_dir().join(format!(
            "jobwatch-artifacts-{}-{}",
            case,
            std::process::id()
        ));
        std::fs::create_dir_all(root.join("job-1")).unwrap();
        (ArtifactStore::new(&root), root)
    }

    #[tokio::test]
    async fn read_text_and_absence() {
        let (store, root) = scratch_store("text");
        std::fs::write(root.join("job-1/output.txt"), "epoch 1 done\n").unwrap();

        let content = store.read_text("job-1", "output.txt").await.unwrap();
        assert_eq!(content.as_deref(), Some("epoch 1 done\n"));

        // Missing file and missing directory both resolve to absence.
        assert!(store.read_text("job-1", "missing.txt").await.unwrap().is_none());
        assert!(store.read_text("job-9", "output.txt").await.unwrap().is_none());

        std::fs::remove_dir_all(root).unwrap();
    }

    /// A malformed JSON artifact is a parse error, not absence.
    #[tokio::test]
    async fn read_json_distinguishes_parse_failure_from_absence() {
        let (store, root) = scratch_store("json");
        std::fs::write(root.join("job-1/metrics.json"), r#"{"acc": 0.9}"#).unwrap();
        std::fs::write(root.join("job-1/broken.json"), "{not json").unwrap();

        let value = store.read_json("job-1", "metrics.json").await.unwrap();
        assert_eq!(value.unwrap()["acc"], 0.9);

        assert!(store.read_json("job-1", "absent.json").await.unwrap().is_none());
        assert!(matches!(
            store.read_json("job-1", "broken.json").await,
            Err(ArtifactError::ParseError(_))
        ));

        std::fs::remove_dir_all(root).unwrap();
    }

    /// Requests cannot escape the results root.
    #[tokio::test]
    async fn traversal_components_are_rejected() {
        let (store, root) = scratch_store("traversal");

        for filename in ["../secrets.txt", "/etc/passwd", "a/../../b", ""] {
            assert!(matches!(
                store.read_text("job-1", filename).await,
                Err(ArtifactError::InvalidPath(_))
            ));
        }
        assert!(matches!(
            store.read_text("../elsewhere", "output.txt").await,
            Err(ArtifactError::InvalidPath(_))
        ));

        // Nested relative paths without traversal stay legal.
        std::fs::create_dir_all(root.join("job-1/checkpoints")).unwrap();
        std::fs::write(root.join("job-1/checkpoints/latest.txt"), "ok").unwrap();
        let content = store
            .read_text("job-1", "checkpoints/latest.txt")
            .await
            .unwrap();
        assert_eq!(content.as_deref(), Some("ok"));

        std::fs::remove_dir_all(root).unwrap();
    }
}
