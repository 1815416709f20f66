//! The shared artifact directory.

use std::path::{Path, PathBuf};

use gozbruh_core::{artifact_file_name, ObjectName};

use crate::error::{BridgeError, Result};

/// Directory both hosts exchange artifacts through.
///
/// Artifacts are named `<object>.<extension>`; the last writer wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedDirectory {
    path: PathBuf,
    extension: String,
}

impl SharedDirectory {
    pub fn new(path: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            extension: extension.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Artifact extension, without the dot.
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// `<dir>/<name>.<ext>`.
    pub fn artifact_path(&self, name: &ObjectName) -> PathBuf {
        self.path
            .join(artifact_file_name(name.as_str(), &self.extension))
    }

    /// Create the directory if missing.
    pub async fn ensure_exists(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.path).await?;
        Ok(())
    }

    /// The artifact path, failing if the file is not there.
    pub async fn existing_artifact(&self, name: &ObjectName) -> Result<PathBuf> {
        let path = self.artifact_path(name);
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok(path),
            _ => Err(BridgeError::MissingArtifact(path.display().to_string())),
        }
    }

    /// Let the peer's OS user read and overwrite an artifact.
    pub async fn share(&self, artifact: &Path) -> Result<()> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let permissions = std::fs::Permissions::from_mode(0o777);
            tokio::fs::set_permissions(artifact, permissions).await?;
        }
        #[cfg(not(unix))]
        let _ = artifact;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_path() {
        let shared = SharedDirectory::new("/tmp/share", "ma");
        let name = ObjectName::new("Sphere1").unwrap();
        assert_eq!(
            shared.artifact_path(&name),
            PathBuf::from("/tmp/share/Sphere1.ma")
        );
    }

    #[tokio::test]
    async fn test_existing_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let shared = SharedDirectory::new(dir.path().join("nested"), "ma");
        shared.ensure_exists().await.unwrap();

        let name = ObjectName::new("Head").unwrap();
        assert!(matches!(
            shared.existing_artifact(&name).await,
            Err(BridgeError::MissingArtifact(_))
        ));

        tokio::fs::write(shared.artifact_path(&name), b"x")
            .await
            .unwrap();
        assert!(shared.existing_artifact(&name).await.is_ok());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_share_sets_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.ma");
        tokio::fs::write(&path, b"x").await.unwrap();

        SharedDirectory::new(dir.path(), "ma")
            .share(&path)
            .await
            .unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o777);
    }
}
