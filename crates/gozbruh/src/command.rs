//! A sculpting host driven by an external program.
//!
//! The sculpting application cannot be called into from outside; it is
//! told to load a file by running a helper (a script that forwards the
//! request to the running application). Only import is available this way.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;

use gozbruh_host::{HostError, SculptHost, SubtoolRef};

type HostResult<T> = gozbruh_host::Result<T>;

/// Imports by running `<program> [args...] <path> <target>`.
#[derive(Debug, Clone)]
pub struct ShellSculptHost {
    program: PathBuf,
    args: Vec<String>,
}

impl ShellSculptHost {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Arguments placed before the path and target.
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }
}

#[async_trait]
impl SculptHost for ShellSculptHost {
    async fn iterate_subtools(&self) -> HostResult<Vec<SubtoolRef>> {
        Err(HostError::Unsupported("iterate_subtools"))
    }

    async fn current_subtool(&self) -> HostResult<Option<SubtoolRef>> {
        Err(HostError::Unsupported("current_subtool"))
    }

    async fn select_subtool(&self, _subtool: &SubtoolRef) -> HostResult<()> {
        Err(HostError::Unsupported("select_subtool"))
    }

    async fn export_current_subtool(&self, _path: &Path) -> HostResult<()> {
        Err(HostError::Unsupported("export_current_subtool"))
    }

    async fn import_file(&self, path: &Path, import_target_name: &str) -> HostResult<()> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(path)
            .arg(import_target_name)
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(HostError::ImportFailed {
                path: path.display().to_string(),
                reason: format!(
                    "{} exited with {}: {}",
                    self.program.display(),
                    output.status,
                    stderr.trim()
                ),
            });
        }
        tracing::debug!(path = %path.display(), target = import_target_name, "import command ran");
        Ok(())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_zero_exit_is_success() {
        let host = ShellSculptHost::new("true");
        host.import_file(Path::new("/tmp/x.ma"), "x").await.unwrap();
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_import_failure() {
        let host = ShellSculptHost::new("false");
        assert!(matches!(
            host.import_file(Path::new("/tmp/x.ma"), "x").await,
            Err(HostError::ImportFailed { .. })
        ));
    }

    #[tokio::test]
    async fn test_arguments_are_passed() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("args.txt");
        let script = format!("printf '%s %s' \"$0\" \"$1\" > {}", out.display());
        let host = ShellSculptHost::new("sh").with_args(vec!["-c".into(), script]);

        host.import_file(Path::new("/share/Arm.ma"), "Body")
            .await
            .unwrap();
        let written = std::fs::read_to_string(&out).unwrap();
        assert_eq!(written, "/share/Arm.ma Body");
    }

    #[tokio::test]
    async fn test_other_operations_unsupported() {
        let host = ShellSculptHost::new("true");
        assert!(matches!(
            host.iterate_subtools().await,
            Err(HostError::Unsupported(_))
        ));
    }
}
