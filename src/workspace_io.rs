use std::{
    fs,
    path::{Path, PathBuf},
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use tempfile::TempDir;

use crate::error::{BrowserError, BrowserResult};
use crate::workspace_session::{is_stale_session, now_unix_ms, WorkspaceSessionId};

const WORKSPACE_PREFIX: &str = "ws-";
const EXTRACTED_DIR: &str = "extracted";
const OUTPUT_DIR: &str = "output";

/// What happens to a workspace once its owner drops it.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum CleanupPolicy {
    /// Delete the directory when the workspace is dropped.
    #[default]
    DeleteOnDrop,
    /// Leave it on disk for the stale-session sweep.
    Retain,
}

enum WorkspaceDir {
    Owned(TempDir),
    Retained(PathBuf),
}

/// A scratch directory owned by exactly one resolve or decompile operation.
pub struct TempWorkspace {
    dir: WorkspaceDir,
    extracted: PathBuf,
    output: PathBuf,
}

impl TempWorkspace {
    pub fn path(&self) -> &Path {
        match &self.dir {
            WorkspaceDir::Owned(dir) => dir.path(),
            WorkspaceDir::Retained(path) => path,
        }
    }

    pub fn extracted_dir(&self) -> &Path {
        &self.extracted
    }

    pub fn output_dir(&self) -> &Path {
        &self.output
    }

    /// Location for an extracted entry, keyed by its base file name.
    pub fn extracted_file(&self, base_name: &str) -> PathBuf {
        self.extracted.join(base_name)
    }
}

impl std::fmt::Debug for TempWorkspace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TempWorkspace")
            .field("path", &self.path())
            .finish()
    }
}

/// Hands out isolated workspaces below `<scratch_root>/session-<pid>-<ms>`.
///
/// The manager does not track workspaces after handing them out; their
/// lifetime is the owner's.
pub struct TempWorkspaceManager {
    scratch_root: PathBuf,
    session_root: PathBuf,
    session: WorkspaceSessionId,
    policy: CleanupPolicy,
    allocations: AtomicUsize,
}

impl TempWorkspaceManager {
    pub fn new(scratch_root: impl Into<PathBuf>, policy: CleanupPolicy) -> BrowserResult<Self> {
        let scratch_root = scratch_root.into();
        let session = WorkspaceSessionId::new();
        let session_root = scratch_root.join(session.as_str());
        fs::create_dir_all(&session_root).map_err(BrowserError::WorkspaceAllocationFailed)?;
        Ok(Self {
            scratch_root,
            session_root,
            session,
            policy,
            allocations: AtomicUsize::new(0),
        })
    }

    pub fn default_scratch_root() -> PathBuf {
        std::env::temp_dir().join("mizu")
    }

    pub fn session_root(&self) -> &Path {
        &self.session_root
    }

    /// Number of workspaces handed out so far.
    pub fn allocation_count(&self) -> usize {
        self.allocations.load(Ordering::SeqCst)
    }

    /// Allocates a fresh, uniquely named workspace with its `extracted/` and
    /// `output/` subdirectories already created.
    pub fn allocate(&self) -> BrowserResult<TempWorkspace> {
        fs::create_dir_all(&self.session_root).map_err(BrowserError::WorkspaceAllocationFailed)?;
        let temp_dir = tempfile::Builder::new()
            .prefix(WORKSPACE_PREFIX)
            .tempdir_in(&self.session_root)
            .map_err(BrowserError::WorkspaceAllocationFailed)?;
        let extracted = temp_dir.path().join(EXTRACTED_DIR);
        let output = temp_dir.path().join(OUTPUT_DIR);
        fs::create_dir_all(&extracted).map_err(BrowserError::WorkspaceAllocationFailed)?;
        fs::create_dir_all(&output).map_err(BrowserError::WorkspaceAllocationFailed)?;

        let dir = match self.policy {
            CleanupPolicy::DeleteOnDrop => WorkspaceDir::Owned(temp_dir),
            CleanupPolicy::Retain => WorkspaceDir::Retained(temp_dir.keep()),
        };
        self.allocations.fetch_add(1, Ordering::SeqCst);
        let workspace = TempWorkspace {
            dir,
            extracted,
            output,
        };
        tracing::debug!(workspace = %workspace.path().display(), "allocated workspace");
        Ok(workspace)
    }

    /// Removes sibling session directories older than `retention`. The
    /// current session is never touched. Returns how many were removed.
    pub fn sweep_stale_sessions(&self, retention: Duration) -> usize {
        let Ok(entries) = fs::read_dir(&self.scratch_root) else {
            return 0;
        };
        let now_ms = now_unix_ms();
        let retention_ms = retention.as_millis();
        let mut removed = 0;

        for entry in entries.flatten() {
            let session_path = entry.path();
            if !session_path.is_dir() {
                continue;
            }
            let session_name = entry.file_name().to_string_lossy().to_string();
            if session_name == self.session.as_str() {
                continue;
            }
            if !is_stale_session(&session_name, now_ms, retention_ms) {
                continue;
            }
            match fs::remove_dir_all(&session_path) {
                Ok(()) => removed += 1,
                Err(error) => {
                    tracing::warn!(path = %session_path.display(), %error, "failed to remove stale session")
                }
            }
        }
        removed
    }
}

impl Drop for TempWorkspaceManager {
    fn drop(&mut self) {
        if self.policy == CleanupPolicy::DeleteOnDrop {
            // Only succeeds once every workspace of this session is gone.
            let _ = fs::remove_dir(&self.session_root);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::JarFixture;

    #[test]
    fn allocate_creates_unique_workspaces_with_subdirectories() {
        let fixture = JarFixture::new("ws-alloc");
        let manager =
            TempWorkspaceManager::new(fixture.root(), CleanupPolicy::DeleteOnDrop).expect("manager");

        let first = manager.allocate().expect("first");
        let second = manager.allocate().expect("second");

        assert_ne!(first.path(), second.path());
        assert!(first.extracted_dir().is_dir());
        assert!(first.output_dir().is_dir());
        assert!(first.path().starts_with(manager.session_root()));
        assert_eq!(manager.allocation_count(), 2);
        assert_eq!(
            first.extracted_file("A.class"),
            first.extracted_dir().join("A.class")
        );
    }

    #[test]
    fn delete_on_drop_removes_workspace() {
        let fixture = JarFixture::new("ws-drop");
        let manager =
            TempWorkspaceManager::new(fixture.root(), CleanupPolicy::DeleteOnDrop).expect("manager");
        let workspace = manager.allocate().expect("allocate");
        let path = workspace.path().to_path_buf();
        assert!(path.is_dir());
        drop(workspace);
        assert!(!path.exists());
    }

    #[test]
    fn retain_keeps_workspace_after_drop() {
        let fixture = JarFixture::new("ws-retain");
        let manager =
            TempWorkspaceManager::new(fixture.root(), CleanupPolicy::Retain).expect("manager");
        let workspace = manager.allocate().expect("allocate");
        let path = workspace.path().to_path_buf();
        drop(workspace);
        assert!(path.is_dir());
    }

    #[test]
    fn sweep_removes_only_stale_foreign_sessions() {
        let fixture = JarFixture::new("ws-sweep");
        let stale = fixture.root().join("session-1-1000");
        let unrelated = fixture.root().join("keep-me");
        fs::create_dir_all(stale.join("ws-old")).expect("stale");
        fs::create_dir_all(&unrelated).expect("unrelated");

        let manager =
            TempWorkspaceManager::new(fixture.root(), CleanupPolicy::DeleteOnDrop).expect("manager");
        let removed = manager.sweep_stale_sessions(Duration::from_secs(60));

        assert_eq!(removed, 1);
        assert!(!stale.exists());
        assert!(unrelated.exists());
        assert!(manager.session_root().exists());
    }
}
