use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use serde::Serialize;

use crate::app_settings::AppSettings;
use crate::archive_tree::{build_archive_tree, filter_tree, ArchiveNode, NestedState, NodeKind};
use crate::content_io::{read_entry_content, ContentPayload};
use crate::decompiler_io::{DecompilationPipeline, DecompileError, DecompileResult, DecompiledSource};
use crate::entry_kind::{classify, ContentKind};
use crate::error::{BrowserError, BrowserResult};
use crate::jobs::BackgroundJob;
use crate::nested_archive::{resolve_node, resolve_with_cancel, ResolvedArchive};
use crate::workspace_io::{TempWorkspace, TempWorkspaceManager};

/// Result of selecting a node, ready to be shown by a host.
#[derive(Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase", tag = "type", content = "value")]
pub enum Selection {
    Directory { name: String, child_count: usize },
    Content(ContentPayload),
    Decompiled(DecompiledSource),
    /// Children of a nested jar after expansion.
    Expanded(Vec<ArchiveNode>),
    /// A failure turned into something displayable.
    Message(String),
}

/// One opened archive and everything derived from it.
///
/// Nodes are addressed by their name segments below the root. Workspaces of
/// expanded nested jars are owned here and released with the session.
pub struct ArchiveSession {
    archive_path: PathBuf,
    root: ArchiveNode,
    settings: AppSettings,
    workspaces: Arc<TempWorkspaceManager>,
    nested_workspaces: Vec<TempWorkspace>,
}

impl ArchiveSession {
    /// Building the top-level tree is the one failure that aborts opening.
    pub fn open_archive(path: &Path, settings: AppSettings) -> BrowserResult<Self> {
        let workspaces = Arc::new(TempWorkspaceManager::new(
            settings.workspace.scratch_root(),
            settings.workspace.cleanup,
        )?);
        Self::open_with_workspaces(path, settings, workspaces)
    }

    pub fn open_with_workspaces(
        path: &Path,
        settings: AppSettings,
        workspaces: Arc<TempWorkspaceManager>,
    ) -> BrowserResult<Self> {
        let root = build_archive_tree(path)?;
        tracing::info!(archive = %path.display(), nodes = root.node_count(), "opened archive");
        Ok(Self {
            archive_path: path.to_path_buf(),
            root,
            settings,
            workspaces,
            nested_workspaces: Vec::new(),
        })
    }

    pub fn root(&self) -> &ArchiveNode {
        &self.root
    }

    pub fn archive_path(&self) -> &Path {
        &self.archive_path
    }

    pub fn workspaces(&self) -> &Arc<TempWorkspaceManager> {
        &self.workspaces
    }

    pub fn filter_tree(&self, query: &str) -> Option<ArchiveNode> {
        filter_tree(&self.root, query)
    }

    pub fn decompiler(&self) -> DecompilationPipeline {
        DecompilationPipeline::new(self.settings.decompiler.clone(), self.workspaces.clone())
    }

    /// Finds a node and the physical archive its `full_path` refers to.
    /// Descending through an expanded jar switches to its materialized copy.
    pub fn locate<S: AsRef<str>>(&self, segments: &[S]) -> Option<(PathBuf, &ArchiveNode)> {
        let mut owning = self.archive_path.as_path();
        let mut current = &self.root;
        for segment in segments {
            if let Some(inner) = current.expanded_archive() {
                owning = inner;
            }
            current = current.child(segment.as_ref())?;
        }
        Some((owning.to_path_buf(), current))
    }

    pub fn select_entry<S: AsRef<str>>(&mut self, segments: &[S]) -> Selection {
        let Some((owning, node)) = self.locate(segments) else {
            return Selection::Message(format!("// Entry not found: {}", join_segments(segments)));
        };
        let Some(full_path) = node.full_path.clone() else {
            return Selection::Directory {
                name: node.name.clone(),
                child_count: node.children.len(),
            };
        };

        match classify(&full_path) {
            ContentKind::NestedArchive => match self.expand(segments, &owning) {
                Ok(children) => Selection::Expanded(children),
                Err(error) => failure_message(error),
            },
            ContentKind::Bytecode => match self.decompiler().decompile(&owning, &full_path) {
                Ok(source) => Selection::Decompiled(source),
                Err(error) => failure_message(error),
            },
            _ => match read_entry_content(&owning, &full_path) {
                Ok(payload) => Selection::Content(payload),
                Err(error) => failure_message(error),
            },
        }
    }

    fn expand<S: AsRef<str>>(
        &mut self,
        segments: &[S],
        owning: &Path,
    ) -> BrowserResult<Vec<ArchiveNode>> {
        let node = self
            .root
            .find_mut(segments)
            .ok_or_else(|| BrowserError::EntryNotFound(join_segments(segments)))?;
        if let Some(workspace) = resolve_node(node, owning, &self.workspaces)? {
            self.nested_workspaces.push(workspace);
        }
        Ok(node.children.clone())
    }

    /// Runs the decompiler for a class node on the blocking pool. Requires a
    /// tokio runtime.
    pub fn spawn_decompile<S: AsRef<str>>(&self, segments: &[S]) -> BackgroundJob<DecompileResult> {
        let target = self
            .locate(segments)
            .and_then(|(owning, node)| node.full_path.clone().map(|path| (owning, path)));
        let Some((owning, full_path)) = target else {
            let missing = join_segments(segments);
            return BackgroundJob::spawn(move |_| Err(DecompileError::EntryMissing(missing)));
        };
        let pipeline = self.decompiler();
        BackgroundJob::spawn(move |cancel| {
            pipeline.decompile_with_cancel(&owning, &full_path, &cancel)
        })
    }

    /// Extracts a nested jar on the blocking pool. The tree is unchanged
    /// until the result is passed to [`ArchiveSession::attach_resolved`].
    /// Cancelling the job makes it finish with `BrowserError::Cancelled`.
    pub fn spawn_resolve<S: AsRef<str>>(
        &self,
        segments: &[S],
    ) -> BackgroundJob<BrowserResult<ResolvedArchive>> {
        let target = self
            .locate(segments)
            .and_then(|(owning, node)| node.full_path.clone().map(|path| (owning, path)));
        let Some((owning, full_path)) = target else {
            let missing = join_segments(segments);
            return BackgroundJob::spawn(move |_| Err(BrowserError::EntryNotFound(missing)));
        };
        let workspaces = self.workspaces.clone();
        BackgroundJob::spawn(move |cancel| {
            resolve_with_cancel(&owning, &full_path, &workspaces, &cancel)
        })
    }

    /// Splices a background resolve into the tree. If the node was expanded
    /// meanwhile, the existing subtree wins and `resolved` is discarded.
    pub fn attach_resolved<S: AsRef<str>>(
        &mut self,
        segments: &[S],
        resolved: ResolvedArchive,
    ) -> BrowserResult<Vec<ArchiveNode>> {
        let node = self
            .root
            .find_mut(segments)
            .ok_or_else(|| BrowserError::EntryNotFound(join_segments(segments)))?;
        if !node.is_nested_archive() {
            return Err(BrowserError::InvalidArchive {
                entry: node.name.clone(),
                reason: "not a nested archive".to_string(),
            });
        }
        if !node.is_expanded() {
            node.children = resolved.children;
            node.kind = NodeKind::NestedArchive(NestedState::Expanded {
                archive: resolved.archive_path,
            });
            self.nested_workspaces.push(resolved.workspace);
        }
        Ok(node.children.clone())
    }
}

fn join_segments<S: AsRef<str>>(segments: &[S]) -> String {
    segments
        .iter()
        .map(|segment| segment.as_ref())
        .collect::<Vec<&str>>()
        .join("/")
}

fn failure_message(error: impl std::fmt::Display) -> Selection {
    tracing::warn!(%error, "selection failed");
    Selection::Message(format!("// {error}"))
}
