use std::path::{Path, PathBuf};

use crate::archive_reader::ArchiveReader;
use crate::archive_tree::{build_archive_tree, ArchiveNode, NestedState, NodeKind};
use crate::entry_kind::base_name;
use crate::error::{BrowserError, BrowserResult};
use crate::jobs::CancelFlag;
use crate::workspace_io::{TempWorkspace, TempWorkspaceManager};

/// An inner jar materialized to disk together with its tree.
///
/// `archive_path` lives inside `workspace`; keep the workspace alive for as
/// long as entries of the subtree may still be read.
#[derive(Debug)]
pub struct ResolvedArchive {
    pub children: Vec<ArchiveNode>,
    pub archive_path: PathBuf,
    pub workspace: TempWorkspace,
}

/// Copies `inner_entry` out of `outer_archive` into a fresh workspace and
/// builds its tree. Each call gets its own workspace.
pub fn resolve(
    outer_archive: &Path,
    inner_entry: &str,
    workspaces: &TempWorkspaceManager,
) -> BrowserResult<ResolvedArchive> {
    resolve_with_cancel(outer_archive, inner_entry, workspaces, &CancelFlag::new())
}

/// Like [`resolve`], checking `cancel` before allocating and again between
/// extraction and tree building. A cancelled resolve drops its workspace.
pub fn resolve_with_cancel(
    outer_archive: &Path,
    inner_entry: &str,
    workspaces: &TempWorkspaceManager,
    cancel: &CancelFlag,
) -> BrowserResult<ResolvedArchive> {
    let mut reader = ArchiveReader::open(outer_archive)?;
    if !reader.contains(inner_entry) {
        return Err(BrowserError::EntryNotFound(inner_entry.to_string()));
    }
    if cancel.is_cancelled() {
        return Err(BrowserError::Cancelled);
    }

    let workspace = workspaces.allocate()?;
    let archive_path = workspace.extracted_file(base_name(inner_entry));
    reader.extract_entry_to(inner_entry, &archive_path)?;
    drop(reader);
    if cancel.is_cancelled() {
        tracing::info!(inner = inner_entry, "nested archive resolve cancelled");
        return Err(BrowserError::Cancelled);
    }

    let root = build_archive_tree(&archive_path).map_err(|error| match error {
        BrowserError::ArchiveUnreadable { reason, .. } => BrowserError::InvalidArchive {
            entry: inner_entry.to_string(),
            reason,
        },
        other => other,
    })?;
    tracing::debug!(
        outer = %outer_archive.display(),
        inner = inner_entry,
        children = root.children.len(),
        "resolved nested archive"
    );

    Ok(ResolvedArchive {
        children: root.children,
        archive_path,
        workspace,
    })
}

/// Expands a `NestedArchive` node in place.
///
/// Returns the workspace backing the new subtree, or `None` when the node
/// was already expanded (nothing is extracted again). On failure the node
/// stays `Unresolved` with no children.
pub fn resolve_node(
    node: &mut ArchiveNode,
    owning_archive: &Path,
    workspaces: &TempWorkspaceManager,
) -> BrowserResult<Option<TempWorkspace>> {
    match &node.kind {
        NodeKind::NestedArchive(NestedState::Expanded { .. }) => return Ok(None),
        NodeKind::NestedArchive(NestedState::Unresolved) => {}
        _ => {
            return Err(BrowserError::InvalidArchive {
                entry: node.name.clone(),
                reason: "not a nested archive".to_string(),
            })
        }
    }
    let full_path = node
        .full_path
        .clone()
        .ok_or_else(|| BrowserError::EntryNotFound(node.name.clone()))?;

    let resolved = resolve(owning_archive, &full_path, workspaces)?;
    node.children = resolved.children;
    node.kind = NodeKind::NestedArchive(NestedState::Expanded {
        archive: resolved.archive_path,
    });
    Ok(Some(resolved.workspace))
}
