use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::archive_reader::list_entries;
use crate::entry_kind::is_nested_archive_path;
use crate::error::BrowserResult;

/// Expansion state of a jar found inside another archive.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase", tag = "state")]
pub enum NestedState {
    Unresolved,
    /// Children were built from the inner jar materialized at `archive`.
    Expanded { archive: PathBuf },
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase", tag = "type", content = "nested")]
pub enum NodeKind {
    Directory,
    File,
    NestedArchive(NestedState),
}

/// A node of the virtual archive tree. Holds no presentation state.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveNode {
    pub name: String,
    /// Full entry path inside the owning archive; only on leaf entries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_path: Option<String>,
    pub kind: NodeKind,
    pub children: Vec<ArchiveNode>,
}

impl ArchiveNode {
    pub fn directory(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            full_path: None,
            kind: NodeKind::Directory,
            children: Vec::new(),
        }
    }

    pub fn is_nested_archive(&self) -> bool {
        matches!(self.kind, NodeKind::NestedArchive(_))
    }

    pub fn is_expanded(&self) -> bool {
        matches!(
            self.kind,
            NodeKind::NestedArchive(NestedState::Expanded { .. })
        )
    }

    /// Archive backing this node's children when it is an expanded jar.
    pub fn expanded_archive(&self) -> Option<&Path> {
        match &self.kind {
            NodeKind::NestedArchive(NestedState::Expanded { archive }) => Some(archive),
            _ => None,
        }
    }

    pub fn child(&self, name: &str) -> Option<&ArchiveNode> {
        self.children.iter().find(|child| child.name == name)
    }

    /// Follows `segments` (node names below this node).
    pub fn find<S: AsRef<str>>(&self, segments: &[S]) -> Option<&ArchiveNode> {
        let mut current = self;
        for segment in segments {
            current = current.child(segment.as_ref())?;
        }
        Some(current)
    }

    pub fn find_mut<S: AsRef<str>>(&mut self, segments: &[S]) -> Option<&mut ArchiveNode> {
        let mut current = self;
        for segment in segments {
            current = current
                .children
                .iter_mut()
                .find(|child| child.name == segment.as_ref())?;
        }
        Some(current)
    }

    /// Every tagged full path in depth-first order.
    pub fn leaf_paths(&self) -> Vec<String> {
        let mut out = Vec::new();
        collect_leaf_paths(self, &mut out);
        out
    }

    pub fn node_count(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(ArchiveNode::node_count)
            .sum::<usize>()
    }

    fn child_index_or_insert(&mut self, name: &str) -> usize {
        if let Some(index) = self.children.iter().position(|child| child.name == name) {
            return index;
        }
        self.children.push(ArchiveNode::directory(name));
        self.children.len() - 1
    }
}

fn collect_leaf_paths(node: &ArchiveNode, out: &mut Vec<String>) {
    if let Some(path) = &node.full_path {
        out.push(path.clone());
    }
    for child in &node.children {
        collect_leaf_paths(child, out);
    }
}

/// Builds a tree from `(full_path, is_directory)` pairs.
///
/// Entries are sorted by path first so the result does not depend on
/// central-directory order. Directories are synthesized from path segments;
/// an entry ending in `/` only ever produces directory nodes.
pub fn build<S: AsRef<str>>(
    root_name: &str,
    entries: impl IntoIterator<Item = (S, bool)>,
) -> ArchiveNode {
    let mut sorted: Vec<(String, bool)> = entries
        .into_iter()
        .map(|(path, is_dir)| (path.as_ref().to_string(), is_dir))
        .collect();
    sorted.sort_by(|left, right| left.0.cmp(&right.0));

    let mut root = ArchiveNode::directory(root_name);
    for (full_path, is_dir) in &sorted {
        insert_entry(&mut root, full_path, *is_dir || full_path.ends_with('/'));
    }
    root
}

fn insert_entry(root: &mut ArchiveNode, full_path: &str, is_dir: bool) {
    let segments: Vec<&str> = full_path
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect();
    let Some(last) = segments.len().checked_sub(1) else {
        return;
    };

    let mut parent = root;
    for (index, segment) in segments.iter().enumerate() {
        let child_index = parent.child_index_or_insert(segment);
        let node = &mut parent.children[child_index];
        if index == last && !is_dir && node.full_path.is_none() {
            node.full_path = Some(full_path.to_string());
            node.kind = if is_nested_archive_path(full_path) {
                NodeKind::NestedArchive(NestedState::Unresolved)
            } else {
                NodeKind::File
            };
        }
        parent = node;
    }
}

/// Opens the archive at `path` and builds its tree. The root is named after
/// the archive file.
pub fn build_archive_tree(path: &Path) -> BrowserResult<ArchiveNode> {
    let entries = list_entries(path)?;
    let root_name = path
        .file_name()
        .map(|segment| segment.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());
    tracing::debug!(archive = %path.display(), entries = entries.len(), "building archive tree");
    Ok(build(
        &root_name,
        entries.into_iter().map(|entry| (entry.name, entry.is_dir)),
    ))
}

/// Returns a pruned copy of `root` keeping nodes whose name contains `query`
/// (case-insensitive) and the branches leading to them. An empty query
/// returns a full copy. The input is never modified.
pub fn filter_tree(root: &ArchiveNode, query: &str) -> Option<ArchiveNode> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return Some(root.clone());
    }
    filter_node(root, &query)
}

fn filter_node(node: &ArchiveNode, query: &str) -> Option<ArchiveNode> {
    let found = node.name.to_lowercase().contains(query);
    let matches: Vec<ArchiveNode> = node
        .children
        .iter()
        .filter_map(|child| filter_node(child, query))
        .collect();
    if !found && matches.is_empty() {
        return None;
    }
    Some(ArchiveNode {
        name: node.name.clone(),
        full_path: node.full_path.clone(),
        kind: node.kind.clone(),
        children: matches,
    })
}
