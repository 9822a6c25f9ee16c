//! Core of the Mizu Java archive browser.
//!
//! Opens a jar, turns its flat entry list into a tree, reads entry content,
//! expands jars nested inside jars and runs an external decompiler for
//! `.class` entries. Nothing here depends on a UI toolkit; a host renders
//! [`archive_tree::ArchiveNode`] however it likes.

pub mod app_settings;
pub mod archive_reader;
pub mod archive_tree;
pub mod browser_session;
pub mod command_error;
pub mod content_io;
pub mod decompiler_io;
pub mod entry_kind;
pub mod error;
pub mod java_tools;
pub mod jobs;
pub mod launch_io;
pub mod nested_archive;
pub mod settings_io;
pub mod startup_diagnostics;
pub mod workspace_io;
pub mod workspace_session;

#[cfg(test)]
pub(crate) mod test_support;

pub use archive_tree::{build, filter_tree, ArchiveNode, NestedState, NodeKind};
pub use browser_session::{ArchiveSession, Selection};
pub use content_io::{read_entry_content, ContentPayload};
pub use decompiler_io::{DecompilationPipeline, DecompileError, DecompileResult, DecompiledSource};
pub use entry_kind::{classify, ContentKind};
pub use error::{BrowserError, BrowserResult};
pub use jobs::{BackgroundJob, CancelFlag, JobError};
pub use nested_archive::{resolve, resolve_node, resolve_with_cancel, ResolvedArchive};
pub use workspace_io::{CleanupPolicy, TempWorkspace, TempWorkspaceManager};

// Poll interval while waiting on the decompiler subprocess.
pub(crate) const DECOMPILER_POLL_INTERVAL_MS: u64 = 25;

// Cap on captured decompiler stderr kept for diagnostics.
pub(crate) const DECOMPILER_STDERR_MAX_BYTES: usize = 64 * 1024;

#[cfg(target_os = "windows")]
pub(crate) const CREATE_NO_WINDOW: u32 = 0x0800_0000;
