#[cfg(target_os = "windows")]
use std::os::windows::process::CommandExt;
use std::{
    fs,
    io::{BufReader, Read},
    path::{Path, PathBuf},
    process::{Child, Command, Stdio},
    sync::Arc,
    thread::JoinHandle,
    time::{Duration, Instant},
};

use serde::Serialize;
use thiserror::Error;
use walkdir::WalkDir;

use crate::app_settings::DecompilerSettings;
use crate::archive_reader::ArchiveReader;
use crate::entry_kind::base_name;
use crate::error::BrowserError;
use crate::java_tools::{decompiler_candidates, java_executable, resolve_decompiler_jar};
use crate::jobs::CancelFlag;
use crate::workspace_io::{TempWorkspace, TempWorkspaceManager};
#[cfg(target_os = "windows")]
use crate::CREATE_NO_WINDOW;
use crate::{DECOMPILER_POLL_INTERVAL_MS, DECOMPILER_STDERR_MAX_BYTES};

const CLASS_SUFFIX: &str = ".class";
const OUTPUT_DIR_FLAG: &str = "--outputdir";

#[derive(Error, Debug)]
pub enum DecompileError {
    #[error("Class not found in archive: {0}")]
    EntryMissing(String),

    #[error("Archive unreadable: {0}")]
    ArchiveUnreadable(String),

    #[error("Decompiler not found; looked in: {}", .searched.join(", "))]
    ToolMissing { searched: Vec<String> },

    #[error("Failed to start decompiler: {0}")]
    ToolExecutionFailed(String),

    #[error("Decompiler exited with {} and produced no output", describe_exit(.code))]
    ToolNonzeroExit { code: Option<i32>, stderr: String },

    #[error("Decompiled file not found: {0}")]
    OutputNotFound(String),

    #[error("Failed to prepare decompiler workspace: {0}")]
    WorkspaceAllocationFailed(String),

    #[error("Decompiler timed out after {}s", .0.as_secs())]
    TimedOut(Duration),

    #[error("Decompilation cancelled")]
    Cancelled,
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("code {code}"),
        None => "a signal".to_string(),
    }
}

/// Source recovered for one class entry.
#[derive(Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct DecompiledSource {
    pub class_name: String,
    pub text: String,
    pub output_path: PathBuf,
    pub exit_code: Option<i32>,
    pub stderr: String,
}

pub type DecompileResult = Result<DecompiledSource, DecompileError>;

struct ProcessOutcome {
    code: Option<i32>,
    stderr: String,
}

/// Extract one `.class` entry, run the external decompiler on it and pick
/// up `<Base>.java` from its output directory.
///
/// Runs are independent: nothing is cached or deduplicated between calls.
pub struct DecompilationPipeline {
    settings: DecompilerSettings,
    workspaces: Arc<TempWorkspaceManager>,
    timeout: Option<Duration>,
}

impl DecompilationPipeline {
    pub fn new(settings: DecompilerSettings, workspaces: Arc<TempWorkspaceManager>) -> Self {
        let timeout = settings.timeout();
        Self {
            settings,
            workspaces,
            timeout,
        }
    }

    /// Overrides the timeout from the settings.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn decompile(&self, archive_path: &Path, class_entry: &str) -> DecompileResult {
        self.decompile_with_cancel(archive_path, class_entry, &CancelFlag::new())
    }

    pub fn decompile_with_cancel(
        &self,
        archive_path: &Path,
        class_entry: &str,
        cancel: &CancelFlag,
    ) -> DecompileResult {
        tracing::info!(archive = %archive_path.display(), entry = class_entry, "decompiling");

        // Entry and tool are checked before any workspace exists.
        let bytes = read_class_bytes(archive_path, class_entry)?;
        let tool = resolve_decompiler_jar(&self.settings).ok_or_else(|| {
            DecompileError::ToolMissing {
                searched: decompiler_candidates(&self.settings)
                    .iter()
                    .map(|candidate| candidate.display().to_string())
                    .collect(),
            }
        })?;

        let workspace = self
            .workspaces
            .allocate()
            .map_err(|error| DecompileError::WorkspaceAllocationFailed(error.to_string()))?;
        let file_name = base_name(class_entry);
        let class_file = workspace.extracted_file(file_name);
        fs::write(&class_file, bytes)
            .map_err(|error| DecompileError::WorkspaceAllocationFailed(error.to_string()))?;

        let command = self.build_command(&tool, &class_file, workspace.output_dir());
        let outcome = run_decompiler(command, self.timeout, cancel)?;
        if !outcome.stderr.trim().is_empty() {
            tracing::debug!(entry = class_entry, stderr = %outcome.stderr.trim(), "decompiler stderr");
        }

        let class_name = class_base_name(file_name);
        collect_output(&workspace, class_name, outcome)
    }

    fn build_command(&self, tool: &Path, class_file: &Path, output_dir: &Path) -> Command {
        let mut command = Command::new(java_executable(&self.settings));
        command
            .args(&self.settings.launcher_args)
            .arg(tool)
            .arg(class_file)
            .arg(OUTPUT_DIR_FLAG)
            .arg(output_dir)
            .args(&self.settings.extra_args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        #[cfg(target_os = "windows")]
        {
            command.creation_flags(CREATE_NO_WINDOW);
        }

        tracing::debug!(?command, "decompiler command");
        command
    }
}

fn read_class_bytes(archive_path: &Path, class_entry: &str) -> Result<Vec<u8>, DecompileError> {
    let mut reader = ArchiveReader::open(archive_path)
        .map_err(|error| DecompileError::ArchiveUnreadable(error.to_string()))?;
    reader.read_entry(class_entry).map_err(|error| match error {
        BrowserError::EntryNotFound(entry) => DecompileError::EntryMissing(entry),
        other => DecompileError::ArchiveUnreadable(other.to_string()),
    })
}

/// `Outer$Inner.class` -> `Outer$Inner`. Nested class names are not parsed.
pub fn class_base_name(file_name: &str) -> &str {
    let split = file_name.len().saturating_sub(CLASS_SUFFIX.len());
    match (file_name.get(..split), file_name.get(split..)) {
        (Some(stem), Some(suffix)) if !stem.is_empty() && suffix.eq_ignore_ascii_case(CLASS_SUFFIX) => {
            stem
        }
        _ => file_name,
    }
}

/// Recursive search for `<class_name>.java`; output depth is tool-defined.
pub fn find_decompiled_source(output_dir: &Path, class_name: &str) -> Option<PathBuf> {
    let wanted = format!("{class_name}.java");
    WalkDir::new(output_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .find(|entry| entry.file_type().is_file() && entry.file_name().to_string_lossy() == wanted)
        .map(|entry| entry.into_path())
}

fn collect_output(
    workspace: &TempWorkspace,
    class_name: &str,
    outcome: ProcessOutcome,
) -> DecompileResult {
    // The exit code is only consulted when nothing was produced.
    let Some(output_path) = find_decompiled_source(workspace.output_dir(), class_name) else {
        return Err(match outcome.code {
            Some(0) => DecompileError::OutputNotFound(format!("{class_name}.java")),
            code => DecompileError::ToolNonzeroExit {
                code,
                stderr: outcome.stderr,
            },
        });
    };

    let bytes = fs::read(&output_path)
        .map_err(|_| DecompileError::OutputNotFound(output_path.display().to_string()))?;
    Ok(DecompiledSource {
        class_name: class_name.to_string(),
        text: decode_process_output(bytes),
        output_path,
        exit_code: outcome.code,
        stderr: outcome.stderr,
    })
}

fn decode_process_output(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(error) => {
            let raw = error.into_bytes();
            String::from_utf8_lossy(&raw).into_owned()
        }
    }
}

fn spawn_pipe_reader<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<Vec<u8>>> {
    pipe.map(|pipe| {
        std::thread::spawn(move || {
            let mut reader = BufReader::new(pipe);
            let mut buffer = Vec::new();
            let _ = reader.read_to_end(&mut buffer);
            buffer
        })
    })
}

fn kill_and_reap(child: &mut Child) {
    match child.try_wait() {
        Ok(Some(_)) => {}
        _ => {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

fn run_decompiler(
    mut command: Command,
    timeout: Option<Duration>,
    cancel: &CancelFlag,
) -> Result<ProcessOutcome, DecompileError> {
    let mut child = command
        .spawn()
        .map_err(|error| DecompileError::ToolExecutionFailed(error.to_string()))?;
    // Readers are left detached on kill paths: a grandchild may still hold
    // the pipes open.
    let stdout_reader = spawn_pipe_reader(child.stdout.take());
    let stderr_reader = spawn_pipe_reader(child.stderr.take());

    let started = Instant::now();
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {}
            Err(error) => {
                kill_and_reap(&mut child);
                return Err(DecompileError::ToolExecutionFailed(error.to_string()));
            }
        }
        if cancel.is_cancelled() {
            kill_and_reap(&mut child);
            tracing::info!("decompiler cancelled");
            return Err(DecompileError::Cancelled);
        }
        if let Some(limit) = timeout {
            if started.elapsed() >= limit {
                kill_and_reap(&mut child);
                tracing::warn!(timeout_ms = limit.as_millis() as u64, "decompiler timed out");
                return Err(DecompileError::TimedOut(limit));
            }
        }
        std::thread::sleep(Duration::from_millis(DECOMPILER_POLL_INTERVAL_MS));
    };

    // stdout is drained so the tool never blocks on a full pipe; only stderr
    // is kept.
    if let Some(handle) = stdout_reader {
        let _ = handle.join();
    }
    let mut stderr = stderr_reader
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default();
    stderr.truncate(DECOMPILER_STDERR_MAX_BYTES);

    Ok(ProcessOutcome {
        code: status.code(),
        stderr: decode_process_output(stderr),
    })
}
