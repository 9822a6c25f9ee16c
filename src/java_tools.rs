use std::path::PathBuf;

use crate::app_settings::DecompilerSettings;

// Where the decompiler jar ships next to the executable.
const BUNDLED_DECOMPILER_RELATIVE: &str = "assets/external/cfr.jar";

pub(crate) fn java_executable_file_name() -> &'static str {
    if cfg!(target_os = "windows") {
        "java.exe"
    } else {
        "java"
    }
}

/// Java launcher: configured path, then `$JAVA_HOME/bin/java`, then `java`
/// from `PATH`.
pub fn java_executable(settings: &DecompilerSettings) -> PathBuf {
    if let Some(configured) = settings.java_path.as_deref().map(str::trim) {
        if !configured.is_empty() {
            return PathBuf::from(configured);
        }
    }
    if let Some(home) = std::env::var_os("JAVA_HOME") {
        let candidate = PathBuf::from(home)
            .join("bin")
            .join(java_executable_file_name());
        if candidate.is_file() {
            return candidate;
        }
    }
    PathBuf::from(java_executable_file_name())
}

/// Every location checked for the decompiler jar, in priority order. A
/// configured jar replaces the bundled search entirely.
pub fn decompiler_candidates(settings: &DecompilerSettings) -> Vec<PathBuf> {
    if let Some(configured) = settings.decompiler_jar.as_deref().map(str::trim) {
        if !configured.is_empty() {
            return vec![PathBuf::from(configured)];
        }
    }

    let mut candidates = Vec::new();
    if let Ok(exe) = std::env::current_exe() {
        if let Some(exe_dir) = exe.parent() {
            candidates.push(exe_dir.join(BUNDLED_DECOMPILER_RELATIVE));
        }
    }
    candidates.push(PathBuf::from(BUNDLED_DECOMPILER_RELATIVE));
    candidates.push(PathBuf::from("..").join(BUNDLED_DECOMPILER_RELATIVE));
    candidates
}

/// First existing decompiler jar, canonicalized.
pub fn resolve_decompiler_jar(settings: &DecompilerSettings) -> Option<PathBuf> {
    decompiler_candidates(settings)
        .into_iter()
        .find(|candidate| candidate.is_file())
        .map(|candidate| dunce::canonicalize(&candidate).unwrap_or(candidate))
}
