use crate::app_settings::AppSettings;
use crate::java_tools::{decompiler_candidates, java_executable, resolve_decompiler_jar};
use crate::launch_io::collect_startup_jar_paths;
use crate::settings_io::settings_path;

/// Lines describing the environment the browser starts in.
pub fn startup_diagnostic_lines(settings: &AppSettings) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    let mut push = |text: String| {
        lines.push(text);
    };

    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|duration| duration.as_secs())
        .unwrap_or_default();
    push("[startup] mizu diagnostics (debug logging enabled)".to_string());
    push(format!("[startup] timestamp_unix: {}", now));
    push(format!("[startup] version: {}", env!("CARGO_PKG_VERSION")));
    push(format!(
        "[startup] os: {} / arch: {}",
        std::env::consts::OS,
        std::env::consts::ARCH
    ));
    if let Ok(exe) = std::env::current_exe() {
        push(format!("[startup] exe: {}", exe.display()));
    }
    match settings_path() {
        Ok(path) => push(format!("[startup] settings_path: {}", path.display())),
        Err(error) => push(format!("[startup] settings_path: <{}>", error)),
    }
    push(format!(
        "[startup] scratch_root: {}",
        settings.workspace.scratch_root().display()
    ));
    push(format!(
        "[startup] cleanup: {:?} / retention_hours: {}",
        settings.workspace.cleanup, settings.workspace.retention_hours
    ));

    let raw_args = std::env::args_os()
        .skip(1)
        .map(|arg| arg.to_string_lossy().to_string())
        .collect::<Vec<String>>();
    push(format!("[startup] launch_args: {:?}", raw_args));
    push(format!(
        "[startup] parsed_launch_jar_paths: {:?}",
        collect_startup_jar_paths()
    ));

    push(format!(
        "[startup] java: {}",
        java_executable(&settings.decompiler).display()
    ));
    push("[startup] decompiler candidates:".to_string());
    for candidate in decompiler_candidates(&settings.decompiler) {
        let status = if candidate.is_file() { "ok" } else { "missing" };
        push(format!("  - {} [{}]", candidate.display(), status));
    }
    match resolve_decompiler_jar(&settings.decompiler) {
        Some(resolved) => push(format!("[startup] resolved: {}", resolved.display())),
        None => push("[startup] resolved: <none>".to_string()),
    }

    lines
}

pub fn log_startup_diagnostics(settings: &AppSettings) {
    for line in startup_diagnostic_lines(settings) {
        tracing::info!("{}", line);
    }
}
