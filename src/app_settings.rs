use std::{path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};

use crate::workspace_io::{CleanupPolicy, TempWorkspaceManager};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DecompilerSettings {
    /// Java launcher; `None` means `$JAVA_HOME` or `PATH`.
    #[serde(default)]
    pub java_path: Option<String>,
    /// Decompiler jar; `None` means the bundled `assets/external/cfr.jar`.
    #[serde(default)]
    pub decompiler_jar: Option<String>,
    /// Arguments placed between the launcher and the jar.
    #[serde(default = "default_launcher_args")]
    pub launcher_args: Vec<String>,
    /// Arguments appended after `--outputdir <dir>`.
    #[serde(default)]
    pub extra_args: Vec<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for DecompilerSettings {
    fn default() -> Self {
        Self {
            java_path: None,
            decompiler_jar: None,
            launcher_args: default_launcher_args(),
            extra_args: Vec::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl DecompilerSettings {
    /// `None` when the timeout is disabled (zero).
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceSettings {
    #[serde(default)]
    pub scratch_root: Option<String>,
    #[serde(default)]
    pub cleanup: CleanupPolicy,
    #[serde(default = "default_retention_hours")]
    pub retention_hours: u64,
}

impl Default for WorkspaceSettings {
    fn default() -> Self {
        Self {
            scratch_root: None,
            cleanup: CleanupPolicy::default(),
            retention_hours: default_retention_hours(),
        }
    }
}

impl WorkspaceSettings {
    pub fn scratch_root(&self) -> PathBuf {
        match self.scratch_root.as_deref().map(str::trim) {
            Some(root) if !root.is_empty() => PathBuf::from(root),
            _ => TempWorkspaceManager::default_scratch_root(),
        }
    }

    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_hours.saturating_mul(60 * 60))
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AdvancedSettings {
    #[serde(default = "default_false")]
    pub debug_logging: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    #[serde(default)]
    pub decompiler: DecompilerSettings,
    #[serde(default)]
    pub workspace: WorkspaceSettings,
    #[serde(default)]
    pub advanced: AdvancedSettings,
}

impl AppSettings {
    pub fn debug_logging_enabled(&self) -> bool {
        self.advanced.debug_logging
    }
}

fn default_launcher_args() -> Vec<String> {
    vec!["-jar".to_string()]
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_retention_hours() -> u64 {
    24 * 14
}

fn default_false() -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_yields_defaults() {
        let parsed: AppSettings = serde_json::from_str("{}").expect("parse");
        assert_eq!(parsed, AppSettings::default());
        assert_eq!(parsed.decompiler.launcher_args, vec!["-jar".to_string()]);
        assert_eq!(parsed.workspace.cleanup, CleanupPolicy::DeleteOnDrop);
        assert!(!parsed.debug_logging_enabled());
    }

    #[test]
    fn partial_sections_keep_field_defaults() {
        let parsed: AppSettings = serde_json::from_str(
            r#"{"decompiler":{"javaPath":"/usr/bin/java"},"workspace":{"cleanup":"retain"}}"#,
        )
        .expect("parse");
        assert_eq!(parsed.decompiler.java_path.as_deref(), Some("/usr/bin/java"));
        assert_eq!(parsed.decompiler.timeout_secs, 120);
        assert_eq!(parsed.workspace.cleanup, CleanupPolicy::Retain);
        assert_eq!(parsed.workspace.retention_hours, 24 * 14);
    }

    #[test]
    fn zero_timeout_disables_it() {
        let settings = DecompilerSettings {
            timeout_secs: 0,
            ..DecompilerSettings::default()
        };
        assert_eq!(settings.timeout(), None);
        assert_eq!(
            DecompilerSettings::default().timeout(),
            Some(Duration::from_secs(120))
        );
    }

    #[test]
    fn blank_scratch_root_uses_system_temp() {
        let settings = WorkspaceSettings {
            scratch_root: Some(" ".to_string()),
            ..WorkspaceSettings::default()
        };
        assert_eq!(
            settings.scratch_root(),
            TempWorkspaceManager::default_scratch_root()
        );
    }
}
