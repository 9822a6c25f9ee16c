use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::app_settings::AppSettings;
use crate::command_error::{to_command_error, CommandResult};

const SETTINGS_ENV_OVERRIDE: &str = "MIZU_SETTINGS";
const SETTINGS_DIR: &str = "mizu";
const SETTINGS_FILE: &str = "settings.json";

/// `$MIZU_SETTINGS`, else `<config dir>/mizu/settings.json`.
pub fn settings_path() -> CommandResult<PathBuf> {
    if let Some(path) = std::env::var_os(SETTINGS_ENV_OVERRIDE) {
        if !path.is_empty() {
            return Ok(PathBuf::from(path));
        }
    }
    let config_dir =
        dirs::config_dir().ok_or_else(|| "No configuration directory available".to_string())?;
    Ok(config_dir.join(SETTINGS_DIR).join(SETTINGS_FILE))
}

/// Missing file means defaults; a corrupt file is an error here.
pub fn read_settings(path: &Path) -> CommandResult<AppSettings> {
    if !path.exists() {
        return Ok(AppSettings::default());
    }
    let contents = fs::read_to_string(path).map_err(to_command_error)?;
    serde_json::from_str::<AppSettings>(&contents).map_err(to_command_error)
}

pub fn write_settings(path: &Path, settings: &AppSettings) -> CommandResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(to_command_error)?;
    }
    let payload = serde_json::to_string_pretty(settings).map_err(to_command_error)?;
    fs::write(path, payload).map_err(to_command_error)
}

/// Settings for startup: never fails, falls back to defaults.
pub fn load_startup_settings() -> AppSettings {
    let Ok(path) = settings_path() else {
        return AppSettings::default();
    };
    match read_settings(&path) {
        Ok(settings) => settings,
        Err(error) => {
            tracing::warn!(path = %path.display(), %error, "ignoring unreadable settings");
            AppSettings::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::JarFixture;
    use crate::workspace_io::CleanupPolicy;

    #[test]
    fn missing_file_reads_as_defaults() {
        let fixture = JarFixture::new("settings-missing");
        let settings = read_settings(&fixture.path("settings.json")).expect("defaults");
        assert_eq!(settings, AppSettings::default());
    }

    #[test]
    fn write_then_read_preserves_values() {
        let fixture = JarFixture::new("settings-write");
        let path = fixture.path("nested/settings.json");
        let mut settings = AppSettings::default();
        settings.decompiler.timeout_secs = 5;
        settings.workspace.cleanup = CleanupPolicy::Retain;
        settings.advanced.debug_logging = true;

        write_settings(&path, &settings).expect("write");
        let contents = fs::read_to_string(&path).expect("read raw");
        assert!(contents.contains("\"timeoutSecs\": 5"));
        assert_eq!(read_settings(&path).expect("read"), settings);
    }

    #[test]
    fn corrupt_file_is_reported() {
        let fixture = JarFixture::new("settings-corrupt");
        let path = fixture.path("settings.json");
        fs::write(&path, "{ not json").expect("write");
        assert!(read_settings(&path).is_err());
    }
}
