use crate::crosshair::settings::CrosshairSettings;
use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};

pub const SETTINGS_FILE_NAME: &str = "settings.json";
pub const SETTINGS_DIR_NAME: &str = "MouseCross";
/// Overrides the settings file location when set.
pub const SETTINGS_PATH_ENV: &str = "MOUSE_CROSS_SETTINGS";

pub fn settings_path_from_exe_path(exe_path: &Path) -> Result<PathBuf> {
    let parent = exe_path
        .parent()
        .ok_or_else(|| anyhow!("executable path has no parent: {}", exe_path.display()))?;
    Ok(parent.join(SETTINGS_FILE_NAME))
}

pub fn settings_path_in_config_dir(config_dir: &Path) -> PathBuf {
    config_dir.join(SETTINGS_DIR_NAME).join(SETTINGS_FILE_NAME)
}

pub fn resolve_settings_path() -> Result<PathBuf> {
    if let Some(path) = std::env::var_os(SETTINGS_PATH_ENV).filter(|value| !value.is_empty()) {
        return Ok(PathBuf::from(path));
    }

    if let Some(config_dir) = dirs_next::config_dir() {
        return Ok(settings_path_in_config_dir(&config_dir));
    }

    let exe_path = std::env::current_exe().context("resolve current executable")?;
    settings_path_from_exe_path(&exe_path)
}

pub fn load_or_default(settings_path: &Path) -> Result<CrosshairSettings> {
    Ok(load_from_path(settings_path)?.unwrap_or_default())
}

/// Returns `None` when the file does not exist. An empty file counts as
/// "all defaults".
pub fn load_from_path(settings_path: &Path) -> Result<Option<CrosshairSettings>> {
    if !settings_path.exists() {
        return Ok(None);
    }

    let content = std::fs::read_to_string(settings_path)
        .with_context(|| format!("read settings file {}", settings_path.display()))?;

    if content.trim().is_empty() {
        return Ok(Some(CrosshairSettings::default()));
    }

    let mut loaded: CrosshairSettings = serde_json::from_str(&content)
        .with_context(|| format!("deserialize settings file {}", settings_path.display()))?;
    if loaded.sanitize() {
        tracing::info!(
            path = %settings_path.display(),
            "settings file contained out-of-range values; clamped"
        );
    }
    Ok(Some(loaded))
}

pub fn save_to_path(settings_path: &Path, settings: &CrosshairSettings) -> Result<()> {
    if let Some(parent) = settings_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create settings folder {}", parent.display()))?;
    }

    let mut sanitized = settings.clone();
    sanitized.sanitize();
    let json = serde_json::to_string_pretty(&sanitized).context("serialize crosshair settings")?;
    std::fs::write(settings_path, json)
        .with_context(|| format!("write settings file {}", settings_path.display()))
}
