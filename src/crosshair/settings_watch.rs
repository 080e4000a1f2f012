use crate::crosshair::host::HostHandle;
use anyhow::{anyhow, Context, Result};
use notify_debouncer_mini::{new_debouncer_opt, notify::RecursiveMode, Config, Debouncer};
use std::path::{Path, PathBuf};
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_secs(1);
const DEBOUNCE_TIMEOUT: Duration = Duration::from_millis(300);

type SettingsDebouncer = Debouncer<notify_debouncer_mini::notify::PollWatcher>;

/// Keeps the settings file watched for as long as it is alive.
pub struct SettingsWatcher {
    _debouncer: SettingsDebouncer,
    path: PathBuf,
}

impl SettingsWatcher {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Watches the folder holding `settings_path` and asks the host to reload
/// whenever the file itself changes. The folder is created if missing so
/// the first save is seen too.
pub fn watch_settings_file(settings_path: &Path, host: HostHandle) -> Result<SettingsWatcher> {
    let directory = settings_path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .ok_or_else(|| anyhow!("settings path has no folder: {}", settings_path.display()))?
        .to_path_buf();
    std::fs::create_dir_all(&directory)
        .with_context(|| format!("create settings folder {}", directory.display()))?;

    let target = settings_path.to_path_buf();
    let notify_config =
        notify_debouncer_mini::notify::Config::default().with_poll_interval(POLL_INTERVAL);
    let debouncer_config = Config::default()
        .with_timeout(DEBOUNCE_TIMEOUT)
        .with_notify_config(notify_config);

    let mut debouncer = new_debouncer_opt::<_, notify_debouncer_mini::notify::PollWatcher>(
        debouncer_config,
        move |res: notify_debouncer_mini::DebounceEventResult| match res {
            Ok(events) => {
                if events
                    .iter()
                    .any(|event| is_settings_event(&event.path, &target))
                {
                    tracing::debug!(path = %target.display(), "settings file changed");
                    if !host.reload_settings() {
                        tracing::debug!("overlay host gone; settings change ignored");
                    }
                }
            }
            Err(error) => {
                tracing::warn!(%error, "settings watcher error");
            }
        },
    )
    .context("create settings file watcher")?;

    debouncer
        .watcher()
        .watch(&directory, RecursiveMode::NonRecursive)
        .with_context(|| format!("watch settings folder {}", directory.display()))?;

    tracing::debug!(path = %settings_path.display(), "watching settings file");
    Ok(SettingsWatcher {
        _debouncer: debouncer,
        path: settings_path.to_path_buf(),
    })
}

/// Events are reported for the whole folder; only the settings file counts.
pub fn is_settings_event(event_path: &Path, settings_path: &Path) -> bool {
    event_path.file_name().is_some() && event_path.file_name() == settings_path.file_name()
}

#[cfg(test)]
mod tests {
    use super::{is_settings_event, watch_settings_file};
    use crate::crosshair::host::HostHandle;
    use std::path::Path;

    #[test]
    fn only_the_settings_file_triggers_reload() {
        let settings = Path::new("/home/user/.config/MouseCross/settings.json");
        assert!(is_settings_event(
            Path::new("/home/user/.config/MouseCross/settings.json"),
            settings
        ));
        assert!(!is_settings_event(
            Path::new("/home/user/.config/MouseCross/settings.json.tmp"),
            settings
        ));
        assert!(!is_settings_event(Path::new("/"), settings));
    }

    #[test]
    fn watcher_creates_missing_folder() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("nested").join("settings.json");
        let (handle, _rx) = HostHandle::channel();

        let watcher = watch_settings_file(&path, handle).expect("watch");
        assert!(path.parent().expect("parent").is_dir());
        assert_eq!(watcher.path(), path.as_path());
    }

    #[test]
    fn bare_file_name_is_rejected() {
        let (handle, _rx) = HostHandle::channel();
        assert!(watch_settings_file(Path::new("settings.json"), handle).is_err());
    }
}
