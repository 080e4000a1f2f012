use crate::crosshair::messages::{parse_command, HostMessage};
use crate::crosshair::renderer::CrosshairRenderer;
use crate::crosshair::settings::RenderSettings;
use crate::crosshair::settings_store;
use std::io::BufRead;
use std::ops::ControlFlow;
use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::time::{Duration, Instant};

/// How often the loop wakes while the crosshair is hidden, so window-system
/// events keep draining.
pub const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Cloneable sender for whoever drives the overlay (tray menu, hotkey,
/// stdin). Every method returns `false` once the host has shut down.
#[derive(Debug, Clone)]
pub struct HostHandle {
    tx: Sender<HostMessage>,
}

impl HostHandle {
    pub fn channel() -> (HostHandle, Receiver<HostMessage>) {
        let (tx, rx) = channel();
        (HostHandle { tx }, rx)
    }

    pub fn send(&self, message: HostMessage) -> bool {
        self.tx.send(message).is_ok()
    }

    pub fn toggle(&self) -> bool {
        self.send(HostMessage::Toggle)
    }

    pub fn show(&self) -> bool {
        self.send(HostMessage::Show)
    }

    pub fn hide(&self) -> bool {
        self.send(HostMessage::Hide)
    }

    pub fn apply_settings(&self, settings: RenderSettings) -> bool {
        self.send(HostMessage::ApplySettings(settings))
    }

    pub fn reload_settings(&self) -> bool {
        self.send(HostMessage::ReloadSettings)
    }

    pub fn shutdown(&self) -> bool {
        self.send(HostMessage::Shutdown)
    }
}

/// Forwards `t`/`s`/`h`/`r`/`q` lines to the host until the input ends or
/// the host goes away. End of input leaves the host running; launchers
/// often start the binary with stdin closed.
pub fn forward_commands(input: impl BufRead, handle: &HostHandle) {
    for line in input.lines() {
        let Ok(line) = line else { break };
        match parse_command(&line) {
            Some(message) => {
                if !handle.send(message) {
                    return;
                }
            }
            None if line.trim().is_empty() => {}
            None => tracing::warn!(command = %line.trim(), "unknown command"),
        }
    }
    tracing::debug!("command input closed");
}

/// Drives a [`CrosshairRenderer`] on the current thread: ticks it on the
/// frame cadence and applies [`HostMessage`]s in between.
pub struct OverlayHost {
    renderer: CrosshairRenderer,
    rx: Receiver<HostMessage>,
    handle: HostHandle,
    settings_path: Option<PathBuf>,
}

impl OverlayHost {
    pub fn new(renderer: CrosshairRenderer, settings_path: Option<PathBuf>) -> Self {
        let (handle, rx) = HostHandle::channel();
        Self {
            renderer,
            rx,
            handle,
            settings_path,
        }
    }

    pub fn handle(&self) -> HostHandle {
        self.handle.clone()
    }

    pub fn renderer(&self) -> &CrosshairRenderer {
        &self.renderer
    }

    /// Runs until [`HostMessage::Shutdown`], then releases the overlay.
    pub fn run(&mut self) {
        tracing::info!("overlay host running");
        'run: loop {
            self.renderer.tick(Instant::now());
            let wait = self
                .renderer
                .time_until_next_tick(Instant::now())
                .unwrap_or(IDLE_POLL_INTERVAL);

            let mut pending = match self.rx.recv_timeout(wait) {
                Ok(message) => Some(message),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            };
            // Drain the backlog before the next tick.
            while let Some(message) = pending {
                if self.handle_message(message).is_break() {
                    break 'run;
                }
                pending = self.rx.try_recv().ok();
            }
        }
        self.renderer.cleanup();
        tracing::info!("overlay host stopped");
    }

    pub fn handle_message(&mut self, message: HostMessage) -> ControlFlow<()> {
        tracing::debug!(?message, "overlay host message");
        match message {
            HostMessage::Toggle => {
                self.renderer.toggle();
            }
            HostMessage::Show => self.renderer.start_rendering(),
            HostMessage::Hide => self.renderer.stop_rendering(),
            HostMessage::ApplySettings(settings) => self.renderer.update_settings(settings),
            HostMessage::ReloadSettings => self.reload_settings(),
            HostMessage::Shutdown => return ControlFlow::Break(()),
        }
        ControlFlow::Continue(())
    }

    fn reload_settings(&mut self) {
        let Some(path) = self.settings_path.as_deref() else {
            tracing::debug!("no settings file configured; reload skipped");
            return;
        };
        match settings_store::load_or_default(path) {
            Ok(settings) => {
                tracing::info!(path = %path.display(), "settings reloaded");
                self.renderer.update_settings(settings.snapshot());
            }
            Err(err) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %format!("{err:#}"),
                    "settings reload failed; keeping current settings"
                );
            }
        }
    }
}
