use crate::config::Config;
use crate::host::{Host, HostError, HostEvent, SubscriptionId, WindowId};
use std::collections::HashMap;

/// Subscriptions held for one observed window. Both handles are released
/// together, either when the window is destroyed or on `disable`.
struct TrackedWindow {
    fullscreen_sub: SubscriptionId,
    destroyed_sub: SubscriptionId,
}

/// Per-window state machine: a window is either not pinned, or pinned to a
/// temporary workspace with its origin index recorded in `origins`.
///
/// Lifecycle is `enable` -> events -> `disable`; all state lives on the
/// instance and is fully cleared on `disable`, so a coordinator can be
/// re-enabled or driven by a test host without any process-wide setup.
pub struct FullscreenWorkspaceCoordinator {
    config: Config,
    tracked: HashMap<WindowId, TrackedWindow>,
    origins: HashMap<WindowId, usize>,
    created_sub: Option<SubscriptionId>,
}

impl FullscreenWorkspaceCoordinator {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            tracked: HashMap::new(),
            origins: HashMap::new(),
            created_sub: None,
        }
    }

    /// Starts tracking every window the host currently knows about and
    /// subscribes to the window-created stream.
    pub fn enable<H: Host>(&mut self, host: &mut H) -> Result<(), HostError> {
        for window in host.windows()? {
            if let Err(e) = self.track_window(host, window) {
                log::warn!("Could not track existing window {:?}: {}", window, e);
            }
        }
        self.created_sub = Some(host.subscribe_window_created()?);
        log::info!("Enabled, tracking {} windows", self.tracked.len());
        Ok(())
    }

    /// Releases every subscription and clears all bookkeeping. Windows and
    /// workspaces are left exactly as they are; a stale handle on an
    /// already-destroyed window never aborts the teardown.
    pub fn disable<H: Host>(&mut self, host: &mut H) {
        if let Some(sub) = self.created_sub.take() {
            release(host, sub);
        }
        for (_, entry) in self.tracked.drain() {
            release(host, entry.fullscreen_sub);
            release(host, entry.destroyed_sub);
        }
        self.origins.clear();
        log::info!("Disabled, all tracking cleared");
    }

    pub fn handle_event<H: Host>(&mut self, host: &mut H, event: HostEvent) {
        match event {
            HostEvent::WindowCreated(window) => {
                if let Err(e) = self.track_window(host, window) {
                    log::warn!("Could not track new window {:?}: {}", window, e);
                }
            }
            HostEvent::FullscreenChanged(window) => self.on_fullscreen_changed(host, window),
            HostEvent::WindowDestroyed(window) => self.on_window_destroyed(host, window),
        }
    }

    /// Subscribes to a window's fullscreen and destroy streams. Idempotent:
    /// a second call for the same window is a no-op, so duplicate creation
    /// events never produce duplicate subscriptions.
    pub fn track_window<H: Host>(
        &mut self,
        host: &mut H,
        window: WindowId,
    ) -> Result<(), HostError> {
        if self.tracked.contains_key(&window) {
            return Ok(());
        }

        let fullscreen_sub = host.subscribe_fullscreen_changed(window)?;
        let destroyed_sub = match host.subscribe_window_destroyed(window) {
            Ok(sub) => sub,
            Err(e) => {
                // Half-tracked windows would leak the first handle.
                release(host, fullscreen_sub);
                return Err(e);
            }
        };

        self.tracked.insert(
            window,
            TrackedWindow {
                fullscreen_sub,
                destroyed_sub,
            },
        );
        Ok(())
    }

    /// The whole state machine. Host failures mid-transition are logged and
    /// the transition abandoned; the window stays where it is and the
    /// bookkeeping stays consistent (no origin record without a parked
    /// window, no lost record for a still-parked one).
    pub fn on_fullscreen_changed<H: Host>(&mut self, host: &mut H, window: WindowId) {
        if let Err(e) = self.apply_transition(host, window) {
            log::error!("Fullscreen transition for {:?} failed: {}", window, e);
        }
    }

    fn apply_transition<H: Host>(
        &mut self,
        host: &mut H,
        window: WindowId,
    ) -> Result<(), HostError> {
        if host.is_fullscreen(window)? {
            if self.origins.contains_key(&window) {
                // Duplicate enter notification; parking again would stack a
                // second workspace and clobber the origin with the temp index.
                log::warn!("{:?} entered fullscreen while already pinned", window);
                return Ok(());
            }
            let origin = host.window_workspace(window)?;
            let temp = host.create_workspace(false)?;
            host.move_to_workspace(window, temp)?;
            // The move is what pins the window; record it before the
            // activate so a failed activate cannot leave a parked window
            // with no origin on file.
            self.origins.insert(window, origin);
            log::info!("Pinned {:?} (origin workspace {}) to {:?}", window, origin, temp);
            if self.config.activate_temporary {
                host.activate_workspace(temp)?;
            }
        } else {
            let Some(&origin) = self.origins.get(&window) else {
                // Never parked by us, or a duplicate leave notification.
                log::debug!("Ignoring leave-fullscreen for unpinned {:?}", window);
                return Ok(());
            };
            // The stored index is a snapshot; workspaces may have been
            // removed since, so clamp against the count right now.
            let count = host.workspace_count()?;
            let target = origin.min(count.saturating_sub(1));
            let workspace = host.workspace_at(target)?;
            host.move_to_workspace(window, workspace)?;
            self.origins.remove(&window);
            log::info!("Restored {:?} to workspace {}", window, target);
            if self.config.activate_on_restore {
                host.activate_workspace(workspace)?;
            }
        }
        Ok(())
    }

    /// Drops all state for a destroyed window, including an origin record it
    /// may still hold if it died while fullscreen.
    pub fn on_window_destroyed<H: Host>(&mut self, host: &mut H, window: WindowId) {
        if self.origins.remove(&window).is_some() {
            log::debug!("{:?} destroyed while pinned", window);
        }
        if let Some(entry) = self.tracked.remove(&window) {
            release(host, entry.fullscreen_sub);
            release(host, entry.destroyed_sub);
        }
    }

    pub fn tracked_count(&self) -> usize {
        self.tracked.len()
    }
}

fn release<H: Host>(host: &mut H, sub: SubscriptionId) {
    if let Err(e) = host.unsubscribe(sub) {
        log::debug!("Releasing {:?}: {}", sub, e);
    }
}
