use thiserror::Error;

/// Stable identifier for a window, assigned by the host compositor.
/// The coordinator never owns the window it refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WindowId(pub u32);

/// A position in the host's workspace list at the moment it was queried.
/// Workspace indices shift when workspaces are created or removed, so a
/// `WorkspaceId` is only good for the operation it was fetched for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WorkspaceId(pub u32);

/// Handle to an active event subscription. Owned by the subscriber and
/// released exactly once via [`Host::unsubscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

#[derive(Debug, Error)]
pub enum HostError {
    /// The window or handle behind an operation is already gone. Expected
    /// during teardown; callers discard it per-handle.
    #[error("stale handle: {0}")]
    Stale(String),
    /// The host rejected or garbled an operation.
    #[error("host protocol error: {0}")]
    Protocol(String),
    /// The link to the host is dead; nothing further will work.
    #[error("host connection lost: {0}")]
    Connection(String),
}

/// An event observed on the host's serialized queue.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HostEvent {
    WindowCreated(WindowId),
    FullscreenChanged(WindowId),
    WindowDestroyed(WindowId),
}

/// Everything the coordinator needs from the compositor it runs against.
///
/// All calls are synchronous and immediately effective from the caller's
/// point of view; there is no retry or cancellation concept at this layer.
pub trait Host {
    /// Snapshot of the windows currently known to the host.
    fn windows(&mut self) -> Result<Vec<WindowId>, HostError>;

    fn subscribe_window_created(&mut self) -> Result<SubscriptionId, HostError>;
    fn subscribe_fullscreen_changed(
        &mut self,
        window: WindowId,
    ) -> Result<SubscriptionId, HostError>;
    fn subscribe_window_destroyed(
        &mut self,
        window: WindowId,
    ) -> Result<SubscriptionId, HostError>;

    /// Releases a subscription. Must be safe to call on a handle whose
    /// underlying window is already gone; a `Stale` error is acceptable,
    /// anything that would abort a bulk teardown is not.
    fn unsubscribe(&mut self, sub: SubscriptionId) -> Result<(), HostError>;

    fn is_fullscreen(&mut self, window: WindowId) -> Result<bool, HostError>;
    fn window_workspace(&mut self, window: WindowId) -> Result<usize, HostError>;

    fn workspace_count(&mut self) -> Result<usize, HostError>;
    fn workspace_at(&mut self, index: usize) -> Result<WorkspaceId, HostError>;
    /// Appends a new, empty workspace at the end of the list.
    fn create_workspace(&mut self, activate: bool) -> Result<WorkspaceId, HostError>;
    fn move_to_workspace(
        &mut self,
        window: WindowId,
        workspace: WorkspaceId,
    ) -> Result<(), HostError>;
    fn activate_workspace(&mut self, workspace: WorkspaceId) -> Result<(), HostError>;
}
