use crate::host::{Host, HostError, HostEvent, SubscriptionId, WindowId, WorkspaceId};
use std::collections::HashMap;
use x11rb::connection::Connection;
use x11rb::errors::{ConnectionError, ReplyError};
use x11rb::protocol::ErrorKind;
use x11rb::protocol::Event;
use x11rb::protocol::xproto::{
    AtomEnum, CLIENT_MESSAGE_EVENT, ChangeWindowAttributesAux, ClientMessageData,
    ClientMessageEvent, ConnectionExt, EventMask, Window,
};
use x11rb::rust_connection::RustConnection;

x11rb::atom_manager! {
    Atoms: AtomsCookie {
        _NET_CLIENT_LIST,
        _NET_WM_STATE,
        _NET_WM_STATE_FULLSCREEN,
        _NET_WM_DESKTOP,
        _NET_NUMBER_OF_DESKTOPS,
        _NET_CURRENT_DESKTOP,
    }
}

impl From<ConnectionError> for HostError {
    fn from(e: ConnectionError) -> Self {
        HostError::Connection(e.to_string())
    }
}

impl From<ReplyError> for HostError {
    fn from(e: ReplyError) -> Self {
        match e {
            ReplyError::ConnectionError(c) => HostError::Connection(c.to_string()),
            ReplyError::X11Error(x) => match x.error_kind {
                // The id no longer names anything; the window is gone.
                ErrorKind::Window | ErrorKind::Drawable | ErrorKind::Match => {
                    HostError::Stale(format!("{:?}", x.error_kind))
                }
                kind => HostError::Protocol(format!("{:?}", kind)),
            },
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Interest {
    Created,
    Fullscreen(Window),
    Destroyed(Window),
}

/// EWMH binding: workspaces are virtual desktops and every mutation goes
/// through root-window client messages, so this works alongside any
/// EWMH-compliant window manager rather than replacing it.
///
/// X11 has no per-listener subscription handles, so subscriptions are rows
/// in an interest registry: events are only surfaced from `next_event` while
/// a matching row exists, and a window's event mask is the union of the
/// masks its rows need.
pub struct X11Host {
    conn: RustConnection,
    root: Window,
    atoms: Atoms,
    subs: HashMap<SubscriptionId, Interest>,
    next_sub: u64,
    // Last fullscreen state seen per window; _NET_WM_STATE changes for
    // other reasons too, and only real flips should reach the coordinator.
    fullscreen_cache: HashMap<Window, bool>,
}

impl X11Host {
    pub fn connect() -> Result<Self, HostError> {
        let (conn, screen_num) =
            x11rb::connect(None).map_err(|e| HostError::Connection(e.to_string()))?;
        let root = conn.setup().roots[screen_num].root;
        let atoms = Atoms::new(&conn)?.reply()?;

        // New and destroyed toplevels announce themselves on the root.
        let change =
            ChangeWindowAttributesAux::new().event_mask(EventMask::SUBSTRUCTURE_NOTIFY);
        conn.change_window_attributes(root, &change)?.check()?;
        conn.flush()?;

        log::info!("Connected to X11, root window {:#x}", root);
        Ok(Self {
            conn,
            root,
            atoms,
            subs: HashMap::new(),
            next_sub: 0,
            fullscreen_cache: HashMap::new(),
        })
    }

    /// Blocks until the next event somebody has subscribed to.
    pub fn next_event(&mut self) -> Result<HostEvent, HostError> {
        loop {
            self.conn.flush()?;
            let event = self.conn.wait_for_event()?;
            if let Some(translated) = self.translate(event) {
                return Ok(translated);
            }
        }
    }

    fn translate(&mut self, event: Event) -> Option<HostEvent> {
        match event {
            Event::MapNotify(e) => {
                // Toplevels map on the root; remaps of known windows are
                // filtered out by the coordinator's idempotent tracking.
                if e.event == self.root
                    && !e.override_redirect
                    && self.subs.values().any(|i| *i == Interest::Created)
                {
                    return Some(HostEvent::WindowCreated(WindowId(e.window)));
                }
            }
            Event::DestroyNotify(e) => {
                // Per-window StructureNotify copy only, so the root's
                // SubstructureNotify copy does not double-fire.
                if e.event == e.window && self.has_interest(Interest::Destroyed(e.window)) {
                    self.fullscreen_cache.remove(&e.window);
                    return Some(HostEvent::WindowDestroyed(WindowId(e.window)));
                }
            }
            Event::PropertyNotify(e) => {
                if e.atom == self.atoms._NET_WM_STATE
                    && self.has_interest(Interest::Fullscreen(e.window))
                {
                    match self.query_fullscreen(e.window) {
                        Ok(now) => {
                            if self.fullscreen_cache.insert(e.window, now) != Some(now) {
                                return Some(HostEvent::FullscreenChanged(WindowId(e.window)));
                            }
                        }
                        // Window raced away; its DestroyNotify will follow.
                        Err(err) => log::debug!(
                            "Dropping _NET_WM_STATE change on {:#x}: {}",
                            e.window,
                            err
                        ),
                    }
                }
            }
            _ => {}
        }
        None
    }

    fn has_interest(&self, interest: Interest) -> bool {
        self.subs.values().any(|i| *i == interest)
    }

    fn alloc(&mut self, interest: Interest) -> SubscriptionId {
        let sub = SubscriptionId(self.next_sub);
        self.next_sub += 1;
        self.subs.insert(sub, interest);
        sub
    }

    fn window_mask(&self, window: Window) -> EventMask {
        let mut mask = EventMask::NO_EVENT;
        for interest in self.subs.values() {
            match *interest {
                Interest::Fullscreen(w) if w == window => {
                    mask = mask | EventMask::PROPERTY_CHANGE;
                }
                Interest::Destroyed(w) if w == window => {
                    mask = mask | EventMask::STRUCTURE_NOTIFY;
                }
                _ => {}
            }
        }
        mask
    }

    fn refresh_window_mask(&mut self, window: Window) -> Result<(), HostError> {
        let change = ChangeWindowAttributesAux::new().event_mask(self.window_mask(window));
        self.conn.change_window_attributes(window, &change)?.check()?;
        Ok(())
    }

    fn query_fullscreen(&self, window: Window) -> Result<bool, HostError> {
        let reply = self
            .conn
            .get_property(false, window, self.atoms._NET_WM_STATE, AtomEnum::ATOM, 0, 64)?
            .reply()?;
        Ok(reply
            .value32()
            .is_some_and(|mut atoms| atoms.any(|a| a == self.atoms._NET_WM_STATE_FULLSCREEN)))
    }

    fn root_u32(&self, atom: u32) -> Result<Option<u32>, HostError> {
        let reply = self
            .conn
            .get_property(false, self.root, atom, AtomEnum::CARDINAL, 0, 1)?
            .reply()?;
        Ok(reply.value32().and_then(|mut v| v.next()))
    }

    fn send_root_message(
        &self,
        window: Window,
        type_: u32,
        data: [u32; 5],
    ) -> Result<(), HostError> {
        let event = ClientMessageEvent {
            response_type: CLIENT_MESSAGE_EVENT,
            format: 32,
            sequence: 0,
            window,
            type_,
            data: ClientMessageData::from(data),
        };
        self.conn.send_event(
            false,
            self.root,
            EventMask::SUBSTRUCTURE_REDIRECT | EventMask::SUBSTRUCTURE_NOTIFY,
            &event,
        )?;
        self.conn.flush()?;
        Ok(())
    }
}

impl Host for X11Host {
    fn windows(&mut self) -> Result<Vec<WindowId>, HostError> {
        let reply = self
            .conn
            .get_property(
                false,
                self.root,
                self.atoms._NET_CLIENT_LIST,
                AtomEnum::WINDOW,
                0,
                4096,
            )?
            .reply()?;
        Ok(reply
            .value32()
            .map(|windows| windows.map(WindowId).collect())
            .unwrap_or_default())
    }

    fn subscribe_window_created(&mut self) -> Result<SubscriptionId, HostError> {
        // Root mask is set once at connect; this only registers interest.
        Ok(self.alloc(Interest::Created))
    }

    fn subscribe_fullscreen_changed(
        &mut self,
        window: WindowId,
    ) -> Result<SubscriptionId, HostError> {
        let state = self.query_fullscreen(window.0)?;
        let sub = self.alloc(Interest::Fullscreen(window.0));
        if let Err(e) = self.refresh_window_mask(window.0) {
            self.subs.remove(&sub);
            return Err(e);
        }
        self.fullscreen_cache.insert(window.0, state);
        Ok(sub)
    }

    fn subscribe_window_destroyed(
        &mut self,
        window: WindowId,
    ) -> Result<SubscriptionId, HostError> {
        let sub = self.alloc(Interest::Destroyed(window.0));
        if let Err(e) = self.refresh_window_mask(window.0) {
            self.subs.remove(&sub);
            return Err(e);
        }
        Ok(sub)
    }

    fn unsubscribe(&mut self, sub: SubscriptionId) -> Result<(), HostError> {
        let Some(interest) = self.subs.remove(&sub) else {
            return Ok(());
        };
        let window = match interest {
            Interest::Created => return Ok(()),
            Interest::Fullscreen(w) | Interest::Destroyed(w) => w,
        };
        if self.window_mask(window) == EventMask::NO_EVENT {
            self.fullscreen_cache.remove(&window);
        }
        // The window may already be destroyed; a failed mask update on a
        // dead id is exactly the stale case and never an error here.
        if let Err(e) = self.refresh_window_mask(window) {
            log::debug!("Clearing event mask on {:#x}: {}", window, e);
        }
        Ok(())
    }

    fn is_fullscreen(&mut self, window: WindowId) -> Result<bool, HostError> {
        self.query_fullscreen(window.0)
    }

    fn window_workspace(&mut self, window: WindowId) -> Result<usize, HostError> {
        let reply = self
            .conn
            .get_property(
                false,
                window.0,
                self.atoms._NET_WM_DESKTOP,
                AtomEnum::CARDINAL,
                0,
                1,
            )?
            .reply()?;
        let desktop = reply.value32().and_then(|mut v| v.next()).unwrap_or(0);
        // 0xFFFFFFFF marks a sticky window shown on every workspace.
        if desktop == u32::MAX {
            return Ok(0);
        }
        Ok(desktop as usize)
    }

    fn workspace_count(&mut self) -> Result<usize, HostError> {
        let count = self.root_u32(self.atoms._NET_NUMBER_OF_DESKTOPS)?.unwrap_or(1);
        Ok(count.max(1) as usize)
    }

    fn workspace_at(&mut self, index: usize) -> Result<WorkspaceId, HostError> {
        if index >= self.workspace_count()? {
            return Err(HostError::Protocol(format!("no workspace at {}", index)));
        }
        Ok(WorkspaceId(index as u32))
    }

    fn create_workspace(&mut self, activate: bool) -> Result<WorkspaceId, HostError> {
        // Pagers grow the desktop list by rewriting the count; the new
        // workspace is the last index.
        let count = self.workspace_count()? as u32;
        self.send_root_message(
            self.root,
            self.atoms._NET_NUMBER_OF_DESKTOPS,
            [count + 1, 0, 0, 0, 0],
        )?;
        let workspace = WorkspaceId(count);
        if activate {
            self.activate_workspace(workspace)?;
        }
        Ok(workspace)
    }

    fn move_to_workspace(
        &mut self,
        window: WindowId,
        workspace: WorkspaceId,
    ) -> Result<(), HostError> {
        // Source indication 2: request comes from a pager-like tool.
        self.send_root_message(window.0, self.atoms._NET_WM_DESKTOP, [workspace.0, 2, 0, 0, 0])
    }

    fn activate_workspace(&mut self, workspace: WorkspaceId) -> Result<(), HostError> {
        self.send_root_message(
            self.root,
            self.atoms._NET_CURRENT_DESKTOP,
            [workspace.0, 0, 0, 0, 0],
        )
    }
}
