//! X11 window source — connection, client-list queries, event thread.
//!
//! Wraps `x11rb::rust_connection::RustConnection` so the registry can
//! track top-level windows of an X11 session. Windows are named by the
//! object path `/org/x11/window/<xid>`; the XID is also their platform
//! window id and internal id.

use nix::poll::{PollFd, PollFlags, PollTimeout, poll};
use std::os::fd::{AsRawFd, BorrowedFd};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use x11rb::connection::Connection;
use x11rb::protocol::Event;
use x11rb::protocol::xproto::{self, Atom, ChangeWindowAttributesAux, EventMask, Window};
use x11rb::rust_connection::RustConnection;

use crate::registry::{IdAllocator, SourceError, WindowHandle, WindowSource};

const OBJECT_PATH_PREFIX: &str = "/org/x11/window/";

/// X11 connection or protocol failure.
#[derive(Debug, thiserror::Error)]
pub enum X11Error {
    #[error("X11 connect failed: {0}")]
    Connect(String),

    #[error("X11 request failed: {0}")]
    Request(String),

    #[error("failed to spawn event thread: {0}")]
    Thread(#[from] std::io::Error),
}

/// Object path for a window XID.
pub fn object_path(xid: Window) -> String {
    format!("{OBJECT_PATH_PREFIX}{xid}")
}

/// XID named by an object path produced by [`object_path`].
pub fn parse_object_path(path: &str) -> Option<Window> {
    path.strip_prefix(OBJECT_PATH_PREFIX)?
        .parse()
        .ok()
        .filter(|&xid| xid != 0)
}

/// Pre-interned X11 atoms for property queries.
struct Atoms {
    net_client_list: Atom,
    net_wm_pid: Atom,
}

/// X11 connection context shared by the window source and allocator.
pub struct X11Context {
    conn: Arc<RustConnection>,
    root: Window,
    atoms: Atoms,
}

impl X11Context {
    /// Connect to the display, intern atoms and subscribe to root
    /// property changes (`_NET_CLIENT_LIST` updates).
    pub fn connect() -> Result<Self, X11Error> {
        let (conn, screen_num) =
            RustConnection::connect(None).map_err(|e| X11Error::Connect(e.to_string()))?;

        let root = conn.setup().roots[screen_num].root;
        let net_client_list = intern(&conn, b"_NET_CLIENT_LIST")?;
        let net_wm_pid = intern(&conn, b"_NET_WM_PID")?;

        xproto::change_window_attributes(
            &conn,
            root,
            &ChangeWindowAttributesAux::new().event_mask(EventMask::PROPERTY_CHANGE),
        )
        .map_err(|e| X11Error::Request(format!("select root events: {e}")))?
        .check()
        .map_err(|e| X11Error::Request(format!("select root events: {e}")))?;

        Ok(Self {
            conn: Arc::new(conn),
            root,
            atoms: Atoms {
                net_client_list,
                net_wm_pid,
            },
        })
    }

    /// Top-level client windows managed by the window manager.
    pub fn client_list(&self) -> Result<Vec<Window>, X11Error> {
        let reply = xproto::get_property(
            &*self.conn,
            false,
            self.root,
            self.atoms.net_client_list,
            xproto::AtomEnum::WINDOW,
            0,
            u32::MAX,
        )
        .map_err(|e| X11Error::Request(format!("get_property _NET_CLIENT_LIST: {e}")))?
        .reply()
        .map_err(|e| X11Error::Request(format!("get_property reply: {e}")))?;

        Ok(reply.value32().map(|ids| ids.collect()).unwrap_or_default())
    }

    /// `_NET_WM_PID` of a window, if it sets one.
    pub fn window_pid(&self, window: Window) -> Result<Option<u32>, X11Error> {
        let reply = xproto::get_property(
            &*self.conn,
            false,
            window,
            self.atoms.net_wm_pid,
            xproto::AtomEnum::CARDINAL,
            0,
            1,
        )
        .map_err(|e| X11Error::Request(format!("get_property _NET_WM_PID: {e}")))?
        .reply()
        .map_err(|e| X11Error::Request(format!("get_property reply: {e}")))?;

        Ok(reply.value32().and_then(|mut v| v.next()).filter(|&pid| pid != 0))
    }

    /// Class part of `WM_CLASS` (`"instance\0class\0"`).
    pub fn window_class(&self, window: Window) -> Result<Option<String>, X11Error> {
        let reply = xproto::get_property(
            &*self.conn,
            false,
            window,
            xproto::AtomEnum::WM_CLASS,
            xproto::AtomEnum::STRING,
            0,
            256,
        )
        .map_err(|e| X11Error::Request(format!("get_property WM_CLASS: {e}")))?
        .reply()
        .map_err(|e| X11Error::Request(format!("get_property reply: {e}")))?;

        Ok(parse_wm_class(&reply.value))
    }

    /// True for a root `PropertyNotify` on `_NET_CLIENT_LIST`.
    pub fn is_client_list_change(&self, event: &Event) -> bool {
        matches!(
            event,
            Event::PropertyNotify(e) if e.window == self.root && e.atom == self.atoms.net_client_list
        )
    }

    /// Get a shared reference to the X11 connection.
    pub fn conn(&self) -> &Arc<RustConnection> {
        &self.conn
    }
}

fn intern(conn: &RustConnection, name: &[u8]) -> Result<Atom, X11Error> {
    Ok(xproto::intern_atom(conn, false, name)
        .map_err(|e| X11Error::Request(format!("intern_atom: {e}")))?
        .reply()
        .map_err(|e| X11Error::Request(format!("intern_atom reply: {e}")))?
        .atom)
}

fn parse_wm_class(value: &[u8]) -> Option<String> {
    let mut parts = value.split(|&b| b == 0);
    let instance = parts.next().filter(|p| !p.is_empty());
    let class = parts.next().filter(|p| !p.is_empty());
    class
        .or(instance)
        .map(|p| String::from_utf8_lossy(p).into_owned())
}

/// A top-level X11 window.
pub struct X11Window {
    xid: Window,
    class: String,
    pid: Option<u32>,
}

impl WindowHandle for X11Window {
    fn app_id(&self) -> String {
        self.class.clone()
    }

    fn window_id(&self) -> u32 {
        self.xid
    }

    fn inner_id(&self) -> u64 {
        u64::from(self.xid)
    }

    fn pid(&self) -> Option<u32> {
        self.pid
    }
}

/// Materializes [`X11Window`] handles from object paths.
pub struct X11WindowSource {
    ctx: Arc<X11Context>,
}

impl X11WindowSource {
    pub fn new(ctx: Arc<X11Context>) -> Self {
        Self { ctx }
    }
}

impl WindowSource for X11WindowSource {
    fn create_window(&self, object_path: &str) -> Result<Arc<dyn WindowHandle>, SourceError> {
        let xid = parse_object_path(object_path)
            .ok_or_else(|| SourceError::UnknownObject(object_path.to_owned()))?;

        let class = self
            .ctx
            .window_class(xid)
            .map_err(|e| SourceError::Query(e.to_string()))?
            .unwrap_or_default();
        let pid = self.ctx.window_pid(xid).unwrap_or_else(|e| {
            tracing::debug!(xid, error = %e, "no _NET_WM_PID");
            None
        });

        Ok(Arc::new(X11Window { xid, class, pid }))
    }
}

/// Allocates XIDs from the connection's id range.
pub struct X11IdAllocator {
    ctx: Arc<X11Context>,
}

impl X11IdAllocator {
    pub fn new(ctx: Arc<X11Context>) -> Self {
        Self { ctx }
    }
}

impl IdAllocator for X11IdAllocator {
    /// Returns `0` (no id) once the connection's id range is exhausted.
    fn allocate_id(&self) -> u32 {
        self.ctx.conn.generate_id().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "XID allocation failed");
            0
        })
    }
}

/// Spawn a dedicated thread that polls the X11 connection for events.
///
/// Uses `nix::poll()` on the connection fd with a 100ms timeout and
/// drains all available events when readable. Checks `stop` each
/// iteration for clean shutdown.
pub fn spawn_event_thread(
    conn: Arc<RustConnection>,
    stop: Arc<AtomicBool>,
) -> Result<(tokio::sync::mpsc::UnboundedReceiver<Event>, JoinHandle<()>), X11Error> {
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();

    let handle = std::thread::Builder::new()
        .name("x11-events".into())
        .spawn(move || {
            let raw_fd = conn.stream().as_raw_fd();

            while !stop.load(Ordering::Relaxed) {
                // SAFETY: raw_fd is the X11 connection fd, valid while conn is alive.
                let borrowed = unsafe { BorrowedFd::borrow_raw(raw_fd) };
                let mut fds = [PollFd::new(borrowed, PollFlags::POLLIN)];

                match poll(&mut fds, PollTimeout::from(100u16)) {
                    Ok(0) => continue,
                    Ok(_) => loop {
                        match conn.poll_for_event() {
                            Ok(Some(event)) => {
                                if tx.send(event).is_err() {
                                    return;
                                }
                            }
                            Ok(None) => break,
                            Err(e) => {
                                tracing::error!(error = %e, "X11 connection error");
                                return;
                            }
                        }
                    },
                    Err(nix::Error::EINTR) => continue,
                    Err(e) => {
                        tracing::error!(error = %e, "poll error on X11 fd");
                        return;
                    }
                }
            }
        })?;

    Ok((rx, handle))
}
