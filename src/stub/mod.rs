//! Server lifecycle: bind, accept one debugger, run the session, shut
//! down.

pub(crate) mod core_impl;
mod error;
pub(crate) mod session;

pub use error::SessionError;

use std::io;
use std::net::{Ipv4Addr, TcpListener};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{error, info};

use crate::target::Target;
use session::Session;

/// Default TCP port the server listens on; overridable at spawn time.
pub const DEFAULT_PORT: u16 = 2159;

/// How often the accept loop re-checks the shutdown flag.
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Handle to a running debug server.
///
/// The server owns one background thread for the lifetime of the emulator
/// run. Dropping the handle shuts the server down.
pub struct DebugServer {
    die: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl DebugServer {
    /// Bind the listen socket and spawn the server thread.
    pub fn spawn<T: Target>(target: Arc<T>, port: u16) -> io::Result<DebugServer> {
        let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, port))?;
        listener.set_nonblocking(true)?;

        let die = Arc::new(AtomicBool::new(false));
        let thread = {
            let die = die.clone();
            thread::Builder::new()
                .name("gdbserv".into())
                .spawn(move || serve(listener, target, die))?
        };

        info!("GDB server is listening on port {}", port);
        Ok(DebugServer {
            die,
            thread: Some(thread),
        })
    }

    /// Request shutdown and join the server thread.
    ///
    /// Safe to call from any thread, including (via the kill packet path)
    /// the server thread itself, which is only flagged, never joined.
    pub fn shutdown(&mut self) {
        self.die.store(true, Ordering::Relaxed);
        if let Some(thread) = self.thread.take() {
            if thread.thread().id() == std::thread::current().id() {
                return;
            }
            if thread.join().is_err() {
                error!("GDB server thread panicked");
            }
        }
    }
}

impl Drop for DebugServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn serve<T: Target>(listener: TcpListener, target: Arc<T>, die: Arc<AtomicBool>) {
    // one client at a time; later connect attempts sit in the backlog
    let stream = loop {
        if die.load(Ordering::Relaxed) {
            return;
        }
        match listener.accept() {
            Ok((stream, addr)) => {
                info!("debugger connected from {}", addr);
                break stream;
            }
            Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => {
                thread::sleep(ACCEPT_POLL_INTERVAL);
            }
            Err(e) => {
                error!("could not accept debugger connection: {}", e);
                return;
            }
        }
    };

    if let Err(e) = stream.set_nonblocking(false) {
        error!("could not configure debugger socket: {}", e);
        return;
    }

    let mut session = Session::new(stream, target, die.clone());
    if let Err(e) = session.run() {
        error!("debug session ended abnormally: {}", e);
    }

    // terminal: no further bytes go out once the flag is set; the sockets
    // close on drop
    die.store(true, Ordering::Relaxed);
}
