use core::fmt::{self, Debug, Display};

/// An error which may occur during a debug session.
///
/// All protocol-level problems (bad checksums, unknown commands, invalid
/// thread ids) are handled on the wire and never surface here; only the
/// transport can end a session abnormally.
#[derive(Debug)]
pub enum SessionError<C> {
    /// Error initializing the session.
    ConnectionInit(C),
    /// Error reading data from the client.
    ConnectionRead(C),
    /// Error writing data to the client.
    ConnectionWrite(C),
}

impl<C: Display> Display for SessionError<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::ConnectionInit(e) => {
                write!(f, "connection error while initializing the session: {}", e)
            }
            SessionError::ConnectionRead(e) => {
                write!(f, "connection error while reading request: {}", e)
            }
            SessionError::ConnectionWrite(e) => {
                write!(f, "connection error while writing response: {}", e)
            }
        }
    }
}

impl<C: Debug + Display> std::error::Error for SessionError<C> {}
