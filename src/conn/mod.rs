//! Byte transport between the server and the debugger.

mod tcpstream;

use std::time::Duration;

/// In-order, serial, byte-wise I/O with bounded-wait reads.
///
/// Implemented for [`TcpStream`](std::net::TcpStream); the bounded read is
/// what lets the session loop notice a shutdown request while no packets
/// are arriving.
pub trait Connection {
    /// Transport-specific error type.
    type Error;

    /// Write the entire buffer, blocking until complete.
    fn write_all(&mut self, buf: &[u8]) -> Result<(), Self::Error>;

    /// Flush this Connection, ensuring that all intermediately buffered
    /// contents reach their destination.
    fn flush(&mut self) -> Result<(), Self::Error>;

    /// Read into `buf`, waiting at most `timeout`.
    ///
    /// `Ok(None)` means the timeout elapsed with no data; `Ok(Some(0))`
    /// means the peer closed the connection.
    fn read_timeout(
        &mut self,
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<Option<usize>, Self::Error>;

    /// Called once when a debugging session starts, before any packets
    /// have been exchanged.
    fn on_session_start(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}
