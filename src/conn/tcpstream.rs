use std::net::TcpStream;
use std::time::Duration;

use crate::conn::Connection;

impl Connection for TcpStream {
    type Error = std::io::Error;

    fn write_all(&mut self, buf: &[u8]) -> Result<(), Self::Error> {
        use std::io::Write;

        Write::write_all(self, buf)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        use std::io::Write;

        Write::flush(self)
    }

    fn read_timeout(
        &mut self,
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<Option<usize>, Self::Error> {
        use std::io::Read;

        TcpStream::set_read_timeout(self, Some(timeout))?;
        match Read::read(self, buf) {
            Ok(n) => Ok(Some(n)),
            Err(ref e)
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut =>
            {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn on_session_start(&mut self) -> Result<(), Self::Error> {
        // RSP is many tiny packets; Nagle ruins the interactive feel
        self.set_nodelay(true)
    }
}
