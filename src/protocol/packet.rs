use core::fmt;

use crate::protocol::hex::{checksum, parse_hex};

/// Packet parse error.
#[derive(Debug, PartialEq, Eq)]
pub enum PacketParseError {
    ChecksumMismatched { checksum: u8, calculated: u8 },
}

impl fmt::Display for PacketParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PacketParseError::ChecksumMismatched {
                checksum,
                calculated,
            } => write!(
                f,
                "checksum mismatch (packet: {:02x}, calculated: {:02x})",
                checksum, calculated
            ),
        }
    }
}

/// A complete `$body#cc` frame lifted out of the receive buffer.
///
/// The body has not been checksum-verified yet; the session acks receipt
/// first and calls [`Frame::verify`] before dispatching.
#[derive(Debug, PartialEq, Eq)]
pub struct Frame {
    body: Vec<u8>,
    checksum: [u8; 2],
}

impl Frame {
    pub(crate) fn new(body: Vec<u8>, checksum: [u8; 2]) -> Frame {
        Frame { body, checksum }
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Validate the transmitted checksum against the body.
    pub fn verify(&self) -> Result<(), PacketParseError> {
        let claimed = parse_hex(&self.checksum) as u8;
        let calculated = checksum(&self.body);
        if calculated != claimed {
            return Err(PacketParseError::ChecksumMismatched {
                checksum: claimed,
                calculated,
            });
        }
        Ok(())
    }
}
