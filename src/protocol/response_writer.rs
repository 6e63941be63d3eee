use crate::protocol::hex::{checksum, encode_be_hex8, encode_hex8};

const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

/// Accumulates the body of one outgoing reply.
///
/// The body is buffered rather than streamed because the session keeps the
/// most recent body around for NACK retransmission.
#[derive(Default)]
pub struct ResponseWriter {
    body: Vec<u8>,
}

impl ResponseWriter {
    pub fn new() -> ResponseWriter {
        ResponseWriter { body: Vec::new() }
    }

    /// Write a single byte.
    pub fn write(&mut self, byte: u8) {
        self.body.push(byte);
    }

    /// Write an entire buffer.
    pub fn write_all(&mut self, data: &[u8]) {
        self.body.extend_from_slice(data);
    }

    /// Write an entire string.
    pub fn write_str(&mut self, s: &str) {
        self.write_all(s.as_bytes());
    }

    /// Write a single byte as two lowercase hex digits.
    pub fn write_hex(&mut self, byte: u8) {
        self.write(HEX_DIGITS[(byte >> 4) as usize]);
        self.write(HEX_DIGITS[(byte & 0xf) as usize]);
    }

    /// Write an entire buffer as a hex string.
    pub fn write_hex_buf(&mut self, data: &[u8]) {
        data.iter().for_each(|b| self.write_hex(*b));
    }

    /// Write a word as eight hex digits, most-significant first.
    pub fn write_u32_hex(&mut self, value: u32) {
        self.write_all(&encode_hex8(value));
    }

    /// Write a word as hex digits of its big-endian byte order (register
    /// payloads).
    pub fn write_u32_be_hex(&mut self, value: u32) {
        self.write_all(&encode_be_hex8(value));
    }

    pub fn into_body(self) -> Vec<u8> {
        self.body
    }
}

/// Wrap a reply body as a `$body#cc` wire frame.
pub fn frame_reply(body: &[u8]) -> Vec<u8> {
    let mut wire = Vec::with_capacity(body.len() + 4);
    wire.push(b'$');
    wire.extend_from_slice(body);
    wire.push(b'#');
    let cc = checksum(body);
    wire.push(HEX_DIGITS[(cc >> 4) as usize]);
    wire.push(HEX_DIGITS[(cc & 0xf) as usize]);
    wire
}
