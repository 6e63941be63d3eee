use log::debug;

use crate::protocol::packet::Frame;

/// Something the client sent that the session must react to.
#[derive(Debug, PartialEq, Eq)]
pub enum Event {
    /// Client rejected the last reply; it must be retransmitted verbatim.
    Nack,
    /// A complete `$body#cc` frame.
    Frame(Frame),
}

/// Rolling per-session receive buffer.
///
/// Socket reads are appended with [`extend_from_slice`], then
/// [`next_event`] consumes well-formed prefixes: `+` acks are swallowed,
/// `-` yields [`Event::Nack`], a complete `$…#cc` sequence yields
/// [`Event::Frame`], and anything else is skipped one byte at a time. A
/// partial frame is left in place until more bytes arrive.
///
/// [`extend_from_slice`]: RecvBuffer::extend_from_slice
/// [`next_event`]: RecvBuffer::next_event
#[derive(Default)]
pub struct RecvBuffer {
    buf: Vec<u8>,
}

impl RecvBuffer {
    pub fn new() -> RecvBuffer {
        RecvBuffer { buf: Vec::new() }
    }

    pub fn extend_from_slice(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn next_event(&mut self) -> Option<Event> {
        loop {
            match self.buf.first()? {
                b'+' => {
                    self.buf.drain(..1);
                }
                b'-' => {
                    self.buf.drain(..1);
                    return Some(Event::Nack);
                }
                b'$' => {
                    // find the '#' that ends the body, plus two checksum
                    // digits after it
                    let hash = self.buf[1..].iter().position(|&b| b == b'#')? + 1;
                    if self.buf.len() < hash + 3 {
                        return None;
                    }

                    let checksum = [self.buf[hash + 1], self.buf[hash + 2]];
                    let body = self.buf[1..hash].to_vec();
                    self.buf.drain(..hash + 3);
                    return Some(Event::Frame(Frame::new(body, checksum)));
                }
                &b => {
                    debug!("skipping unexpected byte {:#04x} in recv buffer", b);
                    self.buf.drain(..1);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::response_writer::frame_reply;

    #[test]
    fn framing_round_trip() {
        for body in [&b""[..], b"OK", b"S05", b"qSupported:multiprocess+"] {
            let wire = frame_reply(body);

            let mut recv = RecvBuffer::new();
            recv.extend_from_slice(&wire);
            match recv.next_event() {
                Some(Event::Frame(frame)) => {
                    assert_eq!(frame.body(), body);
                    assert!(frame.verify().is_ok());
                }
                other => panic!("expected frame, got {:?}", other),
            }
            assert_eq!(recv.next_event(), None);
        }
    }

    #[test]
    fn partial_frames_wait_for_more_bytes() {
        let mut recv = RecvBuffer::new();
        recv.extend_from_slice(b"$g#6");
        assert_eq!(recv.next_event(), None);
        recv.extend_from_slice(b"7");
        assert_eq!(
            recv.next_event(),
            Some(Event::Frame(Frame::new(b"g".to_vec(), *b"67")))
        );
    }

    #[test]
    fn acks_are_swallowed_and_nacks_surface() {
        let mut recv = RecvBuffer::new();
        recv.extend_from_slice(b"++-+$OK#9a");
        assert_eq!(recv.next_event(), Some(Event::Nack));
        assert_eq!(
            recv.next_event(),
            Some(Event::Frame(Frame::new(b"OK".to_vec(), *b"9a")))
        );
        assert_eq!(recv.next_event(), None);
    }

    #[test]
    fn junk_bytes_are_skipped() {
        let mut recv = RecvBuffer::new();
        recv.extend_from_slice(b"\x03xy$T2a#e7");
        match recv.next_event() {
            Some(Event::Frame(frame)) => assert_eq!(frame.body(), b"T2a"),
            other => panic!("expected frame, got {:?}", other),
        }
    }

    #[test]
    fn consecutive_frames_drain_in_order() {
        let mut recv = RecvBuffer::new();
        let mut wire = frame_reply(b"m0,4");
        wire.extend_from_slice(&frame_reply(b"g"));
        recv.extend_from_slice(&wire);

        match recv.next_event() {
            Some(Event::Frame(frame)) => assert_eq!(frame.body(), b"m0,4"),
            other => panic!("expected frame, got {:?}", other),
        }
        match recv.next_event() {
            Some(Event::Frame(frame)) => assert_eq!(frame.body(), b"g"),
            other => panic!("expected frame, got {:?}", other),
        }
    }
}
