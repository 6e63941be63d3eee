//! GDB Remote Serial Protocol machinery: framing, checksums, and the
//! command grammar.

pub mod commands;
pub mod hex;
pub mod packet;
pub mod recv;
pub mod response_writer;

pub use commands::Command;
pub use packet::{Frame, PacketParseError};
pub use recv::{Event, RecvBuffer};
pub use response_writer::ResponseWriter;
