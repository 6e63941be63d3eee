use crate::protocol::hex::{decode_dec, parse_hex};
use crate::target::Tid;

/// Every command the server recognizes, parsed out of a frame body.
///
/// Variants with no payload have fixed replies; the rest carry their parsed
/// arguments. `Deprecated` and `Unimplemented` are distinct from `Unknown`
/// only so the log says why a packet got an empty reply.
#[derive(Debug, PartialEq, Eq)]
pub enum Command<'a> {
    /// `?`
    HaltReason,
    /// `H op tid`
    SetThread { op: u8, tid: Tid },
    /// `T tid`
    ThreadAlive(Tid),
    /// `p reg`
    ReadRegister(u32),
    /// `P reg=value`
    WriteRegister { reg: u32, value: u32 },
    /// `g`
    ReadRegisters,
    /// `G hex...`
    WriteRegisters(&'a [u8]),
    /// `m addr,len`
    ReadMemory { addr: u32, len: u32 },
    /// `M addr,len:hex...`
    WriteMemory { addr: u32, len: u32, data: &'a [u8] },
    /// `qfThreadInfo`
    ThreadInfoFirst,
    /// `qsThreadInfo`
    ThreadInfoNext,
    /// `qSupported[:features]`
    Supported,
    /// `qAttached`
    Attached,
    /// `qTStatus`
    TraceStatus,
    /// `qC`
    CurrentThread,
    /// `D` (detach)
    Detach,
    /// `k`
    Kill,
    /// `vCont?`
    ContSupported,
    /// `vCont;action[;action...]`
    Cont(Actions<'a>),
    /// `vKill`
    VKill,
    /// `vMustReplyEmpty`
    MustReplyEmpty,
    /// `Z type,addr,kind`
    InsertBreakpoint(Breakpoint),
    /// `z type,addr,kind`
    RemoveBreakpoint(Breakpoint),
    /// Recognized but deliberately unanswered (`!`, `X`, bare `q`, ...).
    Unimplemented(&'a [u8]),
    /// Pre-`vCont` resume packets (`c`, `s`, ...); clients that negotiated
    /// `vContSupported+` never send these.
    Deprecated(&'a [u8]),
    Unknown(&'a [u8]),
}

/// `Z`/`z` arguments. `kind == 2` selects the Thumb (16-bit) trap encoding.
#[derive(Debug, PartialEq, Eq)]
pub struct Breakpoint {
    pub type_: u32,
    pub addr: u32,
    pub kind: u32,
}

impl Breakpoint {
    fn from_body(body: &[u8]) -> Option<Breakpoint> {
        let mut parts = body.split(|&b| b == b',');
        let type_ = decode_dec(parts.next()?).ok()?;
        let addr = parse_hex(parts.next()?);
        let kind = decode_dec(parts.next()?).ok()?;
        Some(Breakpoint { type_, addr, kind })
    }
}

/// The `;`-separated action list of a `vCont` packet, evaluated lazily.
#[derive(Debug, PartialEq, Eq)]
pub struct Actions<'a>(&'a [u8]);

impl<'a> Actions<'a> {
    pub fn iter(&self) -> impl Iterator<Item = VContAction> + 'a {
        self.0.split(|&b| b == b';').skip(1).filter_map(|act| {
            let mut parts = act.splitn(2, |&b| b == b':');
            let kind = *parts.next()?.first()?;
            let tid = parts.next().map(parse_signed_tid);
            Some(VContAction { kind, tid })
        })
    }

    /// The one action this server honors.
    pub fn first(&self) -> Option<VContAction> {
        self.iter().next()
    }
}

/// A single `vCont` action. The thread suffix is parsed but the controller
/// always targets the inferior thread.
#[derive(Debug, PartialEq, Eq)]
pub struct VContAction {
    pub kind: u8,
    pub tid: Option<Tid>,
}

fn parse_signed_tid(buf: &[u8]) -> Tid {
    match buf.split_first() {
        Some((b'-', rest)) => -(parse_hex(rest) as Tid),
        _ => parse_hex(buf) as Tid,
    }
}

impl<'a> Command<'a> {
    /// Match the frame body against the command table.
    ///
    /// The chain is ordered: a longer prefix must be tried before any
    /// shorter prefix that would shadow it (`vCont?` before `vCont` before
    /// `v`; the `q*` queries before bare `q`; `bc`/`bs` before deprecated
    /// `b`). Reordering arms here changes what clients observe.
    pub fn from_body(body: &'a [u8]) -> Command<'a> {
        fn strip<'b>(body: &'b [u8], prefix: &str) -> Option<&'b [u8]> {
            body.strip_prefix(prefix.as_bytes())
        }

        // general
        if strip(body, "!").is_some() {
            return Command::Unimplemented(body);
        }
        if strip(body, "?").is_some() {
            return Command::HaltReason;
        }
        if let Some(rest) = strip(body, "H") {
            if let Some((&op, tid)) = rest.split_first() {
                return Command::SetThread {
                    op,
                    tid: parse_hex(tid) as Tid,
                };
            }
            return Command::Unknown(body);
        }
        if let Some(rest) = strip(body, "T") {
            return Command::ThreadAlive(parse_hex(rest) as Tid);
        }
        if strip(body, "i").is_some()
            || strip(body, "I").is_some()
            || strip(body, "A").is_some()
            || strip(body, "bc").is_some()
            || strip(body, "bs").is_some()
            || strip(body, "t").is_some()
        {
            return Command::Unimplemented(body);
        }

        // register and memory access
        if let Some(rest) = strip(body, "p") {
            return Command::ReadRegister(parse_hex(rest));
        }
        if let Some(rest) = strip(body, "P") {
            let mut parts = rest.splitn(2, |&b| b == b'=');
            let reg = parse_hex(parts.next().unwrap_or(b""));
            return match parts.next() {
                Some(value) => Command::WriteRegister {
                    reg,
                    value: parse_hex(value),
                },
                None => Command::Unknown(body),
            };
        }
        if strip(body, "g").is_some() {
            return Command::ReadRegisters;
        }
        if let Some(rest) = strip(body, "G") {
            return Command::WriteRegisters(rest);
        }
        if let Some(rest) = strip(body, "m") {
            let mut parts = rest.splitn(2, |&b| b == b',');
            let addr = parse_hex(parts.next().unwrap_or(b""));
            return match parts.next() {
                Some(len) => Command::ReadMemory {
                    addr,
                    len: parse_hex(len),
                },
                None => Command::Unknown(body),
            };
        }
        if let Some(rest) = strip(body, "M") {
            return match parse_write_memory(rest) {
                Some(cmd) => cmd,
                None => Command::Unknown(body),
            };
        }
        // binary download: the framer scans for a literal '#' terminator
        // and cannot carry raw '$'/'#' bytes, so `X` stays unanswered
        if strip(body, "X").is_some() {
            return Command::Unimplemented(body);
        }

        // queries
        if strip(body, "qfThreadInfo").is_some() {
            return Command::ThreadInfoFirst;
        }
        if strip(body, "qsThreadInfo").is_some() {
            return Command::ThreadInfoNext;
        }
        if strip(body, "qSupported").is_some() {
            return Command::Supported;
        }
        if strip(body, "qAttached").is_some() {
            return Command::Attached;
        }
        if strip(body, "qTStatus").is_some() {
            return Command::TraceStatus;
        }
        if strip(body, "qC").is_some() {
            return Command::CurrentThread;
        }
        if strip(body, "q").is_some() || strip(body, "Q").is_some() {
            return Command::Unimplemented(body);
        }

        // shutdown
        if strip(body, "d").is_some() {
            return Command::Unimplemented(body);
        }
        if strip(body, "D").is_some() {
            return Command::Detach;
        }
        if strip(body, "r").is_some() || strip(body, "R").is_some() {
            return Command::Unimplemented(body);
        }
        if strip(body, "k").is_some() {
            return Command::Kill;
        }

        // control
        if strip(body, "vCont?").is_some() {
            return Command::ContSupported;
        }
        if strip(body, "vCont").is_some() {
            return Command::Cont(Actions(&body[5..]));
        }
        if strip(body, "vKill").is_some() {
            return Command::VKill;
        }
        if strip(body, "vMustReplyEmpty").is_some() {
            return Command::MustReplyEmpty;
        }
        if strip(body, "v").is_some() {
            return Command::Unimplemented(body);
        }

        // breakpoints
        if let Some(rest) = strip(body, "z") {
            return match Breakpoint::from_body(rest) {
                Some(bp) => Command::RemoveBreakpoint(bp),
                None => Command::Unknown(body),
            };
        }
        if let Some(rest) = strip(body, "Z") {
            return match Breakpoint::from_body(rest) {
                Some(bp) => Command::InsertBreakpoint(bp),
                None => Command::Unknown(body),
            };
        }

        // deprecated resume packets
        if strip(body, "b").is_some()
            || strip(body, "B").is_some()
            || strip(body, "c").is_some()
            || strip(body, "C").is_some()
            || strip(body, "s").is_some()
            || strip(body, "S").is_some()
        {
            return Command::Deprecated(body);
        }

        Command::Unknown(body)
    }
}

fn parse_write_memory(rest: &[u8]) -> Option<Command<'_>> {
    let comma = rest.iter().position(|&b| b == b',')?;
    let colon = rest.iter().position(|&b| b == b':')?;
    if colon < comma {
        return None;
    }
    Some(Command::WriteMemory {
        addr: parse_hex(&rest[..comma]),
        len: parse_hex(&rest[comma + 1..colon]),
        data: &rest[colon + 1..],
    })
}
