use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};

use crate::conn::Connection;
use crate::protocol::commands::Command;
use crate::protocol::response_writer::frame_reply;
use crate::protocol::{Event, RecvBuffer};
use crate::stub::core_impl::GdbStubImpl;
use crate::stub::error::SessionError;
use crate::target::Target;

/// Upper bound on one blocking read, so the loop re-checks the shutdown
/// flag at least once a second.
const RECV_TIMEOUT: Duration = Duration::from_secs(1);

/// One debugger connection: drives the receive buffer, dispatch, and reply
/// transmission until disconnect or shutdown.
pub(crate) struct Session<T: Target, C: Connection> {
    conn: C,
    target: Arc<T>,
    recv: RecvBuffer,
    /// Most recent reply body, retransmitted verbatim when the client
    /// NACKs.
    last_reply: Vec<u8>,
    die: Arc<AtomicBool>,
    pub(crate) stub: GdbStubImpl,
}

impl<T: Target, C: Connection> Session<T, C> {
    pub fn new(conn: C, target: Arc<T>, die: Arc<AtomicBool>) -> Session<T, C> {
        Session {
            conn,
            target,
            recv: RecvBuffer::new(),
            last_reply: Vec::new(),
            stub: GdbStubImpl::new(die.clone()),
            die,
        }
    }

    pub fn run(&mut self) -> Result<(), SessionError<C::Error>> {
        self.conn
            .on_session_start()
            .map_err(SessionError::ConnectionInit)?;

        let mut buf = [0; 1024];
        while !self.die.load(Ordering::Relaxed) {
            match self
                .conn
                .read_timeout(&mut buf, RECV_TIMEOUT)
                .map_err(SessionError::ConnectionRead)?
            {
                // timed out; loop around and re-check the shutdown flag
                None => continue,
                Some(0) => {
                    info!("debugger connection closed");
                    break;
                }
                Some(n) => self.pump(&buf[..n])?,
            }
        }
        Ok(())
    }

    /// Feed freshly received bytes through the framer and handle every
    /// complete event.
    fn pump(&mut self, bytes: &[u8]) -> Result<(), SessionError<C::Error>> {
        self.recv.extend_from_slice(bytes);

        while let Some(event) = self.recv.next_event() {
            match event {
                Event::Nack => {
                    warn!("client rejected the last reply, retransmitting");
                    let replay = frame_reply(&self.last_reply);
                    self.send(&replay)?;
                }
                Event::Frame(frame) => {
                    // receipt is acked before the checksum is even looked
                    // at; clients expect the ack ahead of any reply bytes
                    self.send(b"+")?;

                    if let Err(e) = frame.verify() {
                        warn!("dropping invalid packet: {}", e);
                        self.send(b"-")?;
                        continue;
                    }

                    let cmd = Command::from_body(frame.body());
                    self.last_reply = self.stub.handle_command(self.target.as_ref(), cmd);

                    if self.stub.server_die() {
                        // terminal: the kill reply (and anything still
                        // buffered) is never sent
                        return Ok(());
                    }
                    let reply = frame_reply(&self.last_reply);
                    self.send(&reply)?;
                }
            }
        }
        Ok(())
    }

    fn send(&mut self, bytes: &[u8]) -> Result<(), SessionError<C::Error>> {
        self.conn
            .write_all(bytes)
            .map_err(SessionError::ConnectionWrite)?;
        self.conn.flush().map_err(SessionError::ConnectionWrite)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::collections::HashMap;
    use std::ops::Range;

    use parking_lot::Mutex;

    use crate::target::{Cpu, GuestMem, GuestThread, Kernel, ThreadControl, ThreadStatus, Tid};

    #[derive(Default)]
    struct TestCpu {
        regs: [u32; 13],
        sp: u32,
        lr: u32,
        pc: u32,
        fpr: [f32; 8],
        fpscr: u32,
        cpsr: u32,
        hit: bool,
        /// Register accesses observed, for the "E00 touches no CPU" check.
        accesses: Cell<u32>,
    }

    impl Cpu for TestCpu {
        fn reg(&self, idx: u8) -> u32 {
            self.accesses.set(self.accesses.get() + 1);
            self.regs[idx as usize]
        }
        fn set_reg(&mut self, idx: u8, value: u32) {
            self.regs[idx as usize] = value;
        }
        fn sp(&self) -> u32 {
            self.accesses.set(self.accesses.get() + 1);
            self.sp
        }
        fn set_sp(&mut self, value: u32) {
            self.sp = value;
        }
        fn lr(&self) -> u32 {
            self.accesses.set(self.accesses.get() + 1);
            self.lr
        }
        fn set_lr(&mut self, value: u32) {
            self.lr = value;
        }
        fn pc(&self) -> u32 {
            self.accesses.set(self.accesses.get() + 1);
            self.pc
        }
        fn set_pc(&mut self, value: u32) {
            self.pc = value;
        }
        fn fpr(&self, idx: u8) -> f32 {
            self.accesses.set(self.accesses.get() + 1);
            self.fpr[idx as usize]
        }
        fn set_fpr(&mut self, idx: u8, value: f32) {
            self.fpr[idx as usize] = value;
        }
        fn fpscr(&self) -> u32 {
            self.fpscr
        }
        fn set_fpscr(&mut self, value: u32) {
            self.fpscr = value;
        }
        fn cpsr(&self) -> u32 {
            self.cpsr
        }
        fn set_cpsr(&mut self, value: u32) {
            self.cpsr = value;
        }
        fn hit_breakpoint(&self) -> bool {
            self.hit
        }
    }

    struct TestMem {
        valid: Range<u32>,
        data: HashMap<u32, u8>,
    }

    impl TestMem {
        fn new(valid: Range<u32>) -> TestMem {
            TestMem {
                valid,
                data: HashMap::new(),
            }
        }
    }

    impl GuestMem for TestMem {
        fn page_size(&self) -> u32 {
            0x1000
        }
        fn is_valid_addr(&self, addr: u32) -> bool {
            self.valid.contains(&addr)
        }
        fn is_valid_range(&self, start: u32, end: u32) -> bool {
            start >= self.valid.start && end <= self.valid.end && start <= end
        }
        fn read_byte(&self, addr: u32) -> u8 {
            self.data.get(&addr).copied().unwrap_or(0)
        }
        fn write_byte(&mut self, addr: u32, value: u8) {
            self.data.insert(addr, value);
        }
    }

    /// Stand-in for the kernel scheduler: transitions settle instantly.
    /// A plain resume leaves the thread running; a single-step or suspend
    /// request re-parks it.
    struct TestControl {
        slot: Arc<Mutex<Option<Arc<GuestThread<TestCpu>>>>>,
    }

    impl ThreadControl for TestControl {
        fn resume(&self, step: bool) {
            let thread = self.slot.lock().clone().unwrap();
            if step {
                thread.set_status(ThreadStatus::Suspend);
            } else {
                thread.set_status(ThreadStatus::Run);
            }
        }
        fn suspend(&self) {
            let thread = self.slot.lock().clone().unwrap();
            thread.set_status(ThreadStatus::Suspend);
        }
    }

    struct TestTarget {
        kernel: Kernel<TestCpu>,
        mem: Mutex<TestMem>,
        breakpoints: Mutex<Vec<(u32, bool)>>,
    }

    impl TestTarget {
        fn new(valid: Range<u32>) -> Arc<TestTarget> {
            Arc::new(TestTarget {
                kernel: Kernel::new(),
                mem: Mutex::new(TestMem::new(valid)),
                breakpoints: Mutex::new(Vec::new()),
            })
        }

        fn spawn_thread(&self, id: Tid) -> Arc<GuestThread<TestCpu>> {
            let slot = Arc::new(Mutex::new(None));
            let thread = GuestThread::new(
                id,
                format!("thread{}", id),
                TestCpu::default(),
                ThreadStatus::Suspend,
                TestControl { slot: slot.clone() },
            );
            *slot.lock() = Some(thread.clone());
            self.kernel.register_thread(thread.clone());
            thread
        }
    }

    impl Target for TestTarget {
        type Cpu = TestCpu;
        type Mem = TestMem;

        fn kernel(&self) -> &Kernel<TestCpu> {
            &self.kernel
        }
        fn mem(&self) -> &Mutex<TestMem> {
            &self.mem
        }
        fn add_breakpoint(&self, _mem: &mut TestMem, addr: u32, thumb: bool) {
            self.breakpoints.lock().push((addr, thumb));
        }
        fn remove_breakpoint(&self, _mem: &mut TestMem, addr: u32) {
            self.breakpoints.lock().retain(|&(a, _)| a != addr);
        }
    }

    /// Connection fed from a canned script; reports EOF once drained.
    struct ScriptedConn {
        input: Vec<u8>,
        pos: usize,
        output: Vec<u8>,
    }

    impl ScriptedConn {
        fn new(input: Vec<u8>) -> ScriptedConn {
            ScriptedConn {
                input,
                pos: 0,
                output: Vec::new(),
            }
        }
    }

    impl Connection for ScriptedConn {
        type Error = std::io::Error;

        fn write_all(&mut self, buf: &[u8]) -> Result<(), Self::Error> {
            self.output.extend_from_slice(buf);
            Ok(())
        }
        fn flush(&mut self) -> Result<(), Self::Error> {
            Ok(())
        }
        fn read_timeout(
            &mut self,
            buf: &mut [u8],
            _timeout: Duration,
        ) -> Result<Option<usize>, Self::Error> {
            let remaining = &self.input[self.pos..];
            if remaining.is_empty() {
                return Ok(Some(0));
            }
            let n = remaining.len().min(buf.len());
            buf[..n].copy_from_slice(&remaining[..n]);
            self.pos += n;
            Ok(Some(n))
        }
    }

    fn run_session(
        target: Arc<TestTarget>,
        input: Vec<u8>,
    ) -> (Session<TestTarget, ScriptedConn>, Arc<AtomicBool>) {
        let die = Arc::new(AtomicBool::new(false));
        let mut session = Session::new(ScriptedConn::new(input), target, die.clone());
        session.run().unwrap();
        (session, die)
    }

    fn request(body: &[u8]) -> Vec<u8> {
        frame_reply(body)
    }

    #[test]
    fn bad_checksum_is_acked_then_nacked() {
        let target = TestTarget::new(0..0);
        let (session, _) = run_session(target, b"$g#00".to_vec());
        assert_eq!(session.conn.output, b"+-".to_vec());
    }

    #[test]
    fn qsupported_reports_capabilities() {
        let target = TestTarget::new(0..0);
        let (session, _) = run_session(target, request(b"qSupported:multiprocess+"));

        let mut expected = b"+".to_vec();
        expected.extend_from_slice(&frame_reply(
            b"multiprocess-;swbreak+;hwbreak-;qRelocInsn-;fork-events-;vfork-events-;\
              exec-events-;vContSupported+;QThreadEvents-;no-resumed-;xmlRegisters=arm",
        ));
        assert_eq!(session.conn.output, expected);

        // ack precedes the reply frame on the wire
        assert_eq!(session.conn.output[0], b'+');
        assert_eq!(session.conn.output[1], b'$');
    }

    #[test]
    fn set_and_read_current_thread() {
        let target = TestTarget::new(0..0);
        target.spawn_thread(0x2a);

        let mut input = request(b"Hg0");
        input.extend_from_slice(&request(b"qC"));
        let (session, _) = run_session(target, input);

        let mut expected = b"+".to_vec();
        expected.extend_from_slice(&frame_reply(b"OK"));
        expected.push(b'+');
        expected.extend_from_slice(&frame_reply(b"QC0000002a"));
        assert_eq!(session.conn.output, expected);
        assert_eq!(session.stub.current_thread, 0x2a);
    }

    #[test]
    fn selecting_a_thread_with_an_empty_table_stays_invalid() {
        let target = TestTarget::new(0..0);
        let (session, _) = run_session(target, request(b"Hg0"));
        assert_eq!(session.stub.current_thread, -1);
    }

    #[test]
    fn memory_read_of_unmapped_range_fails() {
        let target = TestTarget::new(0x10000..0x20000);
        let (session, _) = run_session(target, request(b"m0,4"));

        let mut expected = b"+".to_vec();
        expected.extend_from_slice(&frame_reply(b"EAA"));
        assert_eq!(session.conn.output, expected);
    }

    #[test]
    fn memory_round_trip() {
        let target = TestTarget::new(0x10000..0x20000);
        {
            let mut mem = target.mem.lock();
            for (i, b) in [0xde, 0xad, 0xbe, 0xef].into_iter().enumerate() {
                mem.write_byte(0x10000 + i as u32, b);
            }
        }

        let mut input = request(b"m10000,4");
        input.extend_from_slice(&request(b"M10004,2:cafe"));
        let (session, _) = run_session(target.clone(), input);

        let mut expected = b"+".to_vec();
        expected.extend_from_slice(&frame_reply(b"deadbeef"));
        expected.push(b'+');
        expected.extend_from_slice(&frame_reply(b"OK"));
        assert_eq!(session.conn.output, expected);

        let mem = target.mem.lock();
        assert_eq!(mem.read_byte(0x10004), 0xca);
        assert_eq!(mem.read_byte(0x10005), 0xfe);
    }

    #[test]
    fn breakpoint_install_and_remove() {
        let target = TestTarget::new(0x10000..0x20000);

        let mut input = request(b"Z0,00010000,4");
        input.extend_from_slice(&request(b"Z0,00010004,2"));
        input.extend_from_slice(&request(b"z0,00010000,4"));
        input.extend_from_slice(&request(b"Z0,0,4"));
        let (session, _) = run_session(target.clone(), input);

        let mut expected = Vec::new();
        for reply in [&b"OK"[..], b"OK", b"OK", b"EAA"] {
            expected.push(b'+');
            expected.extend_from_slice(&frame_reply(reply));
        }
        assert_eq!(session.conn.output, expected);
        assert_eq!(*target.breakpoints.lock(), vec![(0x10004, true)]);
    }

    #[test]
    fn continue_until_break_stops_the_world() {
        let target = TestTarget::new(0..0);
        let breaker = target.spawn_thread(1);
        let bystander = target.spawn_thread(2);

        // play the guest kernel: once the controller has resumed the
        // world, thread 1 parks on a breakpoint
        let emulation = {
            let breaker = breaker.clone();
            let bystander = bystander.clone();
            std::thread::spawn(move || {
                while breaker.status() != ThreadStatus::Run
                    || bystander.status() != ThreadStatus::Run
                {
                    std::thread::sleep(Duration::from_millis(5));
                }
                breaker.cpu().hit = true;
                breaker.set_status(ThreadStatus::Suspend);
            })
        };

        let (session, _) = run_session(target, request(b"vCont;c"));
        emulation.join().unwrap();

        let mut expected = b"+".to_vec();
        expected.extend_from_slice(&frame_reply(b"S05"));
        assert_eq!(session.conn.output, expected);
        assert_eq!(session.stub.inferior_thread, 1);
        assert_eq!(session.stub.current_thread, 1);
        assert_eq!(bystander.status(), ThreadStatus::Suspend);
    }

    #[test]
    fn step_reports_stop_for_the_inferior() {
        let target = TestTarget::new(0..0);
        target.spawn_thread(7);

        let die = Arc::new(AtomicBool::new(false));
        let mut session = Session::new(
            ScriptedConn::new(request(b"vCont;s")),
            target,
            die.clone(),
        );
        session.stub.inferior_thread = 7;
        session.run().unwrap();

        let mut expected = b"+".to_vec();
        expected.extend_from_slice(&frame_reply(b"S05"));
        assert_eq!(session.conn.output, expected);
        assert_eq!(session.stub.current_thread, 7);
    }

    #[test]
    fn nack_replays_the_last_reply_verbatim() {
        let target = TestTarget::new(0..0);
        let mut input = request(b"qAttached");
        input.extend_from_slice(b"-+-");
        let (session, _) = run_session(target, input);

        let reply = frame_reply(b"1");
        let mut expected = b"+".to_vec();
        expected.extend_from_slice(&reply);
        expected.extend_from_slice(&reply);
        expected.extend_from_slice(&reply);
        assert_eq!(session.conn.output, expected);
    }

    #[test]
    fn thread_enumeration_yields_each_tid_once() {
        let target = TestTarget::new(0..0);
        for id in [7, 3, 5] {
            target.spawn_thread(id);
        }

        let mut input = request(b"qfThreadInfo");
        for _ in 0..3 {
            input.extend_from_slice(&request(b"qsThreadInfo"));
        }
        let (session, _) = run_session(target, input);

        let mut expected = Vec::new();
        for reply in [
            &b"m00000003"[..],
            b"m00000005",
            b"m00000007",
            b"l",
        ] {
            expected.push(b'+');
            expected.extend_from_slice(&frame_reply(reply));
        }
        assert_eq!(session.conn.output, expected);
    }

    #[test]
    fn registers_with_no_selected_thread_fail_without_cpu_access() {
        let target = TestTarget::new(0..0);
        let thread = target.spawn_thread(1);

        let (session, _) = run_session(target, request(b"g"));

        let mut expected = b"+".to_vec();
        expected.extend_from_slice(&frame_reply(b"E00"));
        assert_eq!(session.conn.output, expected);
        assert_eq!(thread.cpu().accesses.get(), 0);
    }

    #[test]
    fn register_access_through_the_wire() {
        let target = TestTarget::new(0..0);
        let thread = target.spawn_thread(1);
        {
            let mut cpu = thread.cpu();
            cpu.regs[0] = 0x11223344;
            cpu.pc = 0x81000000;
            cpu.cpsr = 0x600001d3;
        }

        let mut input = request(b"Hg0");
        input.extend_from_slice(&request(b"p0"));
        input.extend_from_slice(&request(b"pf"));
        input.extend_from_slice(&request(b"p19"));
        input.extend_from_slice(&request(b"P1=deadbeef"));
        let (session, _) = run_session(target, input);

        let mut expected = Vec::new();
        for reply in [
            &b"OK"[..],
            b"44332211", // p0: big-endian byte order on the wire
            b"00000081", // pf = pc
            b"d3010060", // p19 = cpsr
            b"OK",
        ] {
            expected.push(b'+');
            expected.extend_from_slice(&frame_reply(reply));
        }
        assert_eq!(session.conn.output, expected);
        // writes land as the literal parsed value
        assert_eq!(thread.cpu().regs[1], 0xdeadbeef);
    }

    #[test]
    fn g_packet_carries_the_core_sixteen() {
        let target = TestTarget::new(0..0);
        let thread = target.spawn_thread(1);
        thread.cpu().regs[2] = 0xaabbccdd;

        let mut input = request(b"Hg0");
        input.extend_from_slice(&request(b"g"));
        let (session, _) = run_session(target, input);

        let mut body = Vec::new();
        for reg in 0..16 {
            body.extend_from_slice(if reg == 2 { b"ddccbbaa" } else { b"00000000" });
        }
        let mut expected = b"+".to_vec();
        expected.extend_from_slice(&frame_reply(b"OK"));
        expected.push(b'+');
        expected.extend_from_slice(&frame_reply(&body));
        assert_eq!(session.conn.output, expected);
    }

    #[test]
    fn kill_goes_silent_and_stops_the_session() {
        let target = TestTarget::new(0..0);
        let mut input = request(b"k");
        input.extend_from_slice(&request(b"qC"));
        let (session, die) = run_session(target, input);

        // the kill packet is acked but never answered, and the buffered
        // follow-up is not processed
        assert_eq!(session.conn.output, b"+".to_vec());
        assert!(die.load(Ordering::Relaxed));
    }

    #[test]
    fn detach_and_vkill_reply_ok() {
        let target = TestTarget::new(0..0);
        let mut input = request(b"D");
        input.extend_from_slice(&request(b"vKill;1"));
        let (session, _) = run_session(target, input);

        let mut expected = Vec::new();
        for _ in 0..2 {
            expected.push(b'+');
            expected.extend_from_slice(&frame_reply(b"OK"));
        }
        assert_eq!(session.conn.output, expected);
    }

    #[test]
    fn deprecated_resume_packets_get_empty_replies() {
        let target = TestTarget::new(0..0);
        let (session, _) = run_session(target, request(b"c"));

        let mut expected = b"+".to_vec();
        expected.extend_from_slice(&frame_reply(b""));
        assert_eq!(session.conn.output, expected);
    }
}
