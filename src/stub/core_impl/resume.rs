use std::time::Duration;

use log::{info, warn};

use super::prelude::*;
use crate::protocol::commands::Actions;
use crate::Cpu;
use crate::target::ThreadStatus;

/// How often the controller re-checks the thread table for a breakpoint
/// trigger while the guest runs. Bounds stop latency.
const BREAK_POLL_INTERVAL: Duration = Duration::from_millis(100);

impl GdbStubImpl {
    /// `vCont` — resume the guest and report the next stop.
    ///
    /// Only the first action is honored; a client that asks for per-thread
    /// action lists gets the first action applied to the inferior thread.
    pub(super) fn handle_vcont<T: Target>(
        &mut self,
        res: &mut ResponseWriter,
        target: &T,
        actions: Actions<'_>,
    ) {
        for action in actions.iter() {
            match action.kind {
                b'c' | b'C' | b's' | b'S' => {
                    let step = matches!(action.kind, b's' | b'S');

                    // the inferior thread is the one that last triggered a
                    // breakpoint; step or run it first
                    if self.inferior_thread != 0 {
                        if let Some(thread) = target.kernel().get_thread(self.inferior_thread) {
                            thread.resume(step);
                            if step {
                                // TODO: deadlocks if the stepped thread blocks
                                // on a sync primitive instead of settling
                                thread.wait_status_until(|s| s == ThreadStatus::Suspend);
                            }
                        }
                    }

                    if !step && !self.continue_all(target) {
                        // shutdown while waiting; no stop packet
                        return;
                    }

                    self.current_thread = self.inferior_thread;
                    return res.write_str("S05");
                }
                kind => warn!("unsupported vCont action {:?}", kind as char),
            }
        }
    }

    /// Continue-all: resume every suspended thread, poll until one of them
    /// parks on a breakpoint, then drive the rest out of `Run`. Returns
    /// false if the server was shut down mid-wait.
    fn continue_all<T: Target>(&mut self, target: &T) -> bool {
        // resume the world. Snapshot first: resuming blocks on each
        // thread's status handshake, and the kernel lock must not be held
        // across that wait.
        let threads: Vec<_> = target.kernel().threads().values().cloned().collect();
        for thread in threads {
            if thread.status() == ThreadStatus::Suspend {
                thread.resume(false);
                thread.wait_status_until(|s| s != ThreadStatus::Suspend);
            }
        }

        // wait until some thread triggers a breakpoint
        let inferior = loop {
            if self.server_die() {
                return false;
            }

            let hit = {
                let threads = target.kernel().threads();
                threads
                    .iter()
                    .find(|(_, thread)| {
                        thread.status() == ThreadStatus::Suspend
                            && thread.cpu().hit_breakpoint()
                    })
                    .map(|(&id, thread)| (id, thread.clone()))
            };

            if let Some((id, thread)) = hit {
                let cpu = thread.cpu();
                info!(
                    "breakpoint triggered by thread {:?} (id {}) at pc {:#010x}, lr {:#010x}",
                    thread.name(),
                    id,
                    cpu.pc(),
                    cpu.lr()
                );
                break id;
            }

            std::thread::sleep(BREAK_POLL_INTERVAL);
        };
        self.inferior_thread = inferior;

        // stop the world before reporting, so the client sees a fully
        // quiesced guest
        let threads: Vec<_> = target.kernel().threads().values().cloned().collect();
        for thread in threads {
            if thread.status() == ThreadStatus::Run {
                thread.suspend();
                thread.wait_status_until(|s| {
                    matches!(s, ThreadStatus::Suspend | ThreadStatus::Dormant)
                });
            }
        }

        true
    }
}
