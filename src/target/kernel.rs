use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex, MutexGuard};

use crate::target::Cpu;

/// Guest thread id. Unique while the thread is alive; negative values never
/// name a live thread (the server uses -1 as "no thread selected").
pub type Tid = i32;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThreadStatus {
    Run,
    Suspend,
    Dormant,
}

/// Scheduling primitives the guest kernel exposes for one thread.
///
/// Both calls only *request* a transition; the kernel reports the settled
/// status through [`GuestThread::set_status`], which is what wakes a
/// blocked caller.
pub trait ThreadControl: Send + Sync + 'static {
    /// Resume execution; single-step when `step` is set.
    fn resume(&self, step: bool);
    /// Park the thread at the next safe point.
    fn suspend(&self);
}

/// One guest thread as the server sees it: identity, a lockable CPU view,
/// and the status handshake.
pub struct GuestThread<C: Cpu> {
    id: Tid,
    name: String,
    cpu: Mutex<C>,
    status: Mutex<ThreadStatus>,
    status_cond: Condvar,
    control: Box<dyn ThreadControl>,
}

impl<C: Cpu> GuestThread<C> {
    pub fn new(
        id: Tid,
        name: impl Into<String>,
        cpu: C,
        status: ThreadStatus,
        control: impl ThreadControl,
    ) -> Arc<GuestThread<C>> {
        Arc::new(GuestThread {
            id,
            name: name.into(),
            cpu: Mutex::new(cpu),
            status: Mutex::new(status),
            status_cond: Condvar::new(),
            control: Box::new(control),
        })
    }

    pub fn id(&self) -> Tid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cpu(&self) -> MutexGuard<'_, C> {
        self.cpu.lock()
    }

    pub fn status(&self) -> ThreadStatus {
        *self.status.lock()
    }

    /// Report a settled status transition. Called by the emulator whenever
    /// the scheduler moves this thread; wakes any waiting controller.
    pub fn set_status(&self, status: ThreadStatus) {
        *self.status.lock() = status;
        self.status_cond.notify_all();
    }

    /// Ask the kernel to resume this thread (single-step when `step`).
    pub fn resume(&self, step: bool) {
        self.control.resume(step);
    }

    /// Ask the kernel to park this thread.
    pub fn suspend(&self) {
        self.control.suspend();
    }

    /// Block until the status satisfies `pred`.
    pub fn wait_status_until(&self, mut pred: impl FnMut(ThreadStatus) -> bool) {
        let mut status = self.status.lock();
        while !pred(*status) {
            self.status_cond.wait(&mut status);
        }
    }
}

/// The guest kernel's thread table.
///
/// `BTreeMap` keeps iteration order deterministic, which the thread-info
/// paging and "first live thread" resolution rely on.
pub struct Kernel<C: Cpu> {
    threads: Mutex<BTreeMap<Tid, Arc<GuestThread<C>>>>,
}

impl<C: Cpu> Kernel<C> {
    pub fn new() -> Kernel<C> {
        Kernel {
            threads: Mutex::new(BTreeMap::new()),
        }
    }

    /// Lock the thread table. This is "the kernel lock" of every handler;
    /// do not hold it across a status wait.
    pub fn threads(&self) -> MutexGuard<'_, BTreeMap<Tid, Arc<GuestThread<C>>>> {
        self.threads.lock()
    }

    pub fn get_thread(&self, id: Tid) -> Option<Arc<GuestThread<C>>> {
        self.threads.lock().get(&id).cloned()
    }

    /// Called by the emulator when a guest thread is created.
    pub fn register_thread(&self, thread: Arc<GuestThread<C>>) {
        self.threads.lock().insert(thread.id(), thread);
    }

    /// Called by the emulator when a guest thread exits or is killed.
    pub fn remove_thread(&self, id: Tid) -> Option<Arc<GuestThread<C>>> {
        self.threads.lock().remove(&id)
    }
}

impl<C: Cpu> Default for Kernel<C> {
    fn default() -> Kernel<C> {
        Kernel::new()
    }
}
