//! Fakes of the host collaborators for unit tests.

use std::collections::HashMap;
use std::sync::{
    Arc,
    Mutex,
};
use std::thread::{
    self,
    JoinHandle,
};

use tracing_subscriber::EnvFilter;

use crate::config::HookConfig;
use crate::error::{
    HookError,
    Result,
};
use crate::hooking::{
    HookCall,
    HookProcInvoker,
};
use crate::internal::lock_unpoisoned;
use crate::memory::{
    CallerMemory,
    RegionMemory,
};
use crate::messaging::{
    MessageQueue,
    channel_queue,
};
use crate::process::{
    Caller,
    ProcessId,
    ThreadId,
    ThreadInfo,
    ThreadManager,
};
use crate::station::InteractiveStation;
use crate::subsystem::{
    HookSubsystem,
    HostServices,
};

pub(crate) const PROCESS: ProcessId = ProcessId(1);
pub(crate) const FOREIGN_PROCESS: ProcessId = ProcessId(2);
pub(crate) const MAIN: Caller = Caller {
    thread: ThreadId(1),
    process: PROCESS,
};
pub(crate) const WORKER: Caller = Caller {
    thread: ThreadId(2),
    process: PROCESS,
};
pub(crate) const FOREIGN: Caller = Caller {
    thread: ThreadId(3),
    process: FOREIGN_PROCESS,
};

pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

struct FakeThread {
    process: ProcessId,
    references: usize,
    queue: Option<Arc<dyn MessageQueue>>,
}

#[derive(Default)]
pub(crate) struct FakeThreads {
    threads: Mutex<HashMap<ThreadId, FakeThread>>,
}

impl FakeThreads {
    pub(crate) fn new() -> Self {
        Default::default()
    }

    pub(crate) fn add_thread(&self, id: ThreadId, process: ProcessId) {
        lock_unpoisoned(&self.threads).insert(
            id,
            FakeThread {
                process,
                references: 0,
                queue: None,
            },
        );
    }

    pub(crate) fn set_queue(&self, id: ThreadId, queue: Option<Arc<dyn MessageQueue>>) {
        if let Some(thread) = lock_unpoisoned(&self.threads).get_mut(&id) {
            thread.queue = queue;
        }
    }

    pub(crate) fn references(&self, id: ThreadId) -> usize {
        lock_unpoisoned(&self.threads)
            .get(&id)
            .map_or(0, |thread| thread.references)
    }
}

impl ThreadManager for FakeThreads {
    fn lookup_thread(&self, id: ThreadId) -> Option<ThreadInfo> {
        lock_unpoisoned(&self.threads)
            .get(&id)
            .map(|thread| ThreadInfo {
                id,
                process: thread.process,
            })
    }

    fn reference_thread(&self, id: ThreadId) -> Result<()> {
        let mut threads = lock_unpoisoned(&self.threads);
        let thread = threads
            .get_mut(&id)
            .ok_or(HookError::ThreadUnavailable(id))?;
        thread.references += 1;
        Ok(())
    }

    fn dereference_thread(&self, id: ThreadId) {
        if let Some(thread) = lock_unpoisoned(&self.threads).get_mut(&id) {
            thread.references = thread
                .references
                .checked_sub(1)
                .expect("thread dereferenced more often than referenced");
        }
    }

    fn message_queue(&self, id: ThreadId) -> Option<Arc<dyn MessageQueue>> {
        lock_unpoisoned(&self.threads)
            .get(&id)
            .and_then(|thread| thread.queue.clone())
    }
}

type Callback = Arc<dyn Fn(HookCall<'_>) -> isize + Send + Sync>;

/// Maps callback tokens to closures.
#[derive(Default)]
pub(crate) struct ClosureInvoker {
    callbacks: Mutex<HashMap<usize, Callback>>,
}

impl ClosureInvoker {
    pub(crate) fn register<F>(&self, callback: F) -> usize
    where
        F: Fn(HookCall<'_>) -> isize + Send + Sync + 'static,
    {
        let mut callbacks = lock_unpoisoned(&self.callbacks);
        let token = 0x1000 + callbacks.len() * 0x10;
        callbacks.insert(token, Arc::new(callback));
        token
    }
}

impl HookProcInvoker for ClosureInvoker {
    fn call_hook_proc(&self, call: HookCall<'_>) -> isize {
        let callback = lock_unpoisoned(&self.callbacks)
            .get(&call.proc.get())
            .cloned();
        callback.map_or(0, |callback| callback(call))
    }
}

/// A subsystem wired to fakes, with two threads in [`PROCESS`] and one in [`FOREIGN_PROCESS`].
pub(crate) struct TestHost {
    pub(crate) subsystem: Arc<HookSubsystem>,
    pub(crate) threads: Arc<FakeThreads>,
    pub(crate) memory: Arc<RegionMemory>,
    pub(crate) invoker: Arc<ClosureInvoker>,
}

impl TestHost {
    pub(crate) fn new() -> Self {
        Self::with_config(HookConfig::default())
    }

    pub(crate) fn with_config(config: HookConfig) -> Self {
        Self::build(config, |memory| memory as Arc<dyn CallerMemory>)
    }

    /// A host whose caller memory is `wrap` layered over the usual [`RegionMemory`].
    pub(crate) fn wrapping_memory<F>(wrap: F) -> Self
    where
        F: FnOnce(Arc<RegionMemory>) -> Arc<dyn CallerMemory>,
    {
        Self::build(HookConfig::default(), wrap)
    }

    fn build<F>(config: HookConfig, wrap: F) -> Self
    where
        F: FnOnce(Arc<RegionMemory>) -> Arc<dyn CallerMemory>,
    {
        init_tracing();
        let threads = Arc::new(FakeThreads::new());
        for caller in [MAIN, WORKER, FOREIGN] {
            threads.add_thread(caller.thread, caller.process);
        }
        let memory = Arc::new(RegionMemory::new());
        let invoker = Arc::new(ClosureInvoker::default());
        let services = HostServices {
            threads: threads.clone(),
            memory: wrap(memory.clone()),
            invoker: invoker.clone(),
            station: Arc::new(InteractiveStation),
        };
        TestHost {
            subsystem: Arc::new(HookSubsystem::new(config, services)),
            threads,
            memory,
            invoker,
        }
    }

    pub(crate) fn proc<F>(&self, callback: F) -> usize
    where
        F: Fn(HookCall<'_>) -> isize + Send + Sync + 'static,
    {
        self.invoker.register(callback)
    }

    /// Services forwarded hook requests for `owner` on a separate OS thread.
    pub(crate) fn spawn_pump(&self, owner: Caller) -> Pump {
        let (queue, receiver) = channel_queue();
        self.threads
            .set_queue(owner.thread, Some(Arc::new(queue)));
        let subsystem = Arc::downgrade(&self.subsystem);
        Pump {
            owner,
            threads: self.threads.clone(),
            handle: Some(thread::spawn(move || receiver.run(subsystem, owner))),
        }
    }
}

/// A running request loop, stopped by dropping its queue.
pub(crate) struct Pump {
    owner: Caller,
    threads: Arc<FakeThreads>,
    handle: Option<JoinHandle<()>>,
}

impl Drop for Pump {
    fn drop(&mut self) {
        self.threads.set_queue(self.owner.thread, None);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
