/*!
Threads, processes and the thread object manager.
*/

use std::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::messaging::MessageQueue;

/// Identifier of a UI thread.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct ThreadId(pub u32);

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a process.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct ProcessId(pub u32);

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The thread on whose behalf a kernel call executes.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct Caller {
    pub thread: ThreadId,
    pub process: ProcessId,
}

impl Caller {
    pub fn new(thread: ThreadId, process: ProcessId) -> Self {
        Caller { thread, process }
    }
}

/// What the thread object manager knows about a thread.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct ThreadInfo {
    pub id: ThreadId,
    pub process: ProcessId,
}

/// Thread and process object manager.
///
/// References taken with [`ThreadManager::reference_thread`] keep the thread object alive
/// for as long as a hook record owned by it exists. Every successful reference is paired
/// with exactly one [`ThreadManager::dereference_thread`].
pub trait ThreadManager: Send + Sync {
    /// Looks up a live thread by id.
    fn lookup_thread(&self, id: ThreadId) -> Option<ThreadInfo>;

    fn reference_thread(&self, id: ThreadId) -> Result<()>;

    fn dereference_thread(&self, id: ThreadId);

    /// The message queue attached to the given UI thread, if it has one.
    fn message_queue(&self, id: ThreadId) -> Option<Arc<dyn MessageQueue>>;

    fn same_process(&self, thread: ThreadId, process: ProcessId) -> bool {
        self.lookup_thread(thread)
            .is_some_and(|info| info.process == process)
    }
}
