//! The hook subsystem context object.
//!
//! [`HookSubsystem`] owns the global hook table, every thread's local hook table and the
//! handle table the records live in. All of it sits behind one coarse lock that is held
//! for every table read or mutation and released only while a callback runs or a
//! low-level hook call is forwarded to another thread. Chain use-counts keep records
//! that are removed during such a window from being freed under a walk in progress.

use std::collections::{
    HashMap,
    HashSet,
};
use std::fmt;
use std::sync::{
    Arc,
    Mutex,
    MutexGuard,
};

use tracing::trace;

use crate::config::HookConfig;
use crate::handle_table::HookHandle;
use crate::hook_type::{
    HookType,
    HookTypeFlags,
    TextEncoding,
};
use crate::hooking::HookProcInvoker;
use crate::internal::lock_unpoisoned;
use crate::memory::CallerMemory;
use crate::process::{
    ThreadId,
    ThreadManager,
};
use crate::station::WindowStation;
use crate::table::{
    HookScope,
    HookTables,
};
use crate::walker;

mod dispatch;
mod install;
mod teardown;

pub use install::InstallRequest;

/// The collaborators the subsystem relies on.
#[derive(Clone)]
pub struct HostServices {
    pub threads: Arc<dyn ThreadManager>,
    pub memory: Arc<dyn CallerMemory>,
    pub invoker: Arc<dyn HookProcInvoker>,
    pub station: Arc<dyn WindowStation>,
}

/// Snapshot counters of a [`HookSubsystem`].
#[derive(Copy, Clone, Eq, PartialEq, Default, Debug)]
pub struct HookStats {
    /// Records that will still be called.
    pub live_hooks: usize,
    /// Logically deleted records waiting for their chain to become idle.
    pub pending_removal: usize,
    pub local_tables: usize,
    pub global_table: bool,
}

/// Public view of a hook record.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct HookInfo {
    pub hook_type: HookType,
    pub scope: HookScope,
    pub owner: Option<ThreadId>,
    pub encoding: TextEncoding,
    pub module: Option<String>,
    /// `false` once removal was requested while the chain was in use.
    pub live: bool,
}

#[derive(Debug)]
pub(crate) struct HookState {
    tables: HookTables,
    thread_masks: HashMap<ThreadId, HookTypeFlags>,
    /// Threads whose queue is gone but whose local table still has chains in use.
    retired_queues: HashSet<ThreadId>,
}

impl HookState {
    fn set_mask_bit(&mut self, thread: ThreadId, hook_type: HookType) {
        *self.thread_masks.entry(thread).or_default() |= hook_type.flag();
    }

    fn clear_mask_bit(&mut self, thread: ThreadId, hook_type: HookType) {
        if let Some(mask) = self.thread_masks.get_mut(&thread) {
            mask.remove(hook_type.flag());
            if mask.is_empty() {
                self.thread_masks.remove(&thread);
            }
        }
    }
}

/// Window hook registration and dispatch.
pub struct HookSubsystem {
    config: HookConfig,
    services: HostServices,
    state: Mutex<HookState>,
}

impl HookSubsystem {
    pub fn new(config: HookConfig, services: HostServices) -> Self {
        trace!(?config, "hook subsystem created");
        HookSubsystem {
            config,
            services,
            state: Mutex::new(HookState {
                tables: HookTables::new(),
                thread_masks: HashMap::new(),
                retired_queues: HashSet::new(),
            }),
        }
    }

    pub fn config(&self) -> &HookConfig {
        &self.config
    }

    fn state(&self) -> MutexGuard<'_, HookState> {
        lock_unpoisoned(&self.state)
    }

    pub fn stats(&self) -> HookStats {
        let state = self.state();
        let (live_hooks, pending_removal) = state.tables.records.iter().fold(
            (0, 0),
            |(live, pending), (_, record)| {
                if record.is_live() {
                    (live + 1, pending)
                } else {
                    (live, pending + 1)
                }
            },
        );
        HookStats {
            live_hooks,
            pending_removal,
            local_tables: state.tables.local.len(),
            global_table: state.tables.global.is_some(),
        }
    }

    /// Live hooks a dispatch from `scope` would visit, in order.
    ///
    /// For a thread scope this includes the global chain the walk falls back to.
    pub fn chain(&self, scope: HookScope, hook_type: HookType) -> Vec<HookHandle> {
        walker::live_chain(&self.state().tables, scope, hook_type)
    }

    pub fn hook_info(&self, handle: HookHandle) -> Option<HookInfo> {
        self.state()
            .tables
            .records
            .get(handle)
            .map(|record| HookInfo {
                hook_type: record.hook_type,
                scope: record.scope,
                owner: record.owner,
                encoding: record.encoding,
                module: record.module.clone(),
                live: record.is_live(),
            })
    }

    /// Hook types installed on behalf of `thread`.
    pub fn thread_hook_mask(&self, thread: ThreadId) -> HookTypeFlags {
        self.state()
            .thread_masks
            .get(&thread)
            .copied()
            .unwrap_or_default()
    }

    pub fn thread_has_hook(&self, thread: ThreadId, hook_type: HookType) -> bool {
        self.thread_hook_mask(thread).contains(hook_type.flag())
    }
}

impl fmt::Debug for HookSubsystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookSubsystem")
            .field("config", &self.config)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use static_assertions::assert_impl_all;

    use super::*;
    use crate::test_support::TestHost;

    assert_impl_all!(HookSubsystem: Send, Sync);
    assert_impl_all!(HostServices: Send, Sync, Clone);

    #[test]
    fn fresh_subsystem_is_empty() {
        let host = TestHost::new();
        assert_eq!(host.subsystem.stats(), HookStats::default());
        assert!(host.subsystem.thread_hook_mask(ThreadId(1)).is_empty());
        assert!(
            host.subsystem
                .chain(HookScope::Global, HookType::MouseLowLevel)
                .is_empty()
        );
    }

    #[test]
    fn debug_output_names_config() {
        let host = TestHost::new();
        let debug = format!("{:?}", host.subsystem);
        assert!(debug.contains("low_level_timeout"));
    }
}
