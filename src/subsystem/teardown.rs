//! Hook removal and cleanup when threads and their queues go away.

use tracing::{
    debug,
    trace,
    warn,
};

use super::{
    HookState,
    HookSubsystem,
};
use crate::error::{
    HookError,
    Result,
};
use crate::handle_table::HookHandle;
use crate::hook_type::HookType;
use crate::process::{
    Caller,
    ThreadId,
    ThreadManager,
};

impl HookState {
    /// Deletes a hook, physically if its chain is idle and logically otherwise.
    pub(super) fn remove_hook(&mut self, handle: HookHandle, threads: &dyn ThreadManager) {
        let Some(record) = self.tables.records.get(handle) else {
            return;
        };
        let (scope, hook_type, owner) = (record.scope, record.hook_type, record.owner);
        if let Some(owner) = owner {
            self.clear_mask_bit(owner, hook_type);
        }
        if self.tables.use_count(scope, hook_type) != 0 {
            if let Some(record) = self.tables.records.get_mut(handle) {
                record.proc = None;
            }
            debug!(?handle, ?hook_type, "hook chain in use, removal deferred");
        } else {
            self.free_hook(handle, threads);
        }
    }

    /// Unlinks and destroys a record, releasing its thread reference.
    pub(super) fn free_hook(&mut self, handle: HookHandle, threads: &dyn ThreadManager) {
        let Some(record) = self.tables.unlink_and_remove(handle) else {
            return;
        };
        if record.thread_referenced
            && let Some(owner) = record.owner
        {
            threads.dereference_thread(owner);
        }
        trace!(?handle, hook_type = ?record.hook_type, "hook freed");
    }

    /// Discards the local table of a destroyed queue once nothing walks it any more.
    pub(super) fn drop_local_table_if_orphaned(&mut self, thread: ThreadId) {
        if !self.retired_queues.contains(&thread) {
            return;
        }
        if self
            .tables
            .local
            .get(&thread)
            .is_none_or(|table| table.is_empty())
        {
            self.tables.local.remove(&thread);
            self.retired_queues.remove(&thread);
            trace!(%thread, "local hook table released");
        }
    }
}

impl HookSubsystem {
    /// Removes a hook installed by the caller's process.
    pub fn uninstall(&self, caller: &Caller, handle: HookHandle) -> Result<()> {
        self.services.station.validate(caller.process)?;
        let mut state = self.state();
        let record = state
            .tables
            .records
            .get(handle)
            .filter(|record| record.is_live())
            .ok_or(HookError::InvalidHandle)?;
        if record.process != caller.process {
            warn!(?handle, caller = %caller.process, owner = %record.process, "hook belongs to another process");
            return Err(HookError::ThreadMismatch);
        }
        debug!(?handle, hook_type = ?record.hook_type, "uninstalling hook");
        state.remove_hook(handle, self.services.threads.as_ref());
        Ok(())
    }

    /// Removes the global low-level hooks installed by an exiting thread.
    pub fn thread_teardown(&self, thread: ThreadId) {
        let mut state = self.state();
        let Some(global) = state.tables.global.as_ref() else {
            return;
        };
        let owned: Vec<HookHandle> = [HookType::KeyboardLowLevel, HookType::MouseLowLevel]
            .into_iter()
            .flat_map(|hook_type| global.handles(&state.tables.records, hook_type))
            .filter(|&handle| {
                state
                    .tables
                    .records
                    .get(handle)
                    .is_some_and(|record| record.is_live() && record.owner == Some(thread))
            })
            .collect();
        if !owned.is_empty() {
            debug!(%thread, count = owned.len(), "removing low-level hooks of exiting thread");
        }
        for handle in owned {
            state.remove_hook(handle, self.services.threads.as_ref());
        }
    }

    /// Frees the local hook table of a thread whose message queue is destroyed.
    ///
    /// Chains still being walked are emptied once their last walk finishes.
    pub fn queue_destroyed(&self, thread: ThreadId) {
        let mut state = self.state();
        let threads = self.services.threads.as_ref();
        let Some(table) = state.tables.local.get(&thread) else {
            return;
        };
        let mut free = Vec::new();
        let mut deferred = Vec::new();
        let mut hooked_types = Vec::new();
        for hook_type in HookType::ALL {
            let handles = table.handles(&state.tables.records, hook_type);
            if handles.is_empty() {
                continue;
            }
            hooked_types.push(hook_type);
            if table.use_count(hook_type) == 0 {
                free.extend(handles);
            } else {
                deferred.extend(handles);
            }
        }
        debug!(%thread, freed = free.len(), deferred = deferred.len(), "message queue destroyed");
        for handle in free {
            state.free_hook(handle, threads);
        }
        for handle in deferred {
            if let Some(record) = state.tables.records.get_mut(handle) {
                record.proc = None;
            }
        }
        for hook_type in hooked_types {
            state.clear_mask_bit(thread, hook_type);
        }
        state.retired_queues.insert(thread);
        state.drop_local_table_if_orphaned(thread);
    }
}
