//! Hook records and hook tables.
//!
//! A hook table holds one doubly-linked chain per hook type. Links are handles into the
//! shared [`HandleTable`], so records are addressable both by handle and through their chain.

use std::collections::HashMap;

use crate::handle_table::{
    HandleTable,
    HookHandle,
};
use crate::hook_type::{
    HOOK_TYPE_COUNT,
    HookType,
    TextEncoding,
};
use crate::hooking::HookProc;
use crate::process::{
    ProcessId,
    ThreadId,
};

/// Which hook table a record or chain belongs to.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum HookScope {
    /// The process-wide table.
    Global,
    /// The table attached to this UI thread's message queue.
    Thread(ThreadId),
}

/// A registered hook.
#[derive(Debug)]
pub(crate) struct HookRecord {
    pub(crate) hook_type: HookType,
    /// Fixed at creation.
    pub(crate) scope: HookScope,
    /// `None` for process-wide hooks without thread affinity.
    pub(crate) owner: Option<ThreadId>,
    /// Process that installed the hook.
    pub(crate) process: ProcessId,
    /// `None` once the record has been logically deleted.
    pub(crate) proc: Option<HookProc>,
    pub(crate) encoding: TextEncoding,
    /// Whether a reference on `owner` is held for the lifetime of this record.
    pub(crate) thread_referenced: bool,
    pub(crate) module: Option<String>,
    pub(crate) prev: Option<HookHandle>,
    pub(crate) next: Option<HookHandle>,
}

impl HookRecord {
    pub(crate) fn is_live(&self) -> bool {
        self.proc.is_some()
    }
}

#[derive(Default, Debug)]
pub(crate) struct Chain {
    pub(crate) head: Option<HookHandle>,
    pub(crate) tail: Option<HookHandle>,
    /// Number of dispatches currently walking this chain.
    pub(crate) use_count: u32,
}

#[derive(Default, Debug)]
pub(crate) struct HookTable {
    chains: [Chain; HOOK_TYPE_COUNT],
}

impl HookTable {
    pub(crate) fn new() -> Self {
        Default::default()
    }

    pub(crate) fn chain(&self, hook_type: HookType) -> &Chain {
        &self.chains[hook_type.index()]
    }

    pub(crate) fn chain_mut(&mut self, hook_type: HookType) -> &mut Chain {
        &mut self.chains[hook_type.index()]
    }

    pub(crate) fn use_count(&self, hook_type: HookType) -> u32 {
        self.chain(hook_type).use_count
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.chains.iter().all(|chain| chain.head.is_none())
    }

    /// Links an already stored record at the head of its chain, so that it runs first.
    pub(crate) fn insert_head(&mut self, records: &mut HandleTable<HookRecord>, handle: HookHandle) {
        let Some(hook_type) = records.get(handle).map(|record| record.hook_type) else {
            return;
        };
        let chain = self.chain_mut(hook_type);
        let old_head = chain.head.replace(handle);
        if chain.tail.is_none() {
            chain.tail = Some(handle);
        }
        if let Some(old_head) = old_head
            && let Some(old) = records.get_mut(old_head)
        {
            old.prev = Some(handle);
        }
        if let Some(record) = records.get_mut(handle) {
            record.prev = None;
            record.next = old_head;
        }
    }

    /// Removes a record from its chain, leaving it stored in `records`.
    pub(crate) fn unlink(&mut self, records: &mut HandleTable<HookRecord>, handle: HookHandle) {
        let Some((hook_type, prev, next)) = records
            .get(handle)
            .map(|record| (record.hook_type, record.prev, record.next))
        else {
            return;
        };
        let chain = self.chain_mut(hook_type);
        match prev.and_then(|prev| records.get_mut(prev)) {
            Some(prev_record) => prev_record.next = next,
            None => chain.head = next,
        }
        match next.and_then(|next| records.get_mut(next)) {
            Some(next_record) => next_record.prev = prev,
            None => chain.tail = prev,
        }
        if let Some(record) = records.get_mut(handle) {
            record.prev = None;
            record.next = None;
        }
    }

    /// Handles of all records in a chain, logically deleted ones included, head first.
    pub(crate) fn handles(
        &self,
        records: &HandleTable<HookRecord>,
        hook_type: HookType,
    ) -> Vec<HookHandle> {
        let mut handles = Vec::new();
        let mut cursor = self.chain(hook_type).head;
        while let Some(handle) = cursor {
            handles.push(handle);
            cursor = records.get(handle).and_then(|record| record.next);
        }
        handles
    }
}

/// The global table, every local table and the records they chain.
#[derive(Debug)]
pub(crate) struct HookTables {
    pub(crate) records: HandleTable<HookRecord>,
    /// Created on first global installation and kept for the lifetime of the subsystem.
    pub(crate) global: Option<HookTable>,
    pub(crate) local: HashMap<ThreadId, HookTable>,
}

impl HookTables {
    pub(crate) fn new() -> Self {
        HookTables {
            records: HandleTable::new(),
            global: None,
            local: HashMap::new(),
        }
    }

    pub(crate) fn table(&self, scope: HookScope) -> Option<&HookTable> {
        match scope {
            HookScope::Global => self.global.as_ref(),
            HookScope::Thread(thread) => self.local.get(&thread),
        }
    }

    pub(crate) fn table_mut(&mut self, scope: HookScope) -> Option<&mut HookTable> {
        match scope {
            HookScope::Global => self.global.as_mut(),
            HookScope::Thread(thread) => self.local.get_mut(&thread),
        }
    }

    /// Stores `record` and links it at the head of its chain, creating the table if needed.
    pub(crate) fn insert(&mut self, record: HookRecord) -> crate::error::Result<HookHandle> {
        let scope = record.scope;
        let handle = self.records.create(record)?;
        let table = match scope {
            HookScope::Global => self.global.get_or_insert_with(HookTable::new),
            HookScope::Thread(thread) => self.local.entry(thread).or_default(),
        };
        table.insert_head(&mut self.records, handle);
        Ok(handle)
    }

    /// Unlinks the record and deletes it from the handle table.
    pub(crate) fn unlink_and_remove(&mut self, handle: HookHandle) -> Option<HookRecord> {
        let scope = self.records.get(handle)?.scope;
        if let Some(table) = match scope {
            HookScope::Global => self.global.as_mut(),
            HookScope::Thread(thread) => self.local.get_mut(&thread),
        } {
            table.unlink(&mut self.records, handle);
        }
        self.records.remove(handle)
    }

    pub(crate) fn use_count(&self, scope: HookScope, hook_type: HookType) -> u32 {
        self.table(scope)
            .map_or(0, |table| table.use_count(hook_type))
    }
}
