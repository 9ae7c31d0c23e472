//! Chain walking with fallback from a local table into the global table.

use crate::handle_table::HookHandle;
use crate::hook_type::HookType;
use crate::table::{
    HookScope,
    HookTable,
    HookTables,
};

/// Head of a chain, live or not.
pub(crate) fn first(table: &HookTable, hook_type: HookType) -> Option<HookHandle> {
    table.chain(hook_type).head
}

/// First record of a chain that has not been logically deleted.
pub(crate) fn first_live(
    tables: &HookTables,
    scope: HookScope,
    hook_type: HookType,
) -> Option<HookHandle> {
    let table = tables.table(scope)?;
    live_from(tables, first(table, hook_type))
}

fn live_from(tables: &HookTables, mut cursor: Option<HookHandle>) -> Option<HookHandle> {
    while let Some(handle) = cursor {
        let record = tables.records.get(handle)?;
        if record.is_live() {
            return Some(handle);
        }
        cursor = record.next;
    }
    None
}

/// Next live record after `handle` in its own chain.
///
/// When a local chain is exhausted, the walk continues at the first live record of the
/// global chain for the same type.
pub(crate) fn next(tables: &HookTables, handle: HookHandle) -> Option<HookHandle> {
    let record = tables.records.get(handle)?;
    live_from(tables, record.next).or_else(|| match record.scope {
        HookScope::Thread(_) => first_live(tables, HookScope::Global, record.hook_type),
        HookScope::Global => None,
    })
}

/// Live records visible from `scope`, in execution order.
pub(crate) fn live_chain(
    tables: &HookTables,
    scope: HookScope,
    hook_type: HookType,
) -> Vec<HookHandle> {
    let mut handles = Vec::new();
    let mut cursor = first_live(tables, scope, hook_type);
    if cursor.is_none() && scope != HookScope::Global {
        cursor = first_live(tables, HookScope::Global, hook_type);
    }
    while let Some(handle) = cursor {
        handles.push(handle);
        cursor = next(tables, handle);
    }
    handles
}
