//! Event dispatch, chain continuation and cross-thread forwarding.

use tracing::{
    debug,
    error,
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
use crate::hooking::{
    Continuation,
    HookCall,
};
use crate::messaging::HookRequest;
use crate::param::{
    self,
    Delivery,
    HookParam,
};
use crate::process::{
    Caller,
    ThreadId,
    ThreadManager,
};
use crate::table::HookScope;
use crate::walker;

/// Use-count held on the chains a callback runs in.
///
/// Released when dropped, so an unwinding callback still lets pending removals complete.
struct ChainUse<'a> {
    subsystem: &'a HookSubsystem,
    scope: HookScope,
    hook_type: HookType,
    on_scope: bool,
    also_global: bool,
}

impl<'a> ChainUse<'a> {
    fn acquire(
        subsystem: &'a HookSubsystem,
        state: &mut HookState,
        scope: HookScope,
        hook_type: HookType,
    ) -> Self {
        let mut on_scope = false;
        if let Some(table) = state.tables.table_mut(scope) {
            table.chain_mut(hook_type).use_count += 1;
            on_scope = true;
        }
        let mut also_global = false;
        if scope != HookScope::Global
            && let Some(global) = state.tables.global.as_mut()
        {
            global.chain_mut(hook_type).use_count += 1;
            also_global = true;
        }
        ChainUse {
            subsystem,
            scope,
            hook_type,
            on_scope,
            also_global,
        }
    }
}

impl Drop for ChainUse<'_> {
    fn drop(&mut self) {
        let mut state = self.subsystem.state();
        let threads = self.subsystem.services.threads.as_ref();
        if self.on_scope {
            state.release_chain(self.scope, self.hook_type, threads);
        }
        if self.also_global {
            state.release_chain(HookScope::Global, self.hook_type, threads);
        }
    }
}

impl HookState {
    /// Drops one use of a chain and frees its logically deleted records once it is idle.
    fn release_chain(
        &mut self,
        scope: HookScope,
        hook_type: HookType,
        threads: &dyn ThreadManager,
    ) {
        let Some(table) = self.tables.table_mut(scope) else {
            return;
        };
        let chain = table.chain_mut(hook_type);
        if chain.use_count == 0 {
            error!(?scope, ?hook_type, "hook chain use-count underflow");
            return;
        }
        chain.use_count -= 1;
        if chain.use_count != 0 {
            return;
        }
        let Some(table) = self.tables.table(scope) else {
            return;
        };
        let pending: Vec<HookHandle> = table
            .handles(&self.tables.records, hook_type)
            .into_iter()
            .filter(|&handle| {
                self.tables
                    .records
                    .get(handle)
                    .is_some_and(|record| !record.is_live())
            })
            .collect();
        for handle in pending {
            self.free_hook(handle, threads);
        }
        if let HookScope::Thread(thread) = scope {
            self.drop_local_table_if_orphaned(thread);
        }
    }
}

impl HookSubsystem {
    /// Delivers an event to the hooks of `hook_type` visible from the calling thread.
    ///
    /// The calling thread's local chain runs first, then the global chain. Both stay in use
    /// from the moment the first hook is picked, so hooks removed meanwhile are skipped
    /// rather than freed under the walk. Returns the result of the first callback, or 0 when
    /// there is no hook or the event could not be delivered.
    pub fn dispatch(
        &self,
        caller: &Caller,
        hook_type: HookType,
        code: i32,
        w_param: usize,
        l_param: usize,
    ) -> isize {
        trace!(thread = %caller.thread, ?hook_type, code, "dispatching hook event");
        let local = HookScope::Thread(caller.thread);
        let (target, _walk) = {
            let mut state = self.state();
            let target = walker::first_live(&state.tables, local, hook_type)
                .or_else(|| walker::first_live(&state.tables, HookScope::Global, hook_type));
            let Some(target) = target else {
                trace!(?hook_type, "no hook installed");
                return 0;
            };
            (target, ChainUse::acquire(self, &mut *state, local, hook_type))
        };
        self.call_marshalled(caller, target, hook_type, code, w_param, l_param)
    }

    /// Passes an event on from the callback identified by `continuation` to the next hook.
    ///
    /// `l_param` is copied in from the caller's memory again. Returns `Ok(0)` at the end of
    /// the chain.
    pub fn call_next(
        &self,
        caller: &Caller,
        continuation: Continuation,
        code: i32,
        w_param: usize,
        l_param: usize,
    ) -> Result<isize> {
        let Some((hook_type, next)) = self.resolve_next(caller, continuation)? else {
            return Ok(0);
        };
        Ok(self.call_marshalled(caller, next, hook_type, code, w_param, l_param))
    }

    pub(crate) fn call_next_marshalled(
        &self,
        caller: &Caller,
        continuation: Continuation,
        code: i32,
        w_param: usize,
        l_param: usize,
        param: &mut HookParam,
    ) -> Result<isize> {
        let Some((hook_type, next)) = self.resolve_next(caller, continuation)? else {
            return Ok(0);
        };
        Ok(self.deliver(caller, next, hook_type, code, w_param, l_param, param))
    }

    fn resolve_next(
        &self,
        caller: &Caller,
        continuation: Continuation,
    ) -> Result<Option<(HookType, HookHandle)>> {
        self.services.station.validate(caller.process)?;
        let state = self.state();
        let handle = continuation.handle();
        let record = state
            .tables
            .records
            .get(handle)
            .ok_or(HookError::InvalidHandle)?;
        if let Some(owner) = record.owner
            && owner != caller.thread
        {
            warn!(%owner, caller = %caller.thread, "chain continued from a foreign thread");
            return Err(HookError::ThreadMismatch);
        }
        let next = walker::next(&state.tables, handle);
        trace!(?handle, ?next, "continuing hook chain");
        Ok(next.map(|next| (record.hook_type, next)))
    }

    /// Answers a low-level hook call forwarded to this thread.
    ///
    /// Should the target have been removed meanwhile, the next live hook of its chain is
    /// called instead.
    pub fn process_hook_request(&self, owner: &Caller, request: HookRequest) -> isize {
        let target = {
            let state = self.state();
            match state.tables.records.get(request.target) {
                Some(record) if record.is_live() => Some(request.target),
                Some(_) => walker::next(&state.tables, request.target),
                None => None,
            }
        };
        let Some(target) = target else {
            debug!(?request.target, "forwarded hook is gone");
            return 0;
        };
        let mut param = request.param;
        self.deliver(
            owner,
            target,
            request.hook_type,
            request.code,
            request.w_param,
            request.l_param,
            &mut param,
        )
    }

    fn call_marshalled(
        &self,
        caller: &Caller,
        target: HookHandle,
        hook_type: HookType,
        code: i32,
        w_param: usize,
        l_param: usize,
    ) -> isize {
        let memory = self.services.memory.as_ref();
        let mut param = match param::marshal_in(memory, caller.process, hook_type, code, l_param) {
            Ok(Delivery::Chain(param)) => param,
            Ok(Delivery::DebugStub) => return self.call_debug_hook(code, w_param, l_param),
            Ok(Delivery::Unsupported) => {
                debug!(?hook_type, "no delivery for hook type");
                return 0;
            }
            Err(err) => {
                param::report_malformed(&err, "in");
                return 0;
            }
        };
        let result = self.deliver(caller, target, hook_type, code, w_param, l_param, &mut param);
        if let Err(err) = param::write_back(memory, caller.process, hook_type, l_param, &param) {
            param::report_malformed(&err, "out");
        }
        result
    }

    fn call_debug_hook(&self, code: i32, w_param: usize, l_param: usize) -> isize {
        debug!(code, w_param, l_param, "debug hook delivery is not implemented");
        0
    }

    #[allow(clippy::too_many_arguments)]
    fn deliver(
        &self,
        caller: &Caller,
        target: HookHandle,
        hook_type: HookType,
        code: i32,
        w_param: usize,
        l_param: usize,
        param: &mut HookParam,
    ) -> isize {
        let mut state = self.state();
        let mut target = target;
        let (record, proc) = loop {
            let Some(record) = state.tables.records.get(target) else {
                debug!(?target, "hook freed before delivery");
                return 0;
            };
            if let Some(proc) = record.proc {
                break (record, proc);
            }
            let Some(next) = walker::next(&state.tables, target) else {
                debug!(?target, "hook removed before delivery, chain exhausted");
                return 0;
            };
            trace!(removed = ?target, ?next, "skipping removed hook");
            target = next;
        };
        if let Some(owner) = record.owner
            && owner != caller.thread
        {
            drop(state);
            if hook_type.is_low_level() {
                let request = HookRequest {
                    target,
                    hook_type,
                    code,
                    w_param,
                    l_param,
                    param: *param,
                };
                return self.forward(owner, request);
            }
            debug!(%owner, ?hook_type, "calling hooks in other threads is not implemented");
            return 0;
        }
        let scope = record.scope;
        let encoding = record.encoding;
        let module = record.module.clone();
        let guard = ChainUse::acquire(self, &mut *state, scope, hook_type);
        drop(state);

        trace!(?target, ?hook_type, code, "calling hook");
        let result = self.services.invoker.call_hook_proc(HookCall {
            subsystem: self,
            caller: *caller,
            continuation: Continuation::from_handle(target),
            proc,
            hook_type,
            code,
            w_param,
            l_param,
            param,
            encoding,
            module: module.as_deref(),
        });
        drop(guard);
        result
    }

    /// Sends a low-level hook call to the owning thread and waits for its answer.
    fn forward(&self, owner: ThreadId, request: HookRequest) -> isize {
        let Some(queue) = self.services.threads.message_queue(owner) else {
            warn!(%owner, "hook owner has no message queue");
            return 0;
        };
        debug!(%owner, ?request.hook_type, "calling hook in owning thread");
        match queue.send_hook_request(request, self.config.low_level_timeout) {
            Ok(result) => result,
            Err(err) => {
                warn!(%owner, %err, "forwarded hook call failed");
                0
            }
        }
    }
}
