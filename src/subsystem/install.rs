//! Hook installation.

use tracing::{
    debug,
    trace,
    warn,
};

use super::HookSubsystem;
use crate::error::{
    HookError,
    Result,
};
use crate::handle_table::HookHandle;
use crate::hook_type::{
    HookType,
    TextEncoding,
};
use crate::hooking::HookProc;
use crate::module::duplicate_module_identity;
use crate::process::{
    Caller,
    ThreadId,
};
use crate::table::{
    HookRecord,
    HookScope,
};

/// Parameters of a hook installation.
///
/// Type and callback are taken raw so that they are validated like any other caller input.
#[derive(Clone, Debug)]
pub struct InstallRequest<'a> {
    raw_type: i32,
    raw_proc: usize,
    encoding: TextEncoding,
    thread: Option<ThreadId>,
    module: Option<&'a str>,
}

impl<'a> InstallRequest<'a> {
    /// A process-wide hook with a Unicode callback.
    pub fn new(raw_type: i32, raw_proc: usize) -> Self {
        InstallRequest {
            raw_type,
            raw_proc,
            encoding: TextEncoding::default(),
            thread: None,
            module: None,
        }
    }

    /// Restricts the hook to events of one thread.
    pub fn thread(mut self, thread: ThreadId) -> Self {
        self.thread = Some(thread);
        self
    }

    /// Identity of the module containing the callback, required for process-wide hooks
    /// other than the low-level ones.
    pub fn module(mut self, module: &'a str) -> Self {
        self.module = Some(module);
        self
    }

    pub fn encoding(mut self, encoding: TextEncoding) -> Self {
        self.encoding = encoding;
        self
    }
}

struct Placement<'a> {
    scope: HookScope,
    owner: Option<ThreadId>,
    module: Option<&'a str>,
}

impl HookSubsystem {
    /// Registers a hook and returns its handle.
    ///
    /// The new hook is placed at the head of its chain and therefore runs before every
    /// hook of the same type installed earlier.
    pub fn install(&self, caller: &Caller, request: InstallRequest<'_>) -> Result<HookHandle> {
        trace!(thread = %caller.thread, raw_type = request.raw_type, "installing hook");
        let hook_type = HookType::try_from(request.raw_type)
            .map_err(|_| HookError::InvalidParameter("hook type out of range"))?;
        let proc = HookProc::new(request.raw_proc)
            .ok_or(HookError::InvalidParameter("empty hook procedure"))?;
        let placement = self.place(caller, hook_type, &request)?;
        let global = placement.scope == HookScope::Global;
        if !hook_type.is_installable(global) {
            debug!(?hook_type, global, "hook type not supported");
            return Err(HookError::NotSupported(hook_type));
        }
        self.services.station.validate(caller.process)?;

        let threads = self.services.threads.as_ref();
        let mut state = self.state();
        if let Some(owner) = placement.owner {
            threads.reference_thread(owner)?;
        }
        let record = HookRecord {
            hook_type,
            scope: placement.scope,
            owner: placement.owner,
            process: caller.process,
            proc: Some(proc),
            encoding: request.encoding,
            thread_referenced: placement.owner.is_some(),
            module: None,
            prev: None,
            next: None,
        };
        let handle = match state.tables.insert(record) {
            Ok(handle) => handle,
            Err(err) => {
                if let Some(owner) = placement.owner {
                    threads.dereference_thread(owner);
                }
                return Err(err);
            }
        };
        if let Some(owner) = placement.owner {
            state.set_mask_bit(owner, hook_type);
        }
        if let Some(module) = placement.module {
            match duplicate_module_identity(module) {
                Ok(module) => {
                    if let Some(record) = state.tables.records.get_mut(handle) {
                        record.module = Some(module);
                    }
                }
                Err(err) => {
                    warn!(?hook_type, "module identity could not be stored");
                    state.remove_hook(handle, threads);
                    return Err(err);
                }
            }
        }
        debug!(?handle, ?hook_type, scope = ?placement.scope, "hook installed");
        Ok(handle)
    }

    /// Installs a process-wide hook without thread or module, as the legacy entry point does.
    ///
    /// Only the low-level hooks can be installed this way.
    pub fn install_simple(
        &self,
        caller: &Caller,
        raw_type: i32,
        raw_proc: usize,
        encoding: TextEncoding,
    ) -> Result<HookHandle> {
        self.install(caller, InstallRequest::new(raw_type, raw_proc).encoding(encoding))
    }

    /// Decides which table a hook goes into and which thread, if any, owns it.
    fn place<'a>(
        &self,
        caller: &Caller,
        hook_type: HookType,
        request: &InstallRequest<'a>,
    ) -> Result<Placement<'a>> {
        if let Some(thread) = request.thread {
            if hook_type.is_global_only() {
                return Err(HookError::InvalidParameter(
                    "hook type cannot be installed for a single thread",
                ));
            }
            if !self.services.threads.same_process(thread, caller.process) {
                return Err(HookError::InvalidParameter(
                    "thread unknown or in another process",
                ));
            }
            return Ok(Placement {
                scope: HookScope::Thread(thread),
                owner: Some(thread),
                module: None,
            });
        }
        if hook_type.is_low_level() {
            return Ok(Placement {
                scope: HookScope::Global,
                owner: Some(caller.thread),
                module: None,
            });
        }
        match request.module {
            Some(module) => Ok(Placement {
                scope: HookScope::Global,
                owner: None,
                module: Some(module),
            }),
            None => Err(HookError::InvalidParameter(
                "process-wide hook requires a module",
            )),
        }
    }
}
