//! Hook callbacks and the gate through which they are invoked.

use std::num::NonZeroUsize;

use crate::error::Result;
use crate::handle_table::HookHandle;
use crate::hook_type::{
    HookType,
    TextEncoding,
};
use crate::param::HookParam;
use crate::process::Caller;
use crate::subsystem::HookSubsystem;

/// Opaque callback entry point.
///
/// Meaningless to the subsystem beyond being handed back to the [`HookProcInvoker`].
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct HookProc(NonZeroUsize);

impl HookProc {
    /// Returns `None` for the empty callback.
    pub fn new(raw: usize) -> Option<Self> {
        NonZeroUsize::new(raw).map(HookProc)
    }

    pub fn get(self) -> usize {
        self.0.get()
    }
}

/// Identifies the hook whose callback is currently running, for continuing its chain.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct Continuation(HookHandle);

impl Continuation {
    pub fn from_handle(handle: HookHandle) -> Self {
        Continuation(handle)
    }

    pub fn handle(self) -> HookHandle {
        self.0
    }
}

/// A single callback invocation.
#[derive(Debug)]
pub struct HookCall<'a> {
    pub subsystem: &'a HookSubsystem,
    /// The thread the callback runs on.
    pub caller: Caller,
    pub continuation: Continuation,
    pub proc: HookProc,
    pub hook_type: HookType,
    pub code: i32,
    pub w_param: usize,
    /// The caller's original pointer parameter.
    pub l_param: usize,
    /// Marshalled view of `l_param`. Changes are copied back for hook types that return data through it.
    pub param: &'a mut HookParam,
    pub encoding: TextEncoding,
    pub module: Option<&'a str>,
}

impl HookCall<'_> {
    /// Continues the chain with the parameters this callback received.
    ///
    /// The next callback sees `param` as this one left it, and its changes are visible here afterwards.
    pub fn call_next(&mut self) -> Result<isize> {
        self.subsystem.call_next_marshalled(
            &self.caller,
            self.continuation,
            self.code,
            self.w_param,
            self.l_param,
            self.param,
        )
    }

    /// Continues the chain with different parameters, copying `l_param` in from caller memory again.
    pub fn call_next_with(&self, code: i32, w_param: usize, l_param: usize) -> Result<isize> {
        self.subsystem
            .call_next(&self.caller, self.continuation, code, w_param, l_param)
    }

    /// Converts a [`HookReturnValue`] into the raw callback result.
    pub fn complete(mut self, value: HookReturnValue) -> isize {
        match value {
            HookReturnValue::CallNextHook => self.call_next().unwrap_or_default(),
            HookReturnValue::BlockMessage => 1,
            HookReturnValue::PassToWindowProcOnly => 0,
            HookReturnValue::ExplicitValue(result) => result,
        }
    }
}

/// A value indicating what a callback wants done after it returns.
#[derive(Copy, Clone, PartialEq, Eq, Default, Debug)]
pub enum HookReturnValue {
    /// Returns the result of continuing the chain with the original parameters.
    #[default]
    CallNextHook,
    /// Prevents the event from being passed on to the target window procedure or the rest of the hook chain.
    BlockMessage,
    /// Passes the event to the target window procedure but not the rest of the hook chain.
    PassToWindowProcOnly,
    ExplicitValue(isize),
}

/// The gate that transfers control to a hook callback and back.
///
/// Implementations may re-enter the subsystem through [`HookCall::call_next`] or by
/// installing and removing hooks; no subsystem lock is held while this runs.
pub trait HookProcInvoker: Send + Sync {
    fn call_hook_proc(&self, call: HookCall<'_>) -> isize;
}
