/*!
Window hook registration and dispatch for a window manager.

A [`HookSubsystem`] keeps one process-wide hook table and one table per UI thread. Hooks
are installed into a table's per-type chain, events are dispatched to the first live hook
visible from the calling thread, and callbacks continue the chain with
[`HookCall::call_next`]. The host supplies threads, message queues, caller memory, the
window station and the callback gate through [`HostServices`].

Low-level keyboard and mouse hooks always run on the thread that installed them. Events
raised on other threads are forwarded through that thread's [`MessageQueue`] and answered
by its [`HookRequestReceiver`].
*/

#![cfg_attr(nightly, feature(doc_cfg))]

pub mod config;
pub mod error;
pub mod handle_table;
pub mod hook_type;
pub mod hooking;
pub mod input;
mod internal;
pub mod memory;
pub mod message;
pub mod messaging;
mod module;
pub mod param;
pub mod process;
pub mod station;
pub mod subsystem;
mod table;
#[cfg(test)]
mod test_support;
mod walker;
#[cfg(all(windows, feature = "win32"))]
#[cfg_attr(nightly, doc(cfg(all(windows, feature = "win32"))))]
pub mod win32;

pub use config::HookConfig;
pub use error::{
    HookError,
    Result,
};
pub use handle_table::HookHandle;
pub use hook_type::{
    CbtCode,
    HookType,
    HookTypeFlags,
    TextEncoding,
};
pub use hooking::{
    Continuation,
    HookCall,
    HookProc,
    HookProcInvoker,
    HookReturnValue,
};
pub use memory::{
    CallerMemory,
    MemoryFault,
};
pub use messaging::{
    HookRequest,
    HookRequestReceiver,
    MessageQueue,
    channel_queue,
};
pub use param::{
    HookParam,
    HookStruct,
};
pub use process::{
    Caller,
    ProcessId,
    ThreadId,
    ThreadManager,
};
pub use station::WindowStation;
pub use subsystem::{
    HookInfo,
    HookStats,
    HookSubsystem,
    HostServices,
    InstallRequest,
};
pub use table::HookScope;
