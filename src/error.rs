//! Error type shared by all hook operations.

use thiserror::Error;

use crate::hook_type::HookType;
use crate::memory::MemoryFault;
use crate::process::ThreadId;

/// Errors returned by the kernel-call surface of [`HookSubsystem`](crate::HookSubsystem).
///
/// Every error is local to the operation that produced it. None are retried.
#[derive(Error, Clone, PartialEq, Eq, Debug)]
pub enum HookError {
    /// Stale, null or unknown hook handle.
    #[error("invalid hook handle")]
    InvalidHandle,
    /// Out-of-range hook type, empty callback or an illegal thread/scope combination.
    #[error("invalid parameter: {0}")]
    InvalidParameter(&'static str),
    /// The hook type is valid but its delivery is not implemented for the requested scope.
    #[error("hook type {0:?} is not supported in this scope")]
    NotSupported(HookType),
    /// The hook is owned by a thread other than the caller.
    #[error("hook is owned by another thread")]
    ThreadMismatch,
    /// Allocation of per-hook storage failed.
    #[error("out of memory")]
    OutOfMemory,
    /// Copying the caller supplied parameter structure faulted.
    #[error("malformed {hook_type:?} hook parameter")]
    MalformedParameter {
        hook_type: HookType,
        #[source]
        fault: MemoryFault,
    },
    /// The calling process has no usable window station.
    #[error("window station validation failed")]
    InvalidWindowStation,
    /// The thread object could not be referenced.
    #[error("thread {0} could not be referenced")]
    ThreadUnavailable(ThreadId),
}

pub type Result<T> = std::result::Result<T, HookError>;

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn malformed_parameter_exposes_fault_as_source() {
        let err = HookError::MalformedParameter {
            hook_type: HookType::GetMessage,
            fault: MemoryFault {
                address: 0x1000,
                len: 40,
            },
        };
        let source = err.source().expect("fault should be the source");
        assert!(source.to_string().contains("0x1000"));
    }

    #[test]
    fn display_mentions_thread() {
        let err = HookError::ThreadUnavailable(ThreadId(7));
        assert_eq!(err.to_string(), "thread 7 could not be referenced");
    }
}
