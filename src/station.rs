//! Window station validation.

use crate::error::Result;
use crate::process::ProcessId;

/// Validates that a process is attached to a usable window station.
///
/// Consulted at the start of every installation, removal and continuation.
pub trait WindowStation: Send + Sync {
    fn validate(&self, process: ProcessId) -> Result<()>;
}

/// A window station that accepts every process.
#[derive(Copy, Clone, Default, Debug)]
pub struct InteractiveStation;

impl WindowStation for InteractiveStation {
    fn validate(&self, _process: ProcessId) -> Result<()> {
        Ok(())
    }
}
