//! Module identity captured for global hooks.

use crate::error::{
    HookError,
    Result,
};

/// Duplicates a caller supplied module identity into storage owned by a hook record.
///
/// Allocation failure is reported as [`HookError::OutOfMemory`] rather than aborting.
pub(crate) fn duplicate_module_identity(name: &str) -> Result<String> {
    let mut owned = String::new();
    owned
        .try_reserve_exact(name.len())
        .map_err(|_| HookError::OutOfMemory)?;
    owned.push_str(name);
    Ok(owned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicates_exactly() -> anyhow::Result<()> {
        let copy = duplicate_module_identity(r"C:\Windows\System32\hooks.dll")?;
        assert_eq!(copy, r"C:\Windows\System32\hooks.dll");
        assert_eq!(duplicate_module_identity("")?, "");
        Ok(())
    }
}
