//! Generation-tagged handle table.
//!
//! Every hook record lives in a slot of this table. A [`HookHandle`] carries the slot index
//! together with the slot's generation at creation time, so a handle to a freed record
//! never resolves to whatever record later reuses the slot.

use std::fmt;

use crate::error::{
    HookError,
    Result,
};

/// Opaque handle to an installed hook.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct HookHandle {
    index: u16,
    generation: u16,
}

impl HookHandle {
    /// Encodes the handle as a non-zero user handle value: generation in the high word, index in the low word.
    pub fn to_raw(self) -> usize {
        (usize::from(self.generation) << 16) | usize::from(self.index)
    }

    /// Decodes a user handle value. The null handle is rejected.
    pub fn from_raw(raw: usize) -> Result<Self> {
        let generation = u16::try_from(raw >> 16).map_err(|_| HookError::InvalidHandle)?;
        if generation == 0 {
            return Err(HookError::InvalidHandle);
        }
        Ok(HookHandle {
            index: (raw & 0xFFFF) as u16,
            generation,
        })
    }
}

impl fmt::Debug for HookHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HookHandle({:#x})", self.to_raw())
    }
}

#[derive(Debug)]
struct Slot<T> {
    generation: u16,
    value: Option<T>,
}

/// Arena of objects addressed by [`HookHandle`]s.
#[derive(Debug)]
pub(crate) struct HandleTable<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u16>,
}

impl<T> HandleTable<T> {
    pub(crate) const MAX_SLOTS: usize = u16::MAX as usize + 1;

    pub(crate) fn new() -> Self {
        HandleTable {
            slots: Vec::new(),
            free: Vec::new(),
        }
    }

    /// Stores `value` and returns its handle, or [`HookError::OutOfMemory`] when all slots are taken.
    pub(crate) fn create(&mut self, value: T) -> Result<HookHandle> {
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                if self.slots.len() >= Self::MAX_SLOTS {
                    return Err(HookError::OutOfMemory);
                }
                self.slots.push(Slot {
                    generation: 1,
                    value: None,
                });
                (self.slots.len() - 1) as u16
            }
        };
        let slot = &mut self.slots[usize::from(index)];
        slot.value = Some(value);
        Ok(HookHandle {
            index,
            generation: slot.generation,
        })
    }

    fn slot(&self, handle: HookHandle) -> Option<&Slot<T>> {
        self.slots
            .get(usize::from(handle.index))
            .filter(|slot| slot.generation == handle.generation)
    }

    pub(crate) fn get(&self, handle: HookHandle) -> Option<&T> {
        self.slot(handle).and_then(|slot| slot.value.as_ref())
    }

    pub(crate) fn get_mut(&mut self, handle: HookHandle) -> Option<&mut T> {
        self.slots
            .get_mut(usize::from(handle.index))
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.value.as_mut())
    }

    /// Deletes the object, invalidating every outstanding handle to it.
    pub(crate) fn remove(&mut self, handle: HookHandle) -> Option<T> {
        let slot = self
            .slots
            .get_mut(usize::from(handle.index))
            .filter(|slot| slot.generation == handle.generation)?;
        let value = slot.value.take()?;
        slot.generation = match slot.generation.wrapping_add(1) {
            0 => 1,
            next => next,
        };
        self.free.push(handle.index);
        Some(value)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (HookHandle, &T)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.value.as_ref().map(|value| {
                (
                    HookHandle {
                        index: index as u16,
                        generation: slot.generation,
                    },
                    value,
                )
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_get_remove() -> anyhow::Result<()> {
        let mut table = HandleTable::new();
        let a = table.create("a")?;
        let b = table.create("b")?;
        assert_eq!(table.get(a), Some(&"a"));
        assert_eq!(table.get(b), Some(&"b"));
        assert_eq!(table.iter().count(), 2);
        assert_eq!(table.remove(a), Some("a"));
        assert_eq!(table.get(a), None);
        assert_eq!(table.remove(a), None);
        assert_eq!(table.iter().count(), 1);
        Ok(())
    }

    #[test]
    fn reused_slot_gets_new_generation() -> anyhow::Result<()> {
        let mut table = HandleTable::new();
        let old = table.create(1)?;
        table.remove(old);
        let new = table.create(2)?;
        assert_ne!(old, new);
        assert_eq!(old.to_raw() & 0xFFFF, new.to_raw() & 0xFFFF);
        assert_eq!(table.get(old), None);
        assert_eq!(table.get(new), Some(&2));
        Ok(())
    }

    #[test]
    fn raw_round_trip_and_null() -> anyhow::Result<()> {
        let mut table = HandleTable::new();
        let handle = table.create(())?;
        assert_ne!(handle.to_raw(), 0);
        assert_eq!(HookHandle::from_raw(handle.to_raw())?, handle);
        assert_eq!(HookHandle::from_raw(0), Err(HookError::InvalidHandle));
        assert_eq!(HookHandle::from_raw(0x1234), Err(HookError::InvalidHandle));
        Ok(())
    }

    #[test]
    fn iter_skips_freed() -> anyhow::Result<()> {
        let mut table = HandleTable::new();
        let a = table.create('a')?;
        let b = table.create('b')?;
        table.remove(a);
        let live: Vec<_> = table.iter().collect();
        assert_eq!(live, vec![(b, &'b')]);
        Ok(())
    }
}
