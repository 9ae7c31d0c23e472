use std::sync::{
    Mutex,
    MutexGuard,
    PoisonError,
};

/// Locks a mutex, recovering the guard if a previous holder panicked.
///
/// All state guarded this way is left consistent before any code that can panic runs.
pub(crate) fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Sequential little-endian field reader over a copied-in parameter structure.
///
/// Reads past the end yield zero instead of panicking.
pub struct FieldReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> FieldReader<'a> {
    pub(crate) fn new(bytes: &'a [u8]) -> Self {
        FieldReader { bytes, pos: 0 }
    }

    fn take<const N: usize>(&mut self) -> [u8; N] {
        let mut chunk = [0; N];
        if let Some(src) = self.bytes.get(self.pos..self.pos + N) {
            chunk.copy_from_slice(src);
        }
        self.pos += N;
        chunk
    }

    pub(crate) fn u32(&mut self) -> u32 {
        u32::from_le_bytes(self.take())
    }

    pub(crate) fn i32(&mut self) -> i32 {
        i32::from_le_bytes(self.take())
    }

    /// Pointer-sized fields always occupy 8 bytes.
    pub(crate) fn usize(&mut self) -> usize {
        u64::from_le_bytes(self.take()) as usize
    }

    pub(crate) fn isize(&mut self) -> isize {
        i64::from_le_bytes(self.take()) as isize
    }

    pub(crate) fn bool(&mut self) -> bool {
        self.u32() != 0
    }
}

/// Counterpart of [`FieldReader`].
pub struct FieldWriter {
    bytes: Vec<u8>,
}

impl FieldWriter {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        FieldWriter {
            bytes: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn u32(&mut self, value: u32) -> &mut Self {
        self.bytes.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub(crate) fn i32(&mut self, value: i32) -> &mut Self {
        self.bytes.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub(crate) fn usize(&mut self, value: usize) -> &mut Self {
        self.bytes.extend_from_slice(&(value as u64).to_le_bytes());
        self
    }

    pub(crate) fn isize(&mut self, value: isize) -> &mut Self {
        self.bytes.extend_from_slice(&(value as i64).to_le_bytes());
        self
    }

    pub(crate) fn bool(&mut self, value: bool) -> &mut Self {
        self.u32(u32::from(value))
    }

    pub(crate) fn finish(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.bytes)
    }
}
