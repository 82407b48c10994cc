//! Shared fixtures for the integration tests.
//!
//! `ScriptedStore` is an in-memory [`BackingStore`] whose failures are driven
//! by a [`Script`] the test keeps a handle to after the store has been moved
//! into a bucket.

#![allow(dead_code)]

use std::cell::Cell;
use std::fs;
use std::io;
use std::rc::Rc;

use brigade::memory::Scope;
use brigade::storage::MappedRegion;
use brigade::{BackingStore, ReadMode};
use tempfile::TempDir;

#[derive(Default)]
pub struct Script {
    pub fail_seek: Cell<bool>,
    pub would_block: Cell<bool>,
    pub seeks: Cell<usize>,
    pub reads: Cell<usize>,
    pub closed: Cell<usize>,
}

pub struct ScriptedStore {
    data: Vec<u8>,
    position: u64,
    scope: Scope,
    script: Rc<Script>,
}

impl ScriptedStore {
    pub fn new(data: Vec<u8>) -> (Self, Rc<Script>) {
        Self::in_scope(data, Scope::default())
    }

    pub fn in_scope(data: Vec<u8>, scope: Scope) -> (Self, Rc<Script>) {
        let script = Rc::new(Script::default());
        let store = Self {
            data,
            position: 0,
            scope,
            script: Rc::clone(&script),
        };
        (store, script)
    }

    /// Moves the cursor without going through `seek`.
    pub fn with_cursor(mut self, position: u64) -> Self {
        self.position = position;
        self
    }
}

impl BackingStore for ScriptedStore {
    fn position(&self) -> u64 {
        self.position
    }

    fn seek(&mut self, offset: u64) -> io::Result<()> {
        self.script.seeks.set(self.script.seeks.get() + 1);
        if self.script.fail_seek.get() {
            return Err(io::Error::new(io::ErrorKind::Other, "scripted seek failure"));
        }
        self.position = offset;
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8], mode: ReadMode) -> io::Result<usize> {
        if mode == ReadMode::NonBlocking && self.script.would_block.get() {
            return Err(io::Error::new(io::ErrorKind::WouldBlock, "scripted stall"));
        }
        self.script.reads.set(self.script.reads.get() + 1);

        let start = (self.position as usize).min(self.data.len());
        let n = buf.len().min(self.data.len() - start);
        buf[..n].copy_from_slice(&self.data[start..start + n]);
        self.position += n as u64;
        Ok(n)
    }

    fn scope(&self) -> Scope {
        self.scope.clone()
    }

    fn map(&self, _offset: u64, _len: usize) -> io::Result<MappedRegion> {
        Err(io::Error::new(io::ErrorKind::Unsupported, "scripted store cannot map"))
    }
}

impl Drop for ScriptedStore {
    fn drop(&mut self) {
        self.script.closed.set(self.script.closed.get() + 1);
    }
}

/// Deterministic, non-repeating-per-chunk test payload.
pub fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

pub fn temp_file(bytes: &[u8]) -> (TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("source.bin");
    fs::write(&path, bytes).unwrap();
    (dir, path)
}
