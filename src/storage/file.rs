//! # File-Backed Store
//!
//! `FileStore` is the concrete [`BackingStore`] for file buckets: a
//! `std::fs::File`, the cursor position it was last left at, and the scope its
//! buffered reads are charged to.
//!
//! ## Cursor Tracking
//!
//! The cursor is tracked here rather than queried from the OS, so a bucket
//! whose range starts where the previous read ended skips the `lseek()`
//! entirely. Sequentially consumed brigades therefore seek once per store.
//!
//! ## Reads
//!
//! `read` loops until the buffer is full or the file returns zero bytes, so a
//! short result always means end-of-file. Regular files never report
//! would-block; the read mode is accepted and ignored.
//!
//! ## Mapping
//!
//! `map` refuses ranges that extend past the current file length instead of
//! letting an access fault later; the bucket then falls back to a buffered
//! read, which reports the truncation as end-of-stream.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use eyre::{Result, WrapErr};

use super::{BackingStore, MappedRegion};
use crate::error::ReadMode;
use crate::memory::Scope;

#[derive(Debug)]
pub struct FileStore {
    file: File,
    path: Option<PathBuf>,
    position: u64,
    scope: Scope,
}

impl FileStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_in(path, Scope::default())
    }

    /// Opens `path` read-only with buffered reads charged to `scope`.
    pub fn open_in<P: AsRef<Path>>(path: P, scope: Scope) -> Result<Self> {
        let path = path.as_ref();

        let file = File::open(path)
            .wrap_err_with(|| format!("failed to open '{}'", path.display()))?;

        Ok(Self {
            file,
            path: Some(path.to_path_buf()),
            position: 0,
            scope,
        })
    }

    /// Wraps an already open file, taking its current position as the cursor.
    pub fn from_file(mut file: File, scope: Scope) -> Result<Self> {
        let position = file
            .stream_position()
            .wrap_err("failed to query file position")?;

        Ok(Self {
            file,
            path: None,
            position,
            scope,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn len(&self) -> Result<u64> {
        let metadata = self.file.metadata().wrap_err_with(|| match &self.path {
            Some(path) => format!("failed to get metadata for '{}'", path.display()),
            None => "failed to get file metadata".to_string(),
        })?;

        Ok(metadata.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

impl BackingStore for FileStore {
    fn position(&self) -> u64 {
        self.position
    }

    fn seek(&mut self, offset: u64) -> io::Result<()> {
        self.position = self.file.seek(SeekFrom::Start(offset))?;
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8], _mode: ReadMode) -> io::Result<usize> {
        let mut filled = 0;

        while filled < buf.len() {
            match self.file.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => {
                    filled += n;
                    self.position += n as u64;
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }

        Ok(filled)
    }

    fn scope(&self) -> Scope {
        self.scope.clone()
    }

    fn supports_mapping(&self) -> bool {
        true
    }

    fn map(&self, offset: u64, len: usize) -> io::Result<MappedRegion> {
        let file_len = self.file.metadata()?.len();
        let end = offset
            .checked_add(len as u64)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "range overflows u64"))?;

        if end > file_len {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("range ends at {} but file is {} bytes", end, file_len),
            ));
        }

        MappedRegion::map(&self.file, offset, len)
    }
}
