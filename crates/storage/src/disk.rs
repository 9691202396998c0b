//! File manager: creation, destruction, and opening of named paged files.
//!
//! Exposes `create_file`/`destroy_file`/`open_file`/`close_file`, plus
//! `first_page()` on an open file. It does not perform page I/O itself;
//! that is `BufferPoolManager`'s job (`alloc_page`/`read_page`), which reads
//! and writes through the path each `PagedFile` carries.

use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use common::{HeapError, HeapResult, PageNo};

use crate::page::PAGE_SIZE;

/// Identifies an open file for the buffer pool's cache keys. Distinct from
/// the page numbers within the file, and distinct across two `PagedFile`s
/// opened for the same name (so a use-after-close does not alias a later
/// reopen's cached pages).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(u64);

static NEXT_FILE_ID: AtomicU64 = AtomicU64::new(1);

fn next_file_id() -> FileId {
    FileId(NEXT_FILE_ID.fetch_add(1, Ordering::Relaxed))
}

/// Stateless factory for creating, destroying, and opening named files.
pub struct FileManager;

impl FileManager {
    /// Creates a new, empty file. Fails with `HeapError::FileExists` if a
    /// file already exists at `name`.
    pub fn create_file(name: impl AsRef<Path>) -> HeapResult<()> {
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(name.as_ref())
        {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Err(HeapError::FileExists),
            Err(e) => Err(e.into()),
        }
    }

    /// Removes a named file. The caller is responsible for ensuring no
    /// `PagedFile` handle to it is still open.
    pub fn destroy_file(name: impl AsRef<Path>) -> HeapResult<()> {
        match fs::remove_file(name.as_ref()) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(HeapError::FileNotFound),
            Err(e) => Err(e.into()),
        }
    }

    /// Opens an existing file. Fails with `HeapError::FileNotFound` if it
    /// does not exist.
    pub fn open_file(name: impl AsRef<Path>) -> HeapResult<PagedFile> {
        let path = name.as_ref().to_path_buf();
        match fs::metadata(&path) {
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(HeapError::FileNotFound),
            Err(e) => return Err(e.into()),
        }
        Ok(PagedFile {
            file_id: next_file_id(),
            path,
        })
    }

    /// Closes a file handle. Closing never fails in this implementation,
    /// since there is no OS handle held open between page accesses, but
    /// the `Result` return lets callers treat it uniformly with other
    /// fallible cleanup; `HeapFileHandle`'s destructor logs rather than
    /// propagates a failure here.
    pub fn close_file(_file: PagedFile) -> HeapResult<()> {
        Ok(())
    }
}

/// A handle on an open, named paged file.
///
/// Deliberately holds no OS file descriptor: every page access goes through
/// `BufferPoolManager`, which opens by path for each disk read/write. This
/// sidesteps sharing a single `std::fs::File` between the file manager and
/// the buffer pool's eviction path, at the cost of an open() per disk
/// access, an accepted tradeoff for a single-threaded,
/// non-performance-critical engine.
#[derive(Debug, Clone)]
pub struct PagedFile {
    file_id: FileId,
    path: PathBuf,
}

impl PagedFile {
    pub fn file_id(&self) -> FileId {
        self.file_id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn num_pages(&self) -> HeapResult<u64> {
        let len = fs::metadata(&self.path)?.len();
        Ok(len / PAGE_SIZE as u64)
    }

    /// The page number of the first page ever allocated in this file, or
    /// `None` if the file has no data pages yet.
    pub fn first_page(&self) -> HeapResult<Option<PageNo>> {
        Ok(if self.num_pages()? > 0 {
            Some(PageNo::new(0))
        } else {
            None
        })
    }
}
