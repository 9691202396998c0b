//! Buffer pool manager: pins pages of an open file into fixed-size frames,
//! tracks dirty bits and pin counts, and evicts via an `LRUReplacer` when
//! every frame is in use.
//!
//! Concurrency model: single-threaded. A heap file handle needs to hold
//! two pages pinned for its entire lifetime (the header page and the
//! current data page), so state lives behind `Rc<RefCell<..>>` rather than
//! a mutex. A pin is a small owned `PinnedPage` (an `Rc` clone plus a
//! frame id) whose individual byte accesses take a short-lived `Ref`/
//! `RefMut` instead of holding the pool locked for the pin's whole life.

use std::cell::{Ref, RefCell, RefMut};
use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use common::{HeapError, HeapResult, PageNo};

use crate::disk::{FileId, PagedFile};
use crate::page::{PAGE_SIZE, Page};
use crate::replacer::{FrameId, LRUReplacer, Replacer};

#[derive(Clone)]
struct FrameIdentity {
    file_id: FileId,
    page_no: PageNo,
    path: PathBuf,
}

struct Frame {
    page: Page,
    identity: Option<FrameIdentity>,
    is_dirty: bool,
    pin_count: u32,
}

impl Frame {
    fn empty() -> Self {
        Self {
            page: Page::new(),
            identity: None,
            is_dirty: false,
            pin_count: 0,
        }
    }
}

struct BufferPoolInner {
    frames: RefCell<Vec<Frame>>,
    page_table: RefCell<HashMap<(FileId, PageNo), FrameId>>,
    free_list: RefCell<Vec<FrameId>>,
    replacer: RefCell<LRUReplacer>,
}

/// Buffer pool manager for caching pages between disk and memory.
///
/// Cheap to clone (an `Rc` bump): every clone refers to the same pool.
#[derive(Clone)]
pub struct BufferPoolManager(Rc<BufferPoolInner>);

impl BufferPoolManager {
    /// Creates a buffer pool with a fixed number of frames.
    pub fn new(pool_size: usize) -> Self {
        assert!(pool_size > 0, "pool_size must be > 0");
        let frames = (0..pool_size).map(|_| Frame::empty()).collect();
        let free_list = (0..pool_size).rev().collect();
        Self(Rc::new(BufferPoolInner {
            frames: RefCell::new(frames),
            page_table: RefCell::new(HashMap::new()),
            free_list: RefCell::new(free_list),
            replacer: RefCell::new(LRUReplacer::new(pool_size)),
        }))
    }

    fn acquire_frame(&self) -> HeapResult<FrameId> {
        if let Some(frame_id) = self.0.free_list.borrow_mut().pop() {
            return Ok(frame_id);
        }
        let frame_id = self
            .0
            .replacer
            .borrow_mut()
            .victim()
            .ok_or(HeapError::BufferPoolExhausted)?;
        self.evict(frame_id)?;
        Ok(frame_id)
    }

    fn evict(&self, frame_id: FrameId) -> HeapResult<()> {
        let identity = self.0.frames.borrow()[frame_id].identity.clone();
        let Some(identity) = identity else {
            return Ok(());
        };
        if self.0.frames.borrow()[frame_id].is_dirty {
            log::debug!(
                "evicting frame {frame_id} (file {:?}, page {}): flushing dirty page",
                identity.file_id,
                identity.page_no
            );
            let data = *self.0.frames.borrow()[frame_id].page.data();
            write_page_to_disk(&identity.path, identity.page_no, &data)?;
        } else {
            log::trace!(
                "evicting frame {frame_id} (file {:?}, page {}): clean, no flush needed",
                identity.file_id,
                identity.page_no
            );
        }
        self.0
            .page_table
            .borrow_mut()
            .remove(&(identity.file_id, identity.page_no));
        let mut frames = self.0.frames.borrow_mut();
        frames[frame_id].identity = None;
        frames[frame_id].is_dirty = false;
        Ok(())
    }

    /// Allocates a new page at the end of `file` and pins it.
    ///
    /// The zero page is written to disk immediately so the file's length
    /// (and therefore the next page number) is visible right away, even
    /// before this pin is released. Otherwise two allocations against the
    /// same file before either is unpinned would race on the same page
    /// number.
    pub fn alloc_page(&self, file: &PagedFile) -> HeapResult<PinnedPage> {
        let page_no = PageNo::new(file.num_pages()? as i32);
        let frame_id = self.acquire_frame()?;
        log::debug!("allocating page {page_no} of file {:?} into frame {frame_id}", file.file_id());

        let zero = [0u8; PAGE_SIZE];
        write_page_to_disk(file.path(), page_no, &zero)?;

        {
            let mut frames = self.0.frames.borrow_mut();
            frames[frame_id].page.data_mut().fill(0);
            frames[frame_id].identity = Some(FrameIdentity {
                file_id: file.file_id(),
                page_no,
                path: file.path().to_path_buf(),
            });
            frames[frame_id].is_dirty = false;
            frames[frame_id].pin_count = 1;
        }
        self.0
            .page_table
            .borrow_mut()
            .insert((file.file_id(), page_no), frame_id);
        self.0.replacer.borrow_mut().pin(frame_id);

        Ok(PinnedPage {
            pool: self.clone(),
            frame_id,
            file_id: file.file_id(),
            page_no,
        })
    }

    /// Reads and pins `page_no` of `file`, serving from cache if resident.
    pub fn read_page(&self, file: &PagedFile, page_no: PageNo) -> HeapResult<PinnedPage> {
        let key = (file.file_id(), page_no);
        if let Some(&frame_id) = self.0.page_table.borrow().get(&key) {
            log::trace!("cache hit for page {page_no} of file {:?}", file.file_id());
            self.0.frames.borrow_mut()[frame_id].pin_count += 1;
            self.0.replacer.borrow_mut().pin(frame_id);
            return Ok(PinnedPage {
                pool: self.clone(),
                frame_id,
                file_id: file.file_id(),
                page_no,
            });
        }

        if page_no.is_none() || page_no.raw() as u64 >= file.num_pages()? {
            return Err(HeapError::NoSuchPage);
        }

        log::debug!("cache miss for page {page_no} of file {:?}, reading from disk", file.file_id());
        let frame_id = self.acquire_frame()?;
        let mut buf = [0u8; PAGE_SIZE];
        read_page_from_disk(file.path(), page_no, &mut buf)?;
        {
            let mut frames = self.0.frames.borrow_mut();
            frames[frame_id].page.data_mut().copy_from_slice(&buf);
            frames[frame_id].identity = Some(FrameIdentity {
                file_id: file.file_id(),
                page_no,
                path: file.path().to_path_buf(),
            });
            frames[frame_id].is_dirty = false;
            frames[frame_id].pin_count = 1;
        }
        self.0.page_table.borrow_mut().insert(key, frame_id);
        self.0.replacer.borrow_mut().pin(frame_id);

        Ok(PinnedPage {
            pool: self.clone(),
            frame_id,
            file_id: file.file_id(),
            page_no,
        })
    }

    /// Writes a resident dirty page back to disk and clears its dirty bit.
    /// Returns `false` if the page is not currently cached (nothing to do,
    /// disk is already authoritative).
    pub fn flush_page(&self, file: &PagedFile, page_no: PageNo) -> HeapResult<bool> {
        let key = (file.file_id(), page_no);
        let frame_id = match self.0.page_table.borrow().get(&key) {
            Some(&frame_id) => frame_id,
            None => return Ok(false),
        };
        if self.0.frames.borrow()[frame_id].is_dirty {
            let data = *self.0.frames.borrow()[frame_id].page.data();
            write_page_to_disk(file.path(), page_no, &data)?;
            self.0.frames.borrow_mut()[frame_id].is_dirty = false;
        }
        Ok(true)
    }

    /// Flushes every resident dirty page belonging to `file`.
    pub fn flush_file(&self, file: &PagedFile) -> HeapResult<()> {
        let page_nos: Vec<PageNo> = self
            .0
            .page_table
            .borrow()
            .keys()
            .filter(|(fid, _)| *fid == file.file_id())
            .map(|(_, page_no)| *page_no)
            .collect();
        for page_no in page_nos {
            self.flush_page(file, page_no)?;
        }
        Ok(())
    }

    /// Current pin count of a page, or 0 if it is not resident. A testing
    /// probe for pin-discipline invariants.
    pub fn pin_count_of(&self, file: &PagedFile, page_no: PageNo) -> u32 {
        match self.0.page_table.borrow().get(&(file.file_id(), page_no)) {
            Some(&frame_id) => self.0.frames.borrow()[frame_id].pin_count,
            None => 0,
        }
    }

    /// Number of frames currently pinned by at least one `PinnedPage`.
    pub fn pinned_frame_count(&self) -> usize {
        self.0
            .frames
            .borrow()
            .iter()
            .filter(|f| f.pin_count > 0)
            .count()
    }
}

fn read_page_from_disk(path: &Path, page_no: PageNo, buf: &mut [u8; PAGE_SIZE]) -> HeapResult<()> {
    let mut file = OpenOptions::new().read(true).open(path)?;
    file.seek(SeekFrom::Start(page_no.raw() as u64 * PAGE_SIZE as u64))?;
    file.read_exact(buf)?;
    Ok(())
}

fn write_page_to_disk(path: &Path, page_no: PageNo, buf: &[u8; PAGE_SIZE]) -> HeapResult<()> {
    let mut file = OpenOptions::new().write(true).open(path)?;
    file.seek(SeekFrom::Start(page_no.raw() as u64 * PAGE_SIZE as u64))?;
    file.write_all(buf)?;
    Ok(())
}

/// A scoped pin on a page: acquiring one bumps the pin count, `Drop`
/// releases it. The dirty bit accumulates across every `PinnedPage` that
/// shares the frame (via `mark_dirty`), so the bit the frame is eventually
/// flushed with is the logical OR of every mutation made while pinned.
/// There is no separate unpin-with-dirty-flag call to forget.
pub struct PinnedPage {
    pool: BufferPoolManager,
    frame_id: FrameId,
    file_id: FileId,
    page_no: PageNo,
}

impl std::fmt::Debug for PinnedPage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PinnedPage")
            .field("frame_id", &self.frame_id)
            .field("file_id", &self.file_id)
            .field("page_no", &self.page_no)
            .finish()
    }
}

impl PinnedPage {
    pub fn page_no(&self) -> PageNo {
        self.page_no
    }

    pub fn file_id(&self) -> FileId {
        self.file_id
    }

    /// Borrows the page's bytes for reading.
    pub fn page(&self) -> Ref<'_, Page> {
        Ref::map(self.pool.0.frames.borrow(), |frames| {
            &frames[self.frame_id].page
        })
    }

    /// Borrows the page's bytes for writing. Does not itself mark the page
    /// dirty; call `mark_dirty()` once you know a mutation happened.
    pub fn page_mut(&self) -> RefMut<'_, Page> {
        RefMut::map(self.pool.0.frames.borrow_mut(), |frames| {
            &mut frames[self.frame_id].page
        })
    }

    pub fn mark_dirty(&self) {
        self.pool.0.frames.borrow_mut()[self.frame_id].is_dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.pool.0.frames.borrow()[self.frame_id].is_dirty
    }
}

impl Drop for PinnedPage {
    fn drop(&mut self) {
        let now_unpinned = {
            let mut frames = self.pool.0.frames.borrow_mut();
            let frame = &mut frames[self.frame_id];
            frame.pin_count = frame.pin_count.saturating_sub(1);
            frame.pin_count == 0
        };
        if now_unpinned {
            self.pool.0.replacer.borrow_mut().unpin(self.frame_id);
        }
    }
}
