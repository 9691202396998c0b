//! The heap file handle: owns the open file, the permanently pinned header
//! page, and at most one pinned "current" data page.
//!
//! Pin/unpin bookkeeping is handled by `storage::PinnedPage`'s `Drop`-based
//! discipline: there are no `current_dirty`/`header_dirty` fields here,
//! because each pin carries its own dirty bit.

use common::{HeapError, HeapResult, PageNo, Rid};
use storage::{BufferPoolManager, FileManager, PagedFile, PinnedPage};

use crate::header_page;
use crate::record::RecordView;
use crate::slotted_page;

pub struct HeapFileHandle {
    current: Option<PinnedPage>,
    header: PinnedPage,
    header_page_no: PageNo,
    file: PagedFile,
    pool: BufferPoolManager,
    current_rid: Rid,
}

impl HeapFileHandle {
    /// Opens a handle on an existing heap file: pins the header page, then
    /// pins `header.first_page` as the current page if the chain is
    /// non-empty.
    pub fn open(pool: BufferPoolManager, file: PagedFile) -> HeapResult<Self> {
        let header_page_no = file
            .first_page()?
            .ok_or_else(|| HeapError::Corrupt("heap file has no header page".to_string()))?;
        let header = pool.read_page(&file, header_page_no)?;
        let first_data_page = header_page::first_page(&header.page());

        let current = match first_data_page.to_option() {
            Some(page_no) => Some(pool.read_page(&file, page_no)?),
            None => None,
        };

        Ok(Self {
            current,
            header,
            header_page_no,
            file,
            pool,
            current_rid: Rid::NULL,
        })
    }

    pub fn header_page_no(&self) -> PageNo {
        self.header_page_no
    }

    pub fn get_rec_cnt(&self) -> u32 {
        header_page::record_count(&self.header.page())
    }

    pub fn first_page(&self) -> PageNo {
        header_page::first_page(&self.header.page())
    }

    pub fn last_page(&self) -> PageNo {
        header_page::last_page(&self.header.page())
    }

    pub fn page_count(&self) -> u32 {
        header_page::page_count(&self.header.page())
    }

    /// Returns a view of the record identified by `rid`. On return, the
    /// page containing `rid` is the pinned current page and `current_rid`
    /// is updated.
    pub fn get_record(&mut self, rid: Rid) -> HeapResult<RecordView<'_>> {
        self.goto_page(rid.page_no)?;
        let current = self
            .current
            .as_ref()
            .expect("goto_page always leaves a current page on success");
        let (offset, len) = slotted_page::record_span(&current.page(), rid.slot_no)?;
        self.current_rid = rid;
        Ok(RecordView::new(current.page(), offset, len))
    }

    /// Ensures `page_no` is pinned as the current page. If a different page
    /// was pinned, it is dropped (unpinning with whatever dirty bit it
    /// accumulated) and replaced.
    pub(crate) fn goto_page(&mut self, page_no: PageNo) -> HeapResult<()> {
        if let Some(current) = &self.current {
            if current.page_no() == page_no {
                return Ok(());
            }
        }
        self.current = Some(self.pool.read_page(&self.file, page_no)?);
        Ok(())
    }

    pub(crate) fn pool(&self) -> &BufferPoolManager {
        &self.pool
    }

    pub(crate) fn file(&self) -> &PagedFile {
        &self.file
    }

    pub(crate) fn current(&self) -> Option<&PinnedPage> {
        self.current.as_ref()
    }

    pub(crate) fn take_current(&mut self) -> Option<PinnedPage> {
        self.current.take()
    }

    pub(crate) fn set_current(&mut self, pinned: Option<PinnedPage>) {
        self.current = pinned;
    }

    pub(crate) fn current_rid(&self) -> Rid {
        self.current_rid
    }

    pub(crate) fn set_current_rid(&mut self, rid: Rid) {
        self.current_rid = rid;
    }

    pub(crate) fn set_last_page(&mut self, page_no: PageNo) {
        header_page::set_last_page(&mut self.header.page_mut(), page_no);
        self.header.mark_dirty();
    }

    pub(crate) fn set_first_page(&mut self, page_no: PageNo) {
        header_page::set_first_page(&mut self.header.page_mut(), page_no);
        self.header.mark_dirty();
    }

    pub(crate) fn increment_page_count(&mut self) {
        let count = header_page::page_count(&self.header.page());
        header_page::set_page_count(&mut self.header.page_mut(), count + 1);
        self.header.mark_dirty();
    }

    pub(crate) fn increment_record_count(&mut self) {
        let count = header_page::record_count(&self.header.page());
        header_page::set_record_count(&mut self.header.page_mut(), count + 1);
        self.header.mark_dirty();
    }

    pub(crate) fn decrement_record_count(&mut self) {
        let count = header_page::record_count(&self.header.page());
        header_page::set_record_count(&mut self.header.page_mut(), count.saturating_sub(1));
        self.header.mark_dirty();
    }
}

impl Drop for HeapFileHandle {
    /// `current` and `header` unpin via their own `Drop` impls in
    /// declaration order immediately after this body returns: current page
    /// first, then header, then the file is closed.
    /// Closing is infallible in this implementation (there is no OS handle
    /// to release), but errors are logged rather than propagated.
    fn drop(&mut self) {
        if let Err(err) = FileManager::close_file(self.file.clone()) {
            log::error!("error closing heap file {:?}: {err}", self.file.path());
        }
    }
}
