//! The insert cursor: appends records to a heap file, extending the page
//! chain on overflow.

use common::{HeapError, HeapResult, Rid};
use storage::{BufferPoolManager, PAGE_SIZE, PagedFile};

use crate::heap_file::HeapFileHandle;
use crate::record::RecordView;
use crate::slotted_page;

pub struct InsertFileScan {
    handle: HeapFileHandle,
}

impl InsertFileScan {
    /// Opens an insert cursor, positioning its current page at the append
    /// point (`header.last_page`) rather than the base handle's
    /// `first_page`.
    pub fn open(pool: BufferPoolManager, file: PagedFile) -> HeapResult<Self> {
        let mut handle = HeapFileHandle::open(pool, file)?;
        let last_page = handle.last_page();
        handle.goto_page(last_page)?;
        Ok(Self { handle })
    }

    pub fn get_rec_cnt(&self) -> u32 {
        self.handle.get_rec_cnt()
    }

    pub fn get_record(&mut self, rid: Rid) -> HeapResult<RecordView<'_>> {
        self.handle.get_record(rid)
    }

    /// Appends `record`, returning its new RID. Extends the page chain
    /// with a freshly allocated, initialized page if the current last page
    /// has no room; a record this large is guaranteed to fit an empty page
    /// by the length check below.
    pub fn insert_record(&mut self, record: &[u8]) -> HeapResult<Rid> {
        if record.len() > PAGE_SIZE - slotted_page::PAGE_OVERHEAD {
            return Err(HeapError::InvalidRecLen);
        }

        let last_page_no = self.handle.last_page();
        self.handle.goto_page(last_page_no)?;

        let first_attempt = {
            let current = self
                .handle
                .current()
                .expect("goto_page pinned header.last_page");
            slotted_page::insert_record(&mut current.page_mut(), record)
        };

        let slot_no = match first_attempt {
            Some(slot_no) => slot_no,
            None => {
                self.extend_chain()?;
                let current = self
                    .handle
                    .current()
                    .expect("extend_chain pinned the new last page");
                slotted_page::insert_record(&mut current.page_mut(), record)
                    .expect("a record within PAGE_OVERHEAD of PAGE_SIZE always fits an empty page")
            }
        };

        let rid = {
            let current = self.handle.current().expect("current page is pinned");
            current.mark_dirty();
            Rid::new(current.page_no(), slot_no)
        };
        self.handle.increment_record_count();
        Ok(rid)
    }

    /// Allocates a new last page, links the old last page to it, and makes
    /// it the current page.
    fn extend_chain(&mut self) -> HeapResult<()> {
        let new_page = self.handle.pool().alloc_page(self.handle.file())?;
        let new_page_no = new_page.page_no();
        slotted_page::init(&mut new_page.page_mut(), new_page_no);
        new_page.mark_dirty();

        if let Some(old_last) = self.handle.current() {
            slotted_page::set_next_page(&mut old_last.page_mut(), new_page_no);
            old_last.mark_dirty();
        }

        self.handle.set_current(Some(new_page));
        self.handle.set_last_page(new_page_no);
        self.handle.increment_page_count();
        Ok(())
    }
}

impl Drop for InsertFileScan {
    /// Unpins the current page with the dirty bit set: insertions always
    /// dirty it. Marking dirty here, rather than relying solely on
    /// `insert_record`'s own `mark_dirty`, covers an insert cursor that is
    /// opened and dropped without ever inserting.
    fn drop(&mut self) {
        if let Some(current) = self.handle.current() {
            current.mark_dirty();
        }
    }
}
