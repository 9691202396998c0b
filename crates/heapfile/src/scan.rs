//! The scan cursor: sequential, optionally-filtered iteration over a heap
//! file's records, with mark/reset support.
//!
//! Composition, not inheritance: `HeapFileScan` owns a `HeapFileHandle`
//! and delegates `get_record`/`get_rec_cnt` to it rather than extending
//! it.

use common::{HeapError, HeapResult, PageNo, Rid};
use storage::{BufferPoolManager, PagedFile};

use crate::heap_file::HeapFileHandle;
use crate::record::RecordView;
use crate::slotted_page;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttrType {
    Int,
    Float,
    String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompOp {
    Lt,
    Lte,
    Eq,
    Gte,
    Gt,
    Ne,
}

struct Filter {
    offset: usize,
    length: usize,
    attr_type: AttrType,
    op: CompOp,
    value: Vec<u8>,
}

pub struct HeapFileScan {
    handle: HeapFileHandle,
    filter: Option<Filter>,
    marked_page_no: PageNo,
    marked_rid: Rid,
}

impl HeapFileScan {
    pub fn open(pool: BufferPoolManager, file: PagedFile) -> HeapResult<Self> {
        Ok(Self {
            handle: HeapFileHandle::open(pool, file)?,
            filter: None,
            marked_page_no: PageNo::NONE,
            marked_rid: Rid::NULL,
        })
    }

    pub fn get_rec_cnt(&self) -> u32 {
        self.handle.get_rec_cnt()
    }

    pub fn get_record(&mut self, rid: Rid) -> HeapResult<RecordView<'_>> {
        self.handle.get_record(rid)
    }

    /// Sets (or clears) the scan predicate. `value == None` means an
    /// unconditional scan. Validation happens before any I/O and never
    /// changes cursor state on failure.
    pub fn start_scan(
        &mut self,
        offset: i32,
        length: i32,
        attr_type: AttrType,
        value: Option<&[u8]>,
        op: CompOp,
    ) -> HeapResult<()> {
        let Some(value) = value else {
            self.filter = None;
            return Ok(());
        };

        if offset < 0 || length < 1 {
            return Err(HeapError::BadScanParam);
        }
        match attr_type {
            AttrType::Int | AttrType::Float if length != 4 => return Err(HeapError::BadScanParam),
            _ => {}
        }
        if value.len() != length as usize {
            return Err(HeapError::BadScanParam);
        }

        self.filter = Some(Filter {
            offset: offset as usize,
            length: length as usize,
            attr_type,
            op,
            value: value.to_vec(),
        });
        Ok(())
    }

    /// Advances the cursor to the next record satisfying the predicate,
    /// returning its RID, or `None` at end of file.
    pub fn scan_next(&mut self) -> HeapResult<Option<Rid>> {
        loop {
            if self.handle.current().is_none() {
                let resume_page = if self.handle.current_rid().is_null() {
                    self.handle.first_page()
                } else {
                    self.handle.current_rid().page_no
                };
                match resume_page.to_option() {
                    Some(page_no) => self.handle.goto_page(page_no)?,
                    None => return Ok(None),
                }
            }

            let page_no = self
                .handle
                .current()
                .expect("just ensured a page is pinned")
                .page_no();

            let next_slot = {
                let current = self.handle.current().expect("page is pinned");
                let page = current.page();
                let current_rid = self.handle.current_rid();
                if current_rid.is_null() || current_rid.page_no != page_no {
                    slotted_page::first_record(&page)
                } else {
                    slotted_page::next_record(&page, current_rid.slot_no)
                }
            };

            if let Some(slot_no) = next_slot {
                let rid = Rid::new(page_no, slot_no);
                let matches = {
                    let current = self.handle.current().expect("page is pinned");
                    let page = current.page();
                    let (offset, len) = slotted_page::record_span(&page, slot_no)?;
                    let bytes = page
                        .read_bytes(offset, len)
                        .expect("record_span validated the span");
                    self.match_record(bytes)
                };
                self.handle.set_current_rid(rid);
                if matches {
                    return Ok(Some(rid));
                }
                continue;
            }

            let next_page = {
                let current = self.handle.current().expect("page is pinned");
                slotted_page::get_next_page(&current.page())
            };
            match next_page.to_option() {
                Some(next_page_no) => self.handle.goto_page(next_page_no)?,
                None => {
                    self.handle.set_current(None);
                    return Ok(None);
                }
            }
        }
    }

    /// True if the record's bytes satisfy the current predicate. Always
    /// true with no predicate set.
    fn match_record(&self, record: &[u8]) -> bool {
        let Some(filter) = &self.filter else {
            return true;
        };
        let Some(end) = filter.offset.checked_add(filter.length) else {
            return false;
        };
        if end > record.len() {
            return false;
        }
        let window = &record[filter.offset..end];

        let ordering = match filter.attr_type {
            AttrType::Int => {
                let a = i32::from_le_bytes(window.try_into().expect("length checked as 4"));
                let b = i32::from_le_bytes(
                    filter.value.as_slice().try_into().expect("length checked as 4"),
                );
                a.cmp(&b)
            }
            AttrType::Float => {
                let a = f32::from_le_bytes(window.try_into().expect("length checked as 4"));
                let b = f32::from_le_bytes(
                    filter.value.as_slice().try_into().expect("length checked as 4"),
                );
                a.partial_cmp(&b).unwrap_or(std::cmp::Ordering::Equal)
            }
            AttrType::String => window.cmp(filter.value.as_slice()),
        };

        match filter.op {
            CompOp::Lt => ordering.is_lt(),
            CompOp::Lte => ordering.is_le(),
            CompOp::Eq => ordering.is_eq(),
            CompOp::Gte => ordering.is_ge(),
            CompOp::Gt => ordering.is_gt(),
            CompOp::Ne => ordering.is_ne(),
        }
    }

    pub fn mark_scan(&mut self) {
        self.marked_page_no = self
            .handle
            .current()
            .map(|p| p.page_no())
            .unwrap_or(PageNo::NONE);
        self.marked_rid = self.handle.current_rid();
    }

    pub fn reset_scan(&mut self) -> HeapResult<()> {
        let pinned_page_no = self.handle.current().map(|p| p.page_no());
        if pinned_page_no != self.marked_page_no.to_option() {
            match self.marked_page_no.to_option() {
                Some(page_no) => self.handle.goto_page(page_no)?,
                None => self.handle.set_current(None),
            }
        }
        self.handle.set_current_rid(self.marked_rid);
        Ok(())
    }

    /// Unpins the current page, if any, and clears cursor state. The
    /// header page stays pinned; it belongs to the underlying handle.
    pub fn end_scan(&mut self) {
        self.handle.set_current(None);
        self.handle.set_current_rid(Rid::NULL);
    }

    /// Deletes the record at `current_rid`.
    pub fn delete_record(&mut self) -> HeapResult<()> {
        let rid = self.handle.current_rid();
        if rid.is_null() {
            return Err(HeapError::InvalidSlot);
        }
        {
            let current = self.handle.current().ok_or(HeapError::NoSuchPage)?;
            slotted_page::delete_record(&mut current.page_mut(), rid.slot_no)?;
            current.mark_dirty();
        }
        self.handle.decrement_record_count();
        Ok(())
    }

    /// Returns the record at `current_rid` without any I/O.
    pub fn get_record_here(&self) -> HeapResult<RecordView<'_>> {
        let rid = self.handle.current_rid();
        if rid.is_null() {
            return Err(HeapError::InvalidSlot);
        }
        let current = self.handle.current().ok_or(HeapError::NoSuchPage)?;
        let (offset, len) = slotted_page::record_span(&current.page(), rid.slot_no)?;
        Ok(RecordView::new(current.page(), offset, len))
    }

    /// Marks the currently pinned page dirty. Used by callers that mutate
    /// record bytes in place through `get_record_here`.
    pub fn mark_dirty(&self) {
        if let Some(current) = self.handle.current() {
            current.mark_dirty();
        }
    }
}
