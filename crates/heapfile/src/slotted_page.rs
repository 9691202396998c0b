//! The slotted-page module: intra-page layout for variable-length records
//! under a stable record id.
//!
//! Layout: `[page header][slot directory, growing forward][free
//! space][record bytes, growing backward from the end of the page]`.

use common::{HeapError, HeapResult, PageNo};
use storage::{PAGE_SIZE, Page};

const NEXT_PAGE_OFFSET: usize = 0;
const SLOT_COUNT_OFFSET: usize = 4;
const FREE_SPACE_OFFSET_OFFSET: usize = 8;
const HEADER_SIZE: usize = 12;
const SLOT_SIZE: usize = 8;

/// Upper bound on a single record's length so it always fits on an empty
/// page alongside its own slot entry. Callers reject anything larger with
/// `InvalidRecLen` before any I/O happens.
pub const PAGE_OVERHEAD: usize = HEADER_SIZE + SLOT_SIZE;

struct PageHeader {
    next_page: PageNo,
    slot_count: u32,
    free_space_offset: u32,
}

fn read_header(page: &Page) -> PageHeader {
    let bytes = page
        .read_bytes(0, HEADER_SIZE)
        .expect("a page is always at least HEADER_SIZE bytes");
    PageHeader {
        next_page: PageNo::new(i32::from_le_bytes(bytes[0..4].try_into().unwrap())),
        slot_count: u32::from_le_bytes(bytes[4..8].try_into().unwrap()),
        free_space_offset: u32::from_le_bytes(bytes[8..12].try_into().unwrap()),
    }
}

fn write_header(page: &mut Page, header: &PageHeader) {
    let mut bytes = [0u8; HEADER_SIZE];
    bytes[NEXT_PAGE_OFFSET..NEXT_PAGE_OFFSET + 4].copy_from_slice(&header.next_page.raw().to_le_bytes());
    bytes[SLOT_COUNT_OFFSET..SLOT_COUNT_OFFSET + 4].copy_from_slice(&header.slot_count.to_le_bytes());
    bytes[FREE_SPACE_OFFSET_OFFSET..FREE_SPACE_OFFSET_OFFSET + 4]
        .copy_from_slice(&header.free_space_offset.to_le_bytes());
    page.write_bytes(0, &bytes);
}

#[derive(Clone, Copy)]
struct Slot {
    offset: u32,
    len: u32,
}

fn slot_offset(slot_no: u32) -> usize {
    HEADER_SIZE + slot_no as usize * SLOT_SIZE
}

fn read_slot(page: &Page, slot_no: u32) -> Option<Slot> {
    let bytes = page.read_bytes(slot_offset(slot_no), SLOT_SIZE)?;
    Some(Slot {
        offset: u32::from_le_bytes(bytes[0..4].try_into().unwrap()),
        len: u32::from_le_bytes(bytes[4..8].try_into().unwrap()),
    })
}

fn write_slot(page: &mut Page, slot_no: u32, slot: Slot) {
    let mut bytes = [0u8; SLOT_SIZE];
    bytes[0..4].copy_from_slice(&slot.offset.to_le_bytes());
    bytes[4..8].copy_from_slice(&slot.len.to_le_bytes());
    page.write_bytes(slot_offset(slot_no), &bytes);
}

fn is_live(page: &Page, slot_no: u32) -> bool {
    read_slot(page, slot_no).is_some_and(|s| s.len > 0)
}

/// Initializes an empty page. `_page_no` is accepted for interface
/// symmetry with the rest of this module; this layout stores no
/// self-identifying page number.
pub fn init(page: &mut Page, _page_no: PageNo) {
    write_header(
        page,
        &PageHeader {
            next_page: PageNo::NONE,
            slot_count: 0,
            free_space_offset: PAGE_SIZE as u32,
        },
    );
}

pub fn set_next_page(page: &mut Page, next_page: PageNo) {
    let mut header = read_header(page);
    header.next_page = next_page;
    write_header(page, &header);
}

pub fn get_next_page(page: &Page) -> PageNo {
    read_header(page).next_page
}

/// Inserts `record` into the page if there's room. Returns the new slot
/// number, or `None` if the page is too full. A full page is not an
/// error: the caller retries on a new page, an expected, handled outcome
/// of `InsertFileScan::insert_record`.
pub fn insert_record(page: &mut Page, record: &[u8]) -> Option<u32> {
    let mut header = read_header(page);
    let slot_area_end = HEADER_SIZE + header.slot_count as usize * SLOT_SIZE;
    let free_space_start = header.free_space_offset as usize;
    let available = free_space_start.saturating_sub(slot_area_end);
    if available < record.len() + SLOT_SIZE {
        return None;
    }

    let record_offset = free_space_start - record.len();
    page.write_bytes(record_offset, record);

    let slot_no = header.slot_count;
    write_slot(
        page,
        slot_no,
        Slot {
            offset: record_offset as u32,
            len: record.len() as u32,
        },
    );
    header.slot_count += 1;
    header.free_space_offset = record_offset as u32;
    write_header(page, &header);
    Some(slot_no)
}

/// Validates `slot_no` and returns the `(offset, len)` span of its record
/// bytes within the page. `InvalidSlot` if the slot is out of range or has
/// been deleted (tombstoned).
pub fn record_span(page: &Page, slot_no: u32) -> HeapResult<(usize, usize)> {
    let header = read_header(page);
    if slot_no >= header.slot_count {
        return Err(HeapError::InvalidSlot);
    }
    let slot = read_slot(page, slot_no).ok_or(HeapError::InvalidSlot)?;
    if slot.len == 0 {
        return Err(HeapError::InvalidSlot);
    }
    Ok((slot.offset as usize, slot.len as usize))
}

/// Deletes (tombstones) the record in `slot_no`. The slot directory entry
/// stays put so other RIDs on the page remain valid. Only `len` is zeroed.
pub fn delete_record(page: &mut Page, slot_no: u32) -> HeapResult<()> {
    let header = read_header(page);
    if slot_no >= header.slot_count {
        return Err(HeapError::InvalidSlot);
    }
    let mut slot = read_slot(page, slot_no).ok_or(HeapError::InvalidSlot)?;
    if slot.len == 0 {
        return Err(HeapError::InvalidSlot);
    }
    slot.len = 0;
    write_slot(page, slot_no, slot);
    Ok(())
}

/// The first live slot on the page, in slot-number order.
pub fn first_record(page: &Page) -> Option<u32> {
    let header = read_header(page);
    (0..header.slot_count).find(|&slot_no| is_live(page, slot_no))
}

/// The next live slot after `slot_no`, or `None` if `slot_no` was the last.
pub fn next_record(page: &Page, slot_no: u32) -> Option<u32> {
    let header = read_header(page);
    (slot_no + 1..header.slot_count).find(|&s| is_live(page, s))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_then_get_round_trips() {
        let mut page = Page::new();
        init(&mut page, PageNo::new(0));

        let slot_no = insert_record(&mut page, b"hello").unwrap();
        let (offset, len) = record_span(&page, slot_no).unwrap();
        assert_eq!(page.read_bytes(offset, len).unwrap(), b"hello");
    }

    #[test]
    fn delete_tombstones_without_shifting_other_slots() {
        let mut page = Page::new();
        init(&mut page, PageNo::new(0));

        let a = insert_record(&mut page, b"aaaa").unwrap();
        let b = insert_record(&mut page, b"bbbb").unwrap();
        delete_record(&mut page, a).unwrap();

        assert!(matches!(record_span(&page, a), Err(HeapError::InvalidSlot)));
        let (offset, len) = record_span(&page, b).unwrap();
        assert_eq!(page.read_bytes(offset, len).unwrap(), b"bbbb");
    }

    #[test]
    fn first_and_next_record_skip_tombstones() {
        let mut page = Page::new();
        init(&mut page, PageNo::new(0));

        let a = insert_record(&mut page, b"1").unwrap();
        let b = insert_record(&mut page, b"2").unwrap();
        let c = insert_record(&mut page, b"3").unwrap();
        delete_record(&mut page, b).unwrap();

        assert_eq!(first_record(&page), Some(a));
        assert_eq!(next_record(&page, a), Some(c));
        assert_eq!(next_record(&page, c), None);
    }

    #[test]
    fn insert_fails_once_the_page_is_full() {
        let mut page = Page::new();
        init(&mut page, PageNo::new(0));

        let record = vec![0u8; 100];
        let mut inserted = 0;
        while insert_record(&mut page, &record).is_some() {
            inserted += 1;
        }
        assert!(inserted > 0);
        assert!(insert_record(&mut page, &record).is_none());
    }

    #[test]
    fn next_page_link_round_trips() {
        let mut page = Page::new();
        init(&mut page, PageNo::new(0));
        assert!(get_next_page(&page).is_none());

        set_next_page(&mut page, PageNo::new(3));
        assert_eq!(get_next_page(&page), PageNo::new(3));
    }

    #[test]
    fn record_span_rejects_out_of_range_slot() {
        let mut page = Page::new();
        init(&mut page, PageNo::new(0));
        assert!(matches!(record_span(&page, 0), Err(HeapError::InvalidSlot)));
    }
}
