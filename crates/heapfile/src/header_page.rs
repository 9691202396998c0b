//! The file-header page: an in-place typed view over page 0 of a heap
//! file, holding the file name, the data-page chain's anchors, and the
//! live record count.
//!
//! Uses hand-rolled offset-based serialization rather than a `repr(C)`
//! cast, since the on-disk layout (fixed-size name buffer followed by four
//! fixed-width integers) must stay byte-exact across platforms.

use common::PageNo;
use storage::Page;

/// Longest file name the header page can record, NUL-terminated. Chosen
/// generously for any realistic path component.
pub const MAX_NAME: usize = 256;

const FILE_NAME_OFFSET: usize = 0;
const FIRST_PAGE_OFFSET: usize = MAX_NAME;
const LAST_PAGE_OFFSET: usize = FIRST_PAGE_OFFSET + 4;
const PAGE_COUNT_OFFSET: usize = LAST_PAGE_OFFSET + 4;
const RECORD_COUNT_OFFSET: usize = PAGE_COUNT_OFFSET + 4;

/// Initializes a freshly allocated header page: writes `file_name`
/// NUL-terminated into its fixed-size slot and zeroes the chain anchors
/// and counts. `create_heap_file` sets `first_page`/`last_page` afterward
/// once the first data page has been allocated.
pub fn init(page: &mut Page, file_name: &str) {
    let mut name_bytes = [0u8; MAX_NAME];
    let bytes = file_name.as_bytes();
    let copy_len = bytes.len().min(MAX_NAME - 1);
    name_bytes[..copy_len].copy_from_slice(&bytes[..copy_len]);
    page.write_bytes(FILE_NAME_OFFSET, &name_bytes);

    set_first_page(page, PageNo::NONE);
    set_last_page(page, PageNo::NONE);
    set_page_count(page, 0);
    set_record_count(page, 0);
}

/// The file name stored on the header page, up to its NUL terminator.
/// Bytes that are not valid UTF-8 are replaced with the Unicode
/// replacement character rather than failing. This field is diagnostic,
/// never used to address pages.
pub fn file_name(page: &Page) -> String {
    let bytes = page
        .read_bytes(FILE_NAME_OFFSET, MAX_NAME)
        .expect("a page is always at least MAX_NAME bytes");
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

fn read_page_no(page: &Page, offset: usize) -> PageNo {
    let bytes = page
        .read_bytes(offset, 4)
        .expect("offset validated against page size at compile time");
    PageNo::new(i32::from_le_bytes(bytes.try_into().unwrap()))
}

fn write_page_no(page: &mut Page, offset: usize, value: PageNo) {
    page.write_bytes(offset, &value.raw().to_le_bytes());
}

fn read_u32(page: &Page, offset: usize) -> u32 {
    let bytes = page
        .read_bytes(offset, 4)
        .expect("offset validated against page size at compile time");
    u32::from_le_bytes(bytes.try_into().unwrap())
}

fn write_u32(page: &mut Page, offset: usize, value: u32) {
    page.write_bytes(offset, &value.to_le_bytes());
}

pub fn first_page(page: &Page) -> PageNo {
    read_page_no(page, FIRST_PAGE_OFFSET)
}

pub fn set_first_page(page: &mut Page, value: PageNo) {
    write_page_no(page, FIRST_PAGE_OFFSET, value);
}

pub fn last_page(page: &Page) -> PageNo {
    read_page_no(page, LAST_PAGE_OFFSET)
}

pub fn set_last_page(page: &mut Page, value: PageNo) {
    write_page_no(page, LAST_PAGE_OFFSET, value);
}

pub fn page_count(page: &Page) -> u32 {
    read_u32(page, PAGE_COUNT_OFFSET)
}

pub fn set_page_count(page: &mut Page, value: u32) {
    write_u32(page, PAGE_COUNT_OFFSET, value);
}

pub fn record_count(page: &Page) -> u32 {
    read_u32(page, RECORD_COUNT_OFFSET)
}

pub fn set_record_count(page: &mut Page, value: u32) {
    write_u32(page, RECORD_COUNT_OFFSET, value);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_round_trips_file_name() {
        let mut page = Page::new();
        init(&mut page, "orders.heap");
        assert_eq!(file_name(&page), "orders.heap");
        assert!(first_page(&page).is_none());
        assert!(last_page(&page).is_none());
        assert_eq!(page_count(&page), 0);
        assert_eq!(record_count(&page), 0);
    }

    #[test]
    fn chain_anchors_and_counts_round_trip() {
        let mut page = Page::new();
        init(&mut page, "t");

        set_first_page(&mut page, PageNo::new(1));
        set_last_page(&mut page, PageNo::new(4));
        set_page_count(&mut page, 3);
        set_record_count(&mut page, 42);

        assert_eq!(first_page(&page), PageNo::new(1));
        assert_eq!(last_page(&page), PageNo::new(4));
        assert_eq!(page_count(&page), 3);
        assert_eq!(record_count(&page), 42);
    }

    #[test]
    fn oversize_file_name_is_truncated_not_rejected() {
        let mut page = Page::new();
        let long_name = "x".repeat(MAX_NAME + 10);
        init(&mut page, &long_name);
        assert_eq!(file_name(&page).len(), MAX_NAME - 1);
    }
}
