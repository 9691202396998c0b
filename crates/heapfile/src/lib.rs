//! The heap file layer: an unordered collection of variable-length
//! records addressable by stable RIDs, scannable sequentially with
//! optional predicate filtering, mutable by insert/delete.
//!
//! Layered directly on `storage::{BufferPoolManager, FileManager}`. This
//! crate owns the slotted page, the file-header page, the heap file
//! handle, the scan cursor, the insert cursor, and the create/destroy
//! factory functions.

mod header_page;
mod heap_file;
mod insert;
mod record;
mod scan;
pub mod slotted_page;

use std::path::Path;

use common::{HeapError, HeapResult};
use storage::{BufferPoolManager, FileManager};

pub use heap_file::HeapFileHandle;
pub use insert::InsertFileScan;
pub use record::RecordView;
pub use scan::{AttrType, CompOp, HeapFileScan};

/// Creates a new heap file: an empty chain containing exactly one empty
/// data page, plus an initialized header page.
///
/// Fails with `FileExists`, and has no side effects, if `name` already
/// names a file.
pub fn create_heap_file(pool: &BufferPoolManager, name: impl AsRef<Path>) -> HeapResult<()> {
    let path = name.as_ref();
    if FileManager::open_file(path).is_ok() {
        return Err(HeapError::FileExists);
    }

    FileManager::create_file(path)?;
    let file = FileManager::open_file(path)?;

    let header = pool.alloc_page(&file)?;
    header_page::init(&mut header.page_mut(), &path.display().to_string());

    let data_page = pool.alloc_page(&file)?;
    let data_page_no = data_page.page_no();
    slotted_page::init(&mut data_page.page_mut(), data_page_no);

    header_page::set_first_page(&mut header.page_mut(), data_page_no);
    header_page::set_last_page(&mut header.page_mut(), data_page_no);
    header_page::set_page_count(&mut header.page_mut(), 1);
    header_page::set_record_count(&mut header.page_mut(), 0);

    header.mark_dirty();
    data_page.mark_dirty();

    log::debug!("created heap file {path:?} with first data page {data_page_no}");
    Ok(())
}

/// Destroys a named heap file. The caller is responsible for ensuring no
/// handle to it is still open.
pub fn destroy_heap_file(name: impl AsRef<Path>) -> HeapResult<()> {
    FileManager::destroy_file(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn create_heap_file_lays_out_one_empty_data_page() {
        init_logging();
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.heap");
        let pool = BufferPoolManager::new(8);

        create_heap_file(&pool, &path).unwrap();

        let file = FileManager::open_file(&path).unwrap();
        let handle = HeapFileHandle::open(pool, file).unwrap();
        assert_eq!(handle.get_rec_cnt(), 0);
        assert_eq!(handle.page_count(), 1);
        assert_eq!(handle.first_page(), handle.last_page());
    }

    #[test]
    fn create_heap_file_twice_fails_with_file_exists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.heap");
        let pool = BufferPoolManager::new(8);

        create_heap_file(&pool, &path).unwrap();
        let err = create_heap_file(&pool, &path).unwrap_err();
        assert!(matches!(err, HeapError::FileExists));
    }

    #[test]
    fn destroy_heap_file_removes_it() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.heap");
        let pool = BufferPoolManager::new(8);

        create_heap_file(&pool, &path).unwrap();
        destroy_heap_file(&path).unwrap();
        assert!(FileManager::open_file(&path).is_err());
    }
}
