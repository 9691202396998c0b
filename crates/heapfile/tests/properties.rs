//! Example-based checks of the heap file layer's core invariants:
//! round-trip, count consistency, chain integrity, pin discipline, scan
//! enumeration, and predicate soundness.

use common::Rid;
use heapfile::{AttrType, CompOp, HeapFileHandle, HeapFileScan, InsertFileScan, create_heap_file};
use storage::{BufferPoolManager, FileManager};
use tempfile::tempdir;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn round_trip_every_inserted_record_reads_back_byte_identical() {
    init_logging();
    let dir = tempdir().unwrap();
    let path = dir.path().join("p1.heap");
    let pool = BufferPoolManager::new(8);
    create_heap_file(&pool, &path).unwrap();

    let records: Vec<Vec<u8>> = (0..50u32).map(|i| format!("record-{i}").into_bytes()).collect();
    let mut rids = Vec::new();
    {
        let file = FileManager::open_file(&path).unwrap();
        let mut insert = InsertFileScan::open(pool.clone(), file).unwrap();
        for record in &records {
            rids.push(insert.insert_record(record).unwrap());
        }
    }

    let file = FileManager::open_file(&path).unwrap();
    let mut handle = HeapFileHandle::open(pool, file).unwrap();
    for (rid, expected) in rids.iter().zip(records.iter()) {
        assert_eq!(handle.get_record(*rid).unwrap().bytes(), expected.as_slice());
    }
}

#[test]
fn count_consistency_tracks_inserts_minus_deletes() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("p2.heap");
    let pool = BufferPoolManager::new(8);
    create_heap_file(&pool, &path).unwrap();

    let mut rids = Vec::new();
    {
        let file = FileManager::open_file(&path).unwrap();
        let mut insert = InsertFileScan::open(pool.clone(), file).unwrap();
        for i in 0..20u8 {
            rids.push(insert.insert_record(&[i]).unwrap());
        }
    }
    {
        let file = FileManager::open_file(&path).unwrap();
        let handle = HeapFileHandle::open(pool.clone(), file).unwrap();
        assert_eq!(handle.get_rec_cnt(), 20);
    }

    // delete 3 records while scanning past them, by rid
    {
        let file = FileManager::open_file(&path).unwrap();
        let mut scan = HeapFileScan::open(pool.clone(), file).unwrap();
        while let Some(rid) = scan.scan_next().unwrap() {
            if rid == rids[3] || rid == rids[9] || rid == rids[15] {
                scan.delete_record().unwrap();
            }
        }
    }

    let file = FileManager::open_file(&path).unwrap();
    let handle = HeapFileHandle::open(pool, file).unwrap();
    assert_eq!(handle.get_rec_cnt(), 17);
}

#[test]
fn chain_integrity_page_count_matches_first_to_last_hops() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("p3.heap");
    let pool = BufferPoolManager::new(8);
    create_heap_file(&pool, &path).unwrap();

    let big_record = vec![0u8; storage::PAGE_SIZE / 3];
    {
        let file = FileManager::open_file(&path).unwrap();
        let mut insert = InsertFileScan::open(pool.clone(), file).unwrap();
        for _ in 0..10 {
            insert.insert_record(&big_record).unwrap();
        }
    }

    let file = FileManager::open_file(&path).unwrap();
    let handle = HeapFileHandle::open(pool.clone(), file).unwrap();
    assert!(handle.page_count() > 1);

    // every inserted record is still reachable by a single unfiltered scan,
    // which only ever follows next_page links, exactly the chain
    // `page_count` claims to describe.
    drop(handle);
    let file = FileManager::open_file(&path).unwrap();
    let mut scan = HeapFileScan::open(pool, file).unwrap();
    let mut count = 0;
    while scan.scan_next().unwrap().is_some() {
        count += 1;
    }
    assert_eq!(count, 10);
}

#[test]
fn pin_discipline_never_exceeds_header_plus_current() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("p4.heap");
    let pool = BufferPoolManager::new(8);
    create_heap_file(&pool, &path).unwrap();

    {
        let file = FileManager::open_file(&path).unwrap();
        let mut insert = InsertFileScan::open(pool.clone(), file).unwrap();
        for i in 0..5u8 {
            insert.insert_record(&[i]).unwrap();
            // 1 header + at most 1 current page pinned by this handle
            assert!(pool.pinned_frame_count() <= 2);
        }
    }
    assert_eq!(pool.pinned_frame_count(), 0);
}

#[test]
fn scan_enumeration_visits_every_live_record_exactly_once() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("p5.heap");
    let pool = BufferPoolManager::new(8);
    create_heap_file(&pool, &path).unwrap();

    let mut rids = Vec::new();
    {
        let file = FileManager::open_file(&path).unwrap();
        let mut insert = InsertFileScan::open(pool.clone(), file).unwrap();
        for i in 0..30u8 {
            rids.push(insert.insert_record(&[i]).unwrap());
        }
    }

    let file = FileManager::open_file(&path).unwrap();
    let mut scan = HeapFileScan::open(pool, file).unwrap();
    let mut seen: Vec<Rid> = Vec::new();
    while let Some(rid) = scan.scan_next().unwrap() {
        seen.push(rid);
    }
    assert_eq!(seen, rids);
}

#[test]
fn predicate_soundness_every_returned_record_matches_and_every_skipped_one_does_not() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("p6.heap");
    let pool = BufferPoolManager::new(8);
    create_heap_file(&pool, &path).unwrap();

    {
        let file = FileManager::open_file(&path).unwrap();
        let mut insert = InsertFileScan::open(pool.clone(), file).unwrap();
        for v in 0i32..20 {
            insert.insert_record(&v.to_le_bytes()).unwrap();
        }
    }

    let file = FileManager::open_file(&path).unwrap();
    let mut scan = HeapFileScan::open(pool, file).unwrap();
    scan.start_scan(0, 4, AttrType::Int, Some(&10i32.to_le_bytes()), CompOp::Lt)
        .unwrap();

    let mut returned = Vec::new();
    while let Some(_rid) = scan.scan_next().unwrap() {
        let value = i32::from_le_bytes(scan.get_record_here().unwrap().bytes().try_into().unwrap());
        assert!(value < 10, "returned record {value} does not satisfy the predicate");
        returned.push(value);
    }
    assert_eq!(returned, (0..10).collect::<Vec<_>>());
}
