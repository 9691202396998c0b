//! Shared identifiers and error types for the heap file storage engine.
//!
//! Kept as a leaf crate with no dependency on `storage` or `heapfile` so
//! both can depend on it without a cycle.

use std::io;
use thiserror::Error;

/// A page number, or the sentinel meaning "no such page".
///
/// The on-disk header and slotted-page layouts store this as a signed
/// 32-bit integer with `-1` meaning absent. In memory, prefer the
/// `Option<PageNo>` conversions below over comparing against `-1` directly.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageNo(i32);

impl PageNo {
    /// The "no such page" sentinel.
    pub const NONE: PageNo = PageNo(-1);

    /// Wraps a raw page number. Negative values other than `-1` are not
    /// meaningful but are not rejected here; callers that read untrusted
    /// bytes should treat anything negative as `NONE`.
    pub const fn new(raw: i32) -> Self {
        PageNo(raw)
    }

    pub const fn is_none(self) -> bool {
        self.0 < 0
    }

    pub const fn is_some(self) -> bool {
        !self.is_none()
    }

    /// The raw representation, as stored on disk.
    pub const fn raw(self) -> i32 {
        self.0
    }

    pub fn to_option(self) -> Option<PageNo> {
        if self.is_none() { None } else { Some(self) }
    }

    pub fn from_option(page_no: Option<PageNo>) -> PageNo {
        page_no.unwrap_or(PageNo::NONE)
    }
}

impl From<i32> for PageNo {
    fn from(raw: i32) -> Self {
        PageNo::new(raw)
    }
}

impl std::fmt::Display for PageNo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_none() {
            write!(f, "<none>")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// Record identifier: a page number plus a slot number within that page.
///
/// Stable for the lifetime of the record; unaffected by deletions of other
/// records on the same page.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Rid {
    pub page_no: PageNo,
    pub slot_no: u32,
}

impl Rid {
    /// The distinguished never-valid RID.
    pub const NULL: Rid = Rid {
        page_no: PageNo::NONE,
        slot_no: u32::MAX,
    };

    pub const fn new(page_no: PageNo, slot_no: u32) -> Self {
        Rid { page_no, slot_no }
    }

    pub fn is_null(self) -> bool {
        self == Rid::NULL
    }
}

impl Default for Rid {
    fn default() -> Self {
        Rid::NULL
    }
}

/// Canonical error type for the storage and heap file layers.
///
/// End-of-iteration conditions are deliberately not variants here. Scans
/// signal exhaustion with `Ok(None)`, since normal termination of an
/// iteration is not an error.
#[derive(Error, Debug)]
pub enum HeapError {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("file already exists")]
    FileExists,

    #[error("file not found")]
    FileNotFound,

    #[error("no such page")]
    NoSuchPage,

    #[error("invalid slot number")]
    InvalidSlot,

    #[error("record does not fit on an empty page")]
    InvalidRecLen,

    #[error("invalid scan parameter")]
    BadScanParam,

    #[error("buffer pool has no free frames")]
    BufferPoolExhausted,

    #[error("corrupt on-disk structure: {0}")]
    Corrupt(String),
}

pub type HeapResult<T> = Result<T, HeapError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_no_sentinel_round_trips() {
        assert!(PageNo::NONE.is_none());
        assert_eq!(PageNo::NONE.to_option(), None);
        assert_eq!(PageNo::from_option(None), PageNo::NONE);

        let p = PageNo::new(7);
        assert!(p.is_some());
        assert_eq!(p.to_option(), Some(p));
        assert_eq!(PageNo::from_option(Some(p)), p);
    }

    #[test]
    fn null_rid_is_never_a_real_rid() {
        assert!(Rid::NULL.is_null());
        assert!(!Rid::new(PageNo::new(0), 0).is_null());
    }
}
