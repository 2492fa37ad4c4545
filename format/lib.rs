// Copyright 2024 The Jetdb Authors.
//
// Use of this source code is governed by a BSD 3-clause
// license that can be found in the LICENSE file.

//! Supplies the layout constants and page I/O trait that the rest of the
//! workspace is built against.
//!
//! A concrete [`JetFormat`] describes one version of the on-disk format
//! (page size, byte offsets, which column types may be calculated, ...).
//! A concrete [`PageChannel`] is supplied by the caller and knows how to
//! read and write fixed-size pages from whatever storage backs the
//! database file; this crate only defines the trait it must implement.

use std::fmt;

/// A 32-bit page number.
///
/// `PageNumber` is a thin newtype so that page numbers cannot be
/// accidentally mixed up with row offsets or byte lengths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PageNumber(pub u32);

impl PageNumber {
    /// The sentinel page number used to mean "no page", distinct from
    /// any page number that can actually be allocated.
    pub const INVALID: PageNumber = PageNumber(u32::MAX);

    /// Returns whether this page number is the [`INVALID`](Self::INVALID) sentinel.
    pub fn is_invalid(self) -> bool {
        self == Self::INVALID
    }
}

impl From<u32> for PageNumber {
    fn from(n: u32) -> Self {
        PageNumber(n)
    }
}

impl fmt::Display for PageNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The byte written at the start of a dedicated USAGE_MAP page, identifying
/// its page type to anyone scanning the file.
pub const USAGE_MAP_PAGE_TYPE: u8 = 0x02;

/// The size, in bytes, of the header at the start of a USAGE_MAP page
/// (before its bitmap payload begins).
pub const USAGE_MAP_PAGE_HEADER_LEN: usize = 4;

/// Row-level type tag for an inline usage map.
pub const USAGE_MAP_TYPE_INLINE: u8 = 0x00;

/// Row-level type tag for a reference usage map.
pub const USAGE_MAP_TYPE_REFERENCE: u8 = 0x01;

/// Describes one version of the on-disk "Jet" format: page size and the
/// handful of offsets and limits that vary between format revisions.
///
/// Values are supplied by the caller (e.g. after sniffing a database
/// file's header) and are otherwise opaque to this workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JetFormat {
    /// Size in bytes of every page in the database, e.g. 4096.
    pub page_size: usize,

    /// Length, in bytes, of the fixed-size bit array backing an inline
    /// usage map (`L / 8` in the design notes).
    pub usage_map_table_byte_length: usize,

    /// Maximum supported precision (total significant digits) for a
    /// `NUMERIC` column.
    pub max_numeric_precision: u8,
}

impl JetFormat {
    /// The length in bits of an inline usage map's bit array (`L`).
    pub fn usage_map_table_bit_length(&self) -> usize {
        self.usage_map_table_byte_length * 8
    }

    /// The number of bytes available for bitmap payload on a dedicated
    /// USAGE_MAP page.
    pub fn usage_map_page_payload_len(&self) -> usize {
        self.page_size - USAGE_MAP_PAGE_HEADER_LEN
    }

    /// The number of pages addressable by a single USAGE_MAP page's
    /// bitmap (`M` in the design notes).
    pub fn usage_map_page_capacity(&self) -> usize {
        self.usage_map_page_payload_len() * 8
    }

    /// The number of reference pointers carried by a reference usage
    /// map's row (`N = L/4 + 1`).
    pub fn usage_map_reference_pointer_count(&self) -> usize {
        self.usage_map_table_byte_length / 4 + 1
    }
}

impl Default for JetFormat {
    /// A representative modern Jet format: 4 KiB pages, a 512-bit inline
    /// usage map table, and NUMERIC precision capped at 28 digits.
    fn default() -> Self {
        JetFormat {
            page_size: 4096,
            usage_map_table_byte_length: 512 / 8,
            max_numeric_precision: 28,
        }
    }
}

/// Errors surfaced by a [`PageChannel`] implementation.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The underlying storage failed to service a read or write.
    #[error("page I/O failure: {0}")]
    Io(String),

    /// The channel has no further pages to allocate.
    #[error("no pages left to allocate")]
    OutOfPages,
}

/// The I/O surface a caller must provide so this workspace can read and
/// write fixed-size pages.
///
/// Grounded on the teacher's block storage `Device` trait: a handful of
/// narrow, synchronous operations over fixed-size units, each fallible.
pub trait PageChannel {
    /// The size in bytes of every page exposed by this channel. Must
    /// match the page size of the [`JetFormat`] in use.
    fn page_size(&self) -> usize;

    /// Reads the given page's full contents into `buf`.
    ///
    /// `buf` must be exactly [`page_size`](Self::page_size) bytes long.
    fn read_page(&mut self, page: PageNumber, buf: &mut [u8]) -> Result<(), Error>;

    /// Writes `buf` as the full contents of the given page.
    ///
    /// `buf` must be exactly [`page_size`](Self::page_size) bytes long.
    fn write_page(&mut self, page: PageNumber, buf: &[u8]) -> Result<(), Error>;

    /// Allocates a fresh page and returns its page number. The page's
    /// initial contents are unspecified; callers must initialise it
    /// before relying on its contents.
    fn allocate_page(&mut self) -> Result<PageNumber, Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_page_number_is_distinct() {
        assert!(PageNumber::INVALID.is_invalid());
        assert!(!PageNumber(0).is_invalid());
        assert!(!PageNumber(u32::MAX - 1).is_invalid());
    }

    #[test]
    fn default_format_matches_documented_constants() {
        let format = JetFormat::default();
        assert_eq!(format.usage_map_table_bit_length(), 512);
        assert_eq!(format.usage_map_reference_pointer_count(), 512 / 4 + 1);
        assert_eq!(format.usage_map_page_capacity(), (4096 - 4) * 8);
    }
}
