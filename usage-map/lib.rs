// Copyright 2024 The Jetdb Authors.
//
// Use of this source code is governed by a BSD 3-clause
// license that can be found in the LICENSE file.

//! Implements the per-table page-usage map: a space-efficient, self-promoting
//! bitmap of which pages belong to a table (or the free-space pool).
//!
//! A usage map starts out *inline*: its bits live directly in a row on a
//! host page, alongside a 4-byte starting page number. As pages are added
//! outside its tracked window it either *shifts* that window (if the new
//! window still fits in the same number of bits) or *promotes* itself to a
//! *reference* map, whose bits live across a chain of dedicated pages large
//! enough to address the format's entire page space.
//!
//! See [`UsageMap::from_disk`] for construction and [`UsageMap::add`] /
//! [`UsageMap::remove`] for the mutation protocol.

use jet_format::{
    JetFormat, PageChannel, PageNumber, USAGE_MAP_PAGE_HEADER_LEN, USAGE_MAP_PAGE_TYPE,
    USAGE_MAP_TYPE_INLINE, USAGE_MAP_TYPE_REFERENCE,
};
use std::collections::BTreeSet;

mod iter;

pub use iter::{Forward, Reverse};

/// Errors raised while reading, mutating, or iterating a [`UsageMap`].
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// An on-disk invariant was violated: an unrecognised map type tag, a
    /// USAGE_MAP page missing its type marker, or a redundant add/remove.
    #[error("usage map corrupt: {0}")]
    CorruptState(String),

    /// A page number fell outside the total capacity a reference map can
    /// ever address.
    #[error("page {0} is out of range for this usage map")]
    OutOfRange(u32),

    /// The supplied [`PageChannel`] failed to service a read or write.
    #[error(transparent)]
    Channel(#[from] jet_format::Error),
}

/// The backing representation of a [`UsageMap`]: compact and bounded
/// ([`Kind::Inline`]), or sparse and effectively unbounded ([`Kind::Reference`]).
#[derive(Debug, Clone, PartialEq, Eq)]
enum Kind {
    Inline,
    Reference {
        /// One pointer per addressable chunk of `M` pages; `0` means the
        /// chunk has no backing page yet.
        pointers: Vec<u32>,
    },
}

/// A bitmap of page membership over a half-open page range `[start_page, end_page)`.
///
/// `UsageMap` mirrors its in-memory `page_numbers` set to an on-disk
/// representation on every successful [`add`](Self::add) or
/// [`remove`](Self::remove); see the module documentation for the two
/// representations it migrates between.
#[derive(Debug)]
pub struct UsageMap {
    format: JetFormat,
    host_page: PageNumber,
    row_offset: usize,
    assume_out_of_range_bits_on: bool,
    start_page: u32,
    end_page: u32,
    page_numbers: BTreeSet<u32>,
    mod_count: u64,
    kind: Kind,
}

impl UsageMap {
    fn inline_row_len(format: &JetFormat) -> usize {
        1 + 4 + format.usage_map_table_byte_length
    }

    fn reference_row_len(format: &JetFormat) -> usize {
        1 + 4 + 4 * format.usage_map_reference_pointer_count()
    }

    /// Reads an existing usage map declared at `row_offset` within
    /// `host_page`, dispatching on its type tag.
    ///
    /// `assume_out_of_range_bits_on` should be `true` for a free-space
    /// usage map (pages outside the tracked window are implicitly "in the
    /// set", since free space is the default state of an unseen page) and
    /// `false` for a table's usage map.
    pub fn from_disk(
        format: JetFormat,
        channel: &mut dyn PageChannel,
        host_page: PageNumber,
        row_offset: usize,
        assume_out_of_range_bits_on: bool,
    ) -> Result<Self, Error> {
        let mut buf = vec![0u8; format.page_size];
        channel.read_page(host_page, &mut buf)?;

        match buf[row_offset] {
            USAGE_MAP_TYPE_INLINE => {
                Self::init_inline(format, host_page, row_offset, &buf, assume_out_of_range_bits_on)
            }
            USAGE_MAP_TYPE_REFERENCE => Self::init_reference(
                format,
                channel,
                host_page,
                row_offset,
                &buf,
                assume_out_of_range_bits_on,
            ),
            other => Err(Error::CorruptState(format!(
                "unrecognised usage map type tag {:#04x}",
                other
            ))),
        }
    }

    /// Declares a brand-new inline usage map at `row_offset` within
    /// `host_page`, starting empty (or fully "on", if
    /// `assume_out_of_range_bits_on` is set) at `start_page`.
    pub fn create_inline(
        format: JetFormat,
        channel: &mut dyn PageChannel,
        host_page: PageNumber,
        row_offset: usize,
        start_page: u32,
        assume_out_of_range_bits_on: bool,
    ) -> Result<Self, Error> {
        let mut buf = vec![0u8; format.page_size];
        channel.read_page(host_page, &mut buf)?;

        let row_len = Self::inline_row_len(&format);
        let row = &mut buf[row_offset..row_offset + row_len];
        row[0] = USAGE_MAP_TYPE_INLINE;
        row[1..5].copy_from_slice(&start_page.to_le_bytes());
        for b in &mut row[5..] {
            *b = 0;
        }
        channel.write_page(host_page, &buf)?;

        Ok(UsageMap {
            format,
            host_page,
            row_offset,
            assume_out_of_range_bits_on,
            start_page,
            end_page: 0, // corrected below
            page_numbers: BTreeSet::new(),
            mod_count: 0,
            kind: Kind::Inline,
        }
        .with_inline_end_page())
    }

    fn with_inline_end_page(mut self) -> Self {
        self.end_page = self.start_page + self.format.usage_map_table_bit_length() as u32;
        self
    }

    fn init_inline(
        format: JetFormat,
        host_page: PageNumber,
        row_offset: usize,
        buf: &[u8],
        assume_out_of_range_bits_on: bool,
    ) -> Result<Self, Error> {
        let row_len = Self::inline_row_len(&format);
        let row = &buf[row_offset..row_offset + row_len];
        let start_page = u32::from_le_bytes(row[1..5].try_into().unwrap());
        let l = format.usage_map_table_bit_length() as u32;
        let end_page = start_page + l;

        let mut page_numbers = BTreeSet::new();
        for (byte_index, byte) in row[5..].iter().enumerate() {
            for bit in 0..8 {
                if byte & (1 << bit) != 0 {
                    page_numbers.insert(start_page + (byte_index * 8 + bit) as u32);
                }
            }
        }

        Ok(UsageMap {
            format,
            host_page,
            row_offset,
            assume_out_of_range_bits_on,
            start_page,
            end_page,
            page_numbers,
            mod_count: 0,
            kind: Kind::Inline,
        })
    }

    fn init_reference(
        format: JetFormat,
        channel: &mut dyn PageChannel,
        host_page: PageNumber,
        row_offset: usize,
        buf: &[u8],
        assume_out_of_range_bits_on: bool,
    ) -> Result<Self, Error> {
        let n = format.usage_map_reference_pointer_count();
        let row_len = Self::reference_row_len(&format);
        let row = &buf[row_offset..row_offset + row_len];

        let mut pointers = Vec::with_capacity(n);
        for i in 0..n {
            let off = 5 + i * 4;
            pointers.push(u32::from_le_bytes(row[off..off + 4].try_into().unwrap()));
        }

        let m = format.usage_map_page_capacity();
        let mut page_numbers = BTreeSet::new();
        let mut page_buf = vec![0u8; format.page_size];
        for (k, &ptr) in pointers.iter().enumerate() {
            if ptr == 0 {
                continue;
            }
            channel.read_page(PageNumber(ptr), &mut page_buf)?;
            if page_buf[0] != USAGE_MAP_PAGE_TYPE {
                return Err(Error::CorruptState(format!(
                    "usage map page {} has wrong page type {:#04x}",
                    ptr, page_buf[0]
                )));
            }
            let base = (k * m) as u32;
            for (byte_index, byte) in page_buf[USAGE_MAP_PAGE_HEADER_LEN..].iter().enumerate() {
                for bit in 0..8 {
                    if byte & (1 << bit) != 0 {
                        page_numbers.insert(base + (byte_index * 8 + bit) as u32);
                    }
                }
            }
        }

        Ok(UsageMap {
            start_page: 0,
            end_page: (n * m) as u32,
            page_numbers,
            mod_count: 0,
            kind: Kind::Reference { pointers },
            format,
            host_page,
            row_offset,
            assume_out_of_range_bits_on,
        })
    }

    /// The first page number this map could ever report as a member
    /// (inclusive).
    pub fn start_page(&self) -> u32 {
        self.start_page
    }

    /// One past the last page number this map could ever report as a
    /// member (exclusive).
    pub fn end_page(&self) -> u32 {
        self.end_page
    }

    /// The number of successful [`add`](Self::add)/[`remove`](Self::remove)
    /// calls so far. Exposed so iterators can detect intervening mutation.
    pub fn mod_count(&self) -> u64 {
        self.mod_count
    }

    /// Whether `page` is logically a member of this usage map.
    pub fn contains(&self, page: u32) -> bool {
        if page < self.start_page || page >= self.end_page {
            self.assume_out_of_range_bits_on
        } else {
            self.page_numbers.contains(&page)
        }
    }

    /// Returns an iterator over member pages in ascending order, stable
    /// across mutations performed between calls to `next`.
    pub fn forward(&self) -> Forward<'_> {
        Forward::new(self)
    }

    /// Returns an iterator over member pages in descending order, stable
    /// across mutations performed between calls to `next`.
    pub fn reverse(&self) -> Reverse<'_> {
        Reverse::new(self)
    }

    /// Adds `page` to the map.
    ///
    /// Fails with [`Error::CorruptState`] if `page` is already a member.
    pub fn add(&mut self, channel: &mut dyn PageChannel, page: u32) -> Result<(), Error> {
        self.add_or_remove(channel, page, true)
    }

    /// Removes `page` from the map.
    ///
    /// Fails with [`Error::CorruptState`] if `page` is not currently a
    /// member (and `assume_out_of_range_bits_on` is `false`, or `page` is
    /// older than anything this map has ever tracked).
    pub fn remove(&mut self, channel: &mut dyn PageChannel, page: u32) -> Result<(), Error> {
        self.add_or_remove(channel, page, false)
    }

    fn add_or_remove(
        &mut self,
        channel: &mut dyn PageChannel,
        page: u32,
        add: bool,
    ) -> Result<(), Error> {
        let in_range = page >= self.start_page && page < self.end_page;
        if in_range {
            let on = self.page_numbers.contains(&page);
            if on == add {
                return Err(Error::CorruptState(format!(
                    "cannot {} page {}: it is already {}",
                    if add { "add" } else { "remove" },
                    page,
                    if on { "set" } else { "unset" }
                )));
            }
            return self.set_bit(channel, page, add);
        }

        if matches!(self.kind, Kind::Reference { .. }) {
            // A reference map's range already covers every page the format
            // can address, so "out of range" here is a hard capacity limit.
            return Err(Error::OutOfRange(page));
        }

        if add {
            self.add_out_of_range(channel, page)
        } else if self.assume_out_of_range_bits_on {
            self.remove_out_of_range(channel, page)
        } else {
            Err(Error::CorruptState(format!(
                "page {} is not in the map",
                page
            )))
        }
    }

    fn first_last(&self) -> Option<(u32, u32)> {
        let first = *self.page_numbers.iter().next()?;
        let last = *self.page_numbers.iter().next_back()?;
        Some((first, last))
    }

    fn add_out_of_range(&mut self, channel: &mut dyn PageChannel, page: u32) -> Result<(), Error> {
        if self.assume_out_of_range_bits_on {
            // The page is already implicitly "on"; adding it is a no-op.
            return Ok(());
        }

        let l = self.format.usage_map_table_bit_length() as u32;
        let (lo, hi) = match self.first_last() {
            Some((first, last)) => (first.min(page), last.max(page)),
            None => (page, page),
        };
        let width = hi - lo + 1;

        if width < l {
            log::debug!(
                "usage map shift: tentative range [{}, {}] fits in {} bits",
                lo,
                hi,
                l
            );
            let old_pages: Vec<u32> = self.page_numbers.iter().copied().collect();
            // A window of `l` pages starting at `lo` covers `[lo, hi]`
            // exactly when `width <= l`, which we just checked.
            self.shift_inline(channel, lo)?;
            for old_page in old_pages {
                self.set_bit(channel, old_page, true)?;
            }
        } else {
            log::debug!(
                "usage map promotion: tentative range [{}, {}] needs {} bits, only {} available",
                lo,
                hi,
                width,
                l
            );
            let old_pages: Vec<u32> = self.page_numbers.iter().copied().collect();
            self.promote_to_reference(channel)?;
            for old_page in old_pages {
                self.set_bit(channel, old_page, true)?;
            }
        }

        self.set_bit(channel, page, true)
    }

    fn remove_out_of_range(
        &mut self,
        channel: &mut dyn PageChannel,
        page: u32,
    ) -> Result<(), Error> {
        let l = self.format.usage_map_table_bit_length() as u32;
        let first_last = self.first_last();

        if let Some((first, _)) = first_last {
            if page < first {
                log::debug!(
                    "usage map remove: page {} predates tracked range starting at {}, ignoring",
                    page,
                    first
                );
                return Ok(());
            }
        }

        let old_pages: Vec<u32> = self.page_numbers.iter().copied().collect();
        let old_end_page = self.end_page;

        let new_start = match first_last {
            None => page,
            Some((first, _)) if page - first + 1 >= l => first + (page - l + 1),
            Some((first, _)) => first,
        };

        self.shift_inline(channel, new_start)?;

        if old_pages.is_empty() {
            let (start, end) = (self.start_page, self.end_page);
            for p in start..end {
                self.set_bit(channel, p, true)?;
            }
        } else {
            for old_page in old_pages.into_iter().filter(|&p| p >= new_start) {
                self.set_bit(channel, old_page, true)?;
            }
            for p in old_end_page..self.end_page {
                self.set_bit(channel, p, true)?;
            }
        }

        self.set_bit(channel, page, false)
    }

    /// Zeroes the inline row's payload on disk and in memory, then moves
    /// `start_page` (and therefore `end_page`) to `new_start`. Callers are
    /// responsible for re-adding whatever pages should remain set.
    fn shift_inline(&mut self, channel: &mut dyn PageChannel, new_start: u32) -> Result<(), Error> {
        let row_len = Self::inline_row_len(&self.format);
        let mut buf = vec![0u8; self.format.page_size];
        channel.read_page(self.host_page, &mut buf)?;

        let row = &mut buf[self.row_offset..self.row_offset + row_len];
        row[1..5].copy_from_slice(&new_start.to_le_bytes());
        for b in &mut row[5..] {
            *b = 0;
        }

        channel.write_page(self.host_page, &buf)?;

        self.start_page = new_start;
        self.end_page = new_start + self.format.usage_map_table_bit_length() as u32;
        self.page_numbers.clear();
        Ok(())
    }

    /// Rewrites the declaration row as a reference map with no chunks
    /// allocated yet, then installs a reference handler over the full
    /// addressable range. Callers are responsible for re-adding whatever
    /// pages should remain set.
    fn promote_to_reference(&mut self, channel: &mut dyn PageChannel) -> Result<(), Error> {
        let n = self.format.usage_map_reference_pointer_count();
        let row_len = Self::reference_row_len(&self.format);
        let mut buf = vec![0u8; self.format.page_size];
        channel.read_page(self.host_page, &mut buf)?;

        let row = &mut buf[self.row_offset..self.row_offset + row_len];
        row[0] = USAGE_MAP_TYPE_REFERENCE;
        for b in &mut row[1..] {
            *b = 0;
        }
        channel.write_page(self.host_page, &buf)?;

        let m = self.format.usage_map_page_capacity();
        self.start_page = 0;
        self.end_page = (n * m) as u32;
        self.page_numbers.clear();
        self.kind = Kind::Reference {
            pointers: vec![0; n],
        };
        Ok(())
    }

    /// Flips the bit for `page` (which must be in `[start_page, end_page)`)
    /// to `on`, persisting the change and bumping `mod_count`.
    fn set_bit(&mut self, channel: &mut dyn PageChannel, page: u32, on: bool) -> Result<(), Error> {
        match &self.kind {
            Kind::Inline => self.set_bit_inline(channel, page, on)?,
            Kind::Reference { .. } => self.set_bit_reference(channel, page, on)?,
        }

        if on {
            self.page_numbers.insert(page);
        } else {
            self.page_numbers.remove(&page);
        }
        self.mod_count += 1;
        Ok(())
    }

    fn set_bit_inline(
        &mut self,
        channel: &mut dyn PageChannel,
        page: u32,
        on: bool,
    ) -> Result<(), Error> {
        let mut buf = vec![0u8; self.format.page_size];
        channel.read_page(self.host_page, &mut buf)?;

        let offset_in_map = (page - self.start_page) as usize;
        let byte_index = self.row_offset + 5 + offset_in_map / 8;
        let mask = 1u8 << (offset_in_map % 8);
        if on {
            buf[byte_index] |= mask;
        } else {
            buf[byte_index] &= !mask;
        }

        channel.write_page(self.host_page, &buf)?;
        Ok(())
    }

    fn set_bit_reference(
        &mut self,
        channel: &mut dyn PageChannel,
        page: u32,
        on: bool,
    ) -> Result<(), Error> {
        let m = self.format.usage_map_page_capacity();
        let chunk = (page / m as u32) as usize;
        let offset_in_chunk = (page % m as u32) as usize;

        let pointers = match &mut self.kind {
            Kind::Reference { pointers } => pointers,
            Kind::Inline => unreachable!("set_bit_reference called on inline map"),
        };

        let mut ptr = pointers[chunk];
        if ptr == 0 {
            if !on {
                unreachable!("cannot clear a bit in an unallocated usage map chunk");
            }
            log::debug!("usage map growing reference pointer slot {}", chunk);
            ptr = self.grow_reference_chunk(channel, chunk)?;
        }

        let mut page_buf = vec![0u8; self.format.page_size];
        channel.read_page(PageNumber(ptr), &mut page_buf)?;

        let byte_index = USAGE_MAP_PAGE_HEADER_LEN + offset_in_chunk / 8;
        let mask = 1u8 << (offset_in_chunk % 8);
        if on {
            page_buf[byte_index] |= mask;
        } else {
            page_buf[byte_index] &= !mask;
        }
        channel.write_page(PageNumber(ptr), &page_buf)?;
        Ok(())
    }

    /// Allocates and initialises a fresh USAGE_MAP page for reference
    /// pointer slot `chunk`, records its page number in both the row on
    /// disk and the in-memory pointer table, and returns it.
    fn grow_reference_chunk(
        &mut self,
        channel: &mut dyn PageChannel,
        chunk: usize,
    ) -> Result<u32, Error> {
        let new_page = channel.allocate_page()?;

        let mut page_buf = vec![0u8; self.format.page_size];
        page_buf[0] = USAGE_MAP_PAGE_TYPE;
        channel.write_page(new_page, &page_buf)?;

        let row_len = Self::reference_row_len(&self.format);
        let mut buf = vec![0u8; self.format.page_size];
        channel.read_page(self.host_page, &mut buf)?;
        let row = &mut buf[self.row_offset..self.row_offset + row_len];
        let off = 5 + chunk * 4;
        row[off..off + 4].copy_from_slice(&new_page.0.to_le_bytes());
        channel.write_page(self.host_page, &buf)?;

        if let Kind::Reference { pointers } = &mut self.kind {
            pointers[chunk] = new_page.0;
        }

        Ok(new_page.0)
    }
}
