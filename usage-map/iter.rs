//! Forward and reverse iterators over a [`UsageMap`](crate::UsageMap)'s
//! member pages, stable under mutation between calls to `next`.
//!
//! Each iterator tracks `(prev_page, next_page, last_seen_mod_count)`. Once
//! `next_page` runs dry, a later call only re-scans from `prev_page` if the
//! map's modification counter has moved on since the last observation --
//! otherwise it trusts that it has already seen everything there is.

use crate::UsageMap;

/// Ascending iterator over a usage map's member pages. See the
/// [module documentation](self) for its stability guarantees.
pub struct Forward<'a> {
    map: &'a UsageMap,
    prev_page: Option<u32>,
    next_page: Option<u32>,
    last_seen_mod_count: Option<u64>,
}

impl<'a> Forward<'a> {
    pub(crate) fn new(map: &'a UsageMap) -> Self {
        Forward {
            map,
            prev_page: None,
            next_page: None,
            last_seen_mod_count: None,
        }
    }

    fn recompute(&mut self) {
        self.next_page = match self.prev_page {
            Some(p) => p
                .checked_add(1)
                .and_then(|floor| self.map.page_numbers.range(floor..).next().copied()),
            None => self.map.page_numbers.iter().next().copied(),
        };
        self.last_seen_mod_count = Some(self.map.mod_count());
    }
}

impl<'a> Iterator for Forward<'a> {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        if self.next_page.is_none() && self.last_seen_mod_count != Some(self.map.mod_count()) {
            self.recompute();
        }

        let page = self.next_page.take()?;
        self.prev_page = Some(page);
        self.next_page = page
            .checked_add(1)
            .and_then(|floor| self.map.page_numbers.range(floor..).next().copied());
        self.last_seen_mod_count = Some(self.map.mod_count());
        Some(page)
    }
}

/// Descending iterator over a usage map's member pages. See the
/// [module documentation](self) for its stability guarantees.
pub struct Reverse<'a> {
    map: &'a UsageMap,
    prev_page: Option<u32>,
    next_page: Option<u32>,
    last_seen_mod_count: Option<u64>,
}

impl<'a> Reverse<'a> {
    pub(crate) fn new(map: &'a UsageMap) -> Self {
        Reverse {
            map,
            prev_page: None,
            next_page: None,
            last_seen_mod_count: None,
        }
    }

    fn recompute(&mut self) {
        self.next_page = match self.prev_page {
            Some(p) => p
                .checked_sub(1)
                .and_then(|ceil| self.map.page_numbers.range(..=ceil).next_back().copied()),
            None => self.map.page_numbers.iter().next_back().copied(),
        };
        self.last_seen_mod_count = Some(self.map.mod_count());
    }
}

impl<'a> Iterator for Reverse<'a> {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        if self.next_page.is_none() && self.last_seen_mod_count != Some(self.map.mod_count()) {
            self.recompute();
        }

        let page = self.next_page.take()?;
        self.prev_page = Some(page);
        self.next_page = page
            .checked_sub(1)
            .and_then(|ceil| self.map.page_numbers.range(..=ceil).next_back().copied());
        self.last_seen_mod_count = Some(self.map.mod_count());
        Some(page)
    }
}
