// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Jason Ish

//! Session-only prompt history for up/down arrow navigation.
//!
//! Entries are kept oldest-first. `offset` counts how far back from the most
//! recent entry the user has navigated; 0 means the live buffer is shown.

use std::collections::VecDeque;

pub(crate) const DEFAULT_CAPACITY: usize = 100;

#[derive(Debug)]
pub(crate) struct InputHistory {
    entries: VecDeque<String>,
    capacity: usize,
    offset: usize,
    /// Live buffer captured when navigation started.
    draft: String,
}

impl InputHistory {
    pub(crate) fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            offset: 0,
            draft: String::new(),
        }
    }

    /// Record a submitted line. Blank lines and repeats of the most recent
    /// entry are dropped; the oldest entry is evicted once at capacity.
    pub(crate) fn add_entry(&mut self, text: &str) {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return;
        }
        if self.entries.back().is_some_and(|last| last == trimmed) {
            return;
        }

        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(trimmed.to_string());
        self.reset_position();
    }

    /// Step one entry further into the past.
    ///
    /// The first step snapshots `live` so that `get_next` can restore it.
    /// Returns `None` when history is empty or already at the oldest entry.
    pub(crate) fn get_previous(&mut self, live: &str) -> Option<String> {
        if self.entries.is_empty() || self.offset >= self.entries.len() {
            return None;
        }
        if self.offset == 0 {
            self.draft = live.to_string();
        }
        self.offset += 1;
        self.entry_at_offset()
    }

    /// Step one entry back toward the present. Reaching offset 0 returns the
    /// snapshot taken when navigation began.
    pub(crate) fn get_next(&mut self) -> Option<String> {
        if self.offset == 0 {
            return None;
        }
        self.offset -= 1;
        if self.offset == 0 {
            return Some(std::mem::take(&mut self.draft));
        }
        self.entry_at_offset()
    }

    pub(crate) fn reset_position(&mut self) {
        self.offset = 0;
        self.draft.clear();
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub(crate) fn is_navigating(&self) -> bool {
        self.offset > 0
    }

    fn entry_at_offset(&self) -> Option<String> {
        let idx = self.entries.len().checked_sub(self.offset)?;
        self.entries.get(idx).cloned()
    }
}

impl Default for InputHistory {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
