use std::ops::Range;

/// Current page of one view. Never wraps and never errors at the edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pager {
    page: usize,
    page_size: usize,
}

impl Pager {
    pub fn new(page_size: usize) -> Self {
        Self {
            page: 0,
            page_size: page_size.max(1),
        }
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn page_count(&self, len: usize) -> usize {
        len.div_ceil(self.page_size).max(1)
    }

    pub fn last_page(&self, len: usize) -> usize {
        self.page_count(len) - 1
    }

    pub fn clamp(&mut self, len: usize) {
        self.page = self.page.min(self.last_page(len));
    }

    pub fn reset(&mut self) {
        self.page = 0;
    }

    /// Returns whether the page changed.
    pub fn next(&mut self, len: usize) -> bool {
        if self.page < self.last_page(len) {
            self.page += 1;
            true
        } else {
            false
        }
    }

    pub fn prev(&mut self) -> bool {
        if self.page > 0 {
            self.page -= 1;
            true
        } else {
            false
        }
    }

    /// Slice bounds of the current page within a view of `len` items.
    pub fn range(&self, len: usize) -> Range<usize> {
        let start = (self.page * self.page_size).min(len);
        let end = (start + self.page_size).min(len);
        start..end
    }

    pub fn label(&self, len: usize) -> String {
        format!("Page {} / {}", self.page + 1, self.page_count(len))
    }
}
