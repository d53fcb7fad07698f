//! Page navigation: a bounded 1-based cursor over the loaded document.
//!
//! The navigator never lets the cursor leave `[1, page_count]`. Requests that
//! would are rejected without mutation, and page-number text entry either
//! applies a valid page or tells the host to revert its input field.

#[cfg(test)]
#[path = "nav_test.rs"]
mod nav_test;

use crate::doc::PageNumber;

/// Outcome of committing the page-number input field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageInput {
    /// The entry was a valid page and the cursor moved (or already sat) there.
    Applied(PageNumber),
    /// The entry was rejected; the field should show this page again.
    Reverted(PageNumber),
}

/// A keyboard navigation command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavKey {
    Next,
    Prev,
}

impl NavKey {
    /// Map a DOM `KeyboardEvent.key` value to a navigation command.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "ArrowRight" | " " => Some(Self::Next),
            "ArrowLeft" => Some(Self::Prev),
            _ => None,
        }
    }
}

/// Bounded page cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Navigator {
    current: PageNumber,
    count: PageNumber,
}

impl Default for Navigator {
    fn default() -> Self {
        Self { current: 1, count: 0 }
    }
}

impl Navigator {
    /// A navigator over `count` pages, positioned on page 1.
    #[must_use]
    pub fn new(count: PageNumber) -> Self {
        Self { current: 1, count }
    }

    #[must_use]
    pub fn current(&self) -> PageNumber {
        self.current
    }

    #[must_use]
    pub fn count(&self) -> PageNumber {
        self.count
    }

    /// Whether `page` is a valid cursor position.
    #[must_use]
    pub fn contains(&self, page: PageNumber) -> bool {
        (1..=self.count).contains(&page)
    }

    /// Move to `page`. Returns true if the cursor changed.
    ///
    /// Out-of-range pages are rejected and leave the cursor where it was.
    pub fn go_to(&mut self, page: PageNumber) -> bool {
        if !self.contains(page) || page == self.current {
            return false;
        }
        self.current = page;
        true
    }

    /// Advance one page, saturating at the last page.
    pub fn next(&mut self) -> bool {
        self.go_to(self.current.saturating_add(1))
    }

    /// Go back one page, saturating at page 1.
    pub fn prev(&mut self) -> bool {
        self.go_to(self.current.saturating_sub(1))
    }

    /// Apply a keyboard command.
    pub fn apply_key(&mut self, key: NavKey) -> bool {
        match key {
            NavKey::Next => self.next(),
            NavKey::Prev => self.prev(),
        }
    }

    /// Commit a page-number entry typed by the presenter.
    ///
    /// Surrounding whitespace is ignored. Anything that is not an in-range
    /// integer reverts the field to the current page.
    pub fn commit_input(&mut self, raw: &str) -> PageInput {
        match raw.trim().parse::<PageNumber>() {
            Ok(page) if self.contains(page) => {
                self.go_to(page);
                PageInput::Applied(page)
            }
            _ => PageInput::Reverted(self.current),
        }
    }
}
