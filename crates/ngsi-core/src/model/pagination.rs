//! Pagination window arithmetic

/// Position of one page of results within the full backend result set.
#[derive(Debug, Clone, Copy)]
pub struct PageWindow {
    /// Offset the client asked for
    pub offset: usize,
    /// Number of results actually returned
    pub returned: usize,
    /// Total number of results reported by the backend
    pub total: usize,
}

impl PageWindow {
    /// A `prev` link is offered whenever the window does not start at the
    /// beginning.
    pub fn has_prev(&self) -> bool {
        self.offset > 0
    }

    /// Offset of the previous page, saturating at the start.
    pub fn prev_offset(&self) -> usize {
        self.offset.saturating_sub(self.returned)
    }

    /// A `next` link is offered while results remain beyond this window.
    pub fn has_next(&self) -> bool {
        self.offset + self.returned < self.total
    }

    /// Offset of the next page.
    pub fn next_offset(&self) -> usize {
        self.offset + self.returned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_in_the_middle_links_both_ways() {
        let window = PageWindow {
            offset: 4,
            returned: 3,
            total: 8,
        };
        assert!(window.has_prev());
        assert_eq!(window.prev_offset(), 1);
        assert!(window.has_next());
        assert_eq!(window.next_offset(), 7);
    }

    #[test]
    fn first_window_has_no_prev() {
        let window = PageWindow {
            offset: 0,
            returned: 3,
            total: 8,
        };
        assert!(!window.has_prev());
        assert!(window.has_next());
    }

    #[test]
    fn last_window_has_no_next() {
        let window = PageWindow {
            offset: 6,
            returned: 2,
            total: 8,
        };
        assert!(window.has_prev());
        assert!(!window.has_next());
    }

    #[test]
    fn prev_offset_saturates_at_zero() {
        let window = PageWindow {
            offset: 2,
            returned: 3,
            total: 8,
        };
        assert_eq!(window.prev_offset(), 0);
    }
}
