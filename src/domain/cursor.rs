// Offset/limit pagination cursor over the detections feed
//
// Cursor-style: the backend exposes no total count, so "has more" is derived
// purely from page fullness. A full page implies a next page might exist; a
// short page is terminal.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCursor {
    pub page_number: u32,
    pub page_size: u32,
    pub has_more: bool,
}

impl PageCursor {
    pub fn new(page_size: u32) -> Self {
        Self {
            page_number: 1,
            page_size,
            has_more: false,
        }
    }

    /// Skip offset for the fetch this cursor describes.
    pub fn skip(&self) -> u32 {
        (self.page_number - 1) * self.page_size
    }

    /// Fold one fetch result into the cursor.
    pub fn after_fetch(self, items_returned: usize) -> Self {
        Self {
            has_more: items_returned == self.page_size as usize,
            ..self
        }
    }

    /// Move to the next page, only if the prior fetch indicated one may exist.
    pub fn advance(self) -> Self {
        if self.has_more {
            Self {
                page_number: self.page_number + 1,
                ..self
            }
        } else {
            self
        }
    }

    /// Move to the previous page, floored at page 1.
    pub fn retreat(self) -> Self {
        Self {
            page_number: self.page_number.max(2) - 1,
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_page_has_more() {
        let cursor = PageCursor::new(50).after_fetch(50);
        assert!(cursor.has_more);
    }

    #[test]
    fn test_short_page_is_terminal() {
        let cursor = PageCursor::new(50).after_fetch(12);
        assert!(!cursor.has_more);
        let cursor = PageCursor::new(50).after_fetch(0);
        assert!(!cursor.has_more);
    }

    #[test]
    fn test_skip_offset() {
        let mut cursor = PageCursor::new(25);
        assert_eq!(cursor.skip(), 0);
        cursor = cursor.after_fetch(25).advance();
        assert_eq!(cursor.page_number, 2);
        assert_eq!(cursor.skip(), 25);
    }

    #[test]
    fn test_advance_requires_has_more() {
        let cursor = PageCursor::new(50).after_fetch(12);
        assert_eq!(cursor.advance().page_number, 1);
    }

    #[test]
    fn test_advance_then_retreat_round_trips() {
        let cursor = PageCursor::new(50).after_fetch(50);
        let advanced = cursor.advance();
        assert_eq!(advanced.page_number, 2);
        assert_eq!(advanced.retreat().page_number, cursor.page_number);
    }

    #[test]
    fn test_retreat_floors_at_one() {
        let cursor = PageCursor::new(50);
        assert_eq!(cursor.retreat().page_number, 1);
        assert_eq!(cursor.retreat().retreat().page_number, 1);
    }
}
