//! Offset pagination.
//!
//! ```rust
//! use squad_query::Pagination;
//!
//! assert_eq!(Pagination::new().skip(1).take(2).to_sql(), "LIMIT 2 OFFSET 1");
//!
//! // Pages are numbered from 1.
//! let third = Pagination::page(3, 25);
//! assert_eq!((third.skip, third.take), (Some(50), Some(25)));
//! ```

use std::fmt;

/// `OFFSET`/`LIMIT` of a select. Both unset means every row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pagination {
    /// Rows dropped from the front (`offset`).
    pub skip: Option<u64>,
    /// Row cap (`limit`).
    pub take: Option<u64>,
}

impl Pagination {
    /// No offset and no limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop the first `skip` rows.
    pub fn skip(self, skip: u64) -> Self {
        Self {
            skip: Some(skip),
            ..self
        }
    }

    /// Return at most `take` rows.
    pub fn take(self, take: u64) -> Self {
        Self {
            take: Some(take),
            ..self
        }
    }

    /// Page `number` (1-based) of `size` rows. Page 0 is read as page 1.
    pub fn page(number: u64, size: u64) -> Self {
        Self::new()
            .skip(number.saturating_sub(1).saturating_mul(size))
            .take(size)
    }

    /// Whether neither offset nor limit is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// The `LIMIT n OFFSET m` clause; empty when nothing is set.
    pub fn to_sql(&self) -> String {
        self.to_string()
    }

    /// Drop and cap already ordered rows.
    pub fn apply<T>(&self, rows: Vec<T>) -> Vec<T> {
        let skip = self.skip.map_or(0, |n| n as usize);
        let take = self.take.map_or(usize::MAX, |n| n as usize);
        rows.into_iter().skip(skip).take(take).collect()
    }
}

impl fmt::Display for Pagination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.take, self.skip) {
            (Some(limit), Some(offset)) => write!(f, "LIMIT {limit} OFFSET {offset}"),
            (Some(limit), None) => write!(f, "LIMIT {limit}"),
            (None, Some(offset)) => write!(f, "OFFSET {offset}"),
            (None, None) => Ok(()),
        }
    }
}

/// A page of rows with the count of every matching row.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    /// Rows on this page.
    pub items: Vec<T>,
    /// Matching rows ignoring offset and limit.
    pub total: u64,
    /// Offset and limit this page was read with.
    pub pagination: Pagination,
}

impl<T> Page<T> {
    /// Assemble a page.
    pub fn new(items: Vec<T>, total: u64, pagination: Pagination) -> Self {
        Self {
            items,
            total,
            pagination,
        }
    }

    /// Whether rows remain past this page.
    pub fn has_next(&self) -> bool {
        self.pagination.skip.unwrap_or(0) + (self.items.len() as u64) < self.total
    }

    /// Rows on this page.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether this page has no rows.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Convert every row, keeping the counts.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page::new(self.items.into_iter().map(f).collect(), self.total, self.pagination)
    }
}

impl<T> IntoIterator for Page<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clause() {
        assert_eq!(Pagination::new().skip(10).take(20).to_sql(), "LIMIT 20 OFFSET 10");
        assert_eq!(Pagination::new().take(3).to_sql(), "LIMIT 3");
        assert_eq!(Pagination::new().skip(5).to_sql(), "OFFSET 5");
        assert_eq!(Pagination::new().to_sql(), "");
        assert!(Pagination::new().is_empty());
        assert!(!Pagination::new().take(0).is_empty());
    }

    #[test]
    fn test_page_numbers() {
        assert_eq!(Pagination::page(1, 10), Pagination::new().skip(0).take(10));
        assert_eq!(Pagination::page(3, 10).skip, Some(20));
        assert_eq!(Pagination::page(0, 10).skip, Some(0));
    }

    #[test]
    fn test_apply() {
        let rows = vec![1, 2, 3, 4];
        assert_eq!(Pagination::new().skip(1).take(2).apply(rows.clone()), vec![2, 3]);
        assert_eq!(Pagination::new().skip(3).apply(rows.clone()), vec![4]);
        assert_eq!(Pagination::new().skip(9).apply(rows), Vec::<i32>::new());
    }

    #[test]
    fn test_page() {
        let page = Page::new(vec![2, 3], 4, Pagination::page(1, 2).skip(1));
        assert!(page.has_next());
        assert_eq!(page.len(), 2);

        let last = Page::new(vec![4], 4, Pagination::new().skip(3).take(2)).map(|n| n * 10);
        assert!(!last.has_next());
        assert_eq!(last.into_iter().collect::<Vec<_>>(), vec![40]);
    }
}
