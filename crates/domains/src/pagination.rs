//! # Pagination
//!
//! Shared page-window computation used by every list-returning operation.
//! Page sizes are fixed per call site and never client-supplied.

use serde::{Deserialize, Serialize};

use crate::errors::{DomainError, Result};

/// A validated, 1-based page number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u64")]
pub struct PageRequest(u64);

impl PageRequest {
    pub fn new(page: u64) -> Result<Self> {
        if page == 0 {
            return Err(DomainError::Validation(
                "page must be a positive integer".into(),
            ));
        }
        Ok(Self(page))
    }

    pub fn first() -> Self {
        Self(1)
    }

    pub fn number(&self) -> u64 {
        self.0
    }
}

impl TryFrom<u64> for PageRequest {
    type Error = DomainError;

    fn try_from(page: u64) -> Result<Self> {
        Self::new(page)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::first()
    }
}

/// The window a page covers within `total_count` items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub skip: u64,
    pub limit: u64,
    pub has_more: bool,
    pub results_remaining: u64,
}

/// `skip = (page-1)*size`, `has_more = page*size < total`,
/// `results_remaining = max(0, total - page*size)`.
pub fn paginate(total_count: u64, page: PageRequest, page_size: u64) -> PageWindow {
    let end = page.number().saturating_mul(page_size);
    PageWindow {
        skip: (page.number() - 1).saturating_mul(page_size),
        limit: page_size,
        has_more: end < total_count,
        results_remaining: total_count.saturating_sub(end),
    }
}

/// One page of results as returned to the boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub has_more: bool,
    pub results_remaining: u64,
}

impl<T> Page<T> {
    pub fn from_window(items: Vec<T>, window: PageWindow) -> Self {
        Self {
            items,
            has_more: window.has_more,
            results_remaining: window.results_remaining,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            has_more: self.has_more,
            results_remaining: self.results_remaining,
        }
    }
}

/// Per-call-site page sizes. Not client-supplied; missing fields take the
/// defaults below when deserialized from settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageSizes {
    pub comments: u64,
    pub posts: u64,
    pub search: u64,
    pub conversations: u64,
    pub notifications: u64,
    pub messages: u64,
}

impl Default for PageSizes {
    fn default() -> Self {
        Self {
            comments: 5,
            posts: 10,
            search: 10,
            conversations: 10,
            notifications: 10,
            messages: 20,
        }
    }
}
