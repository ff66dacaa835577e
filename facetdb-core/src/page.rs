//! Page container and discovery record types

use serde::{Deserialize, Serialize};

use crate::cursor::Cursor;
use crate::dimension::DimensionName;
use crate::error::{FacetError, FacetResult};
use crate::metric::MetricName;
use crate::series::MeasurementSeries;

/// Offset/limit pair for the discovery operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    /// Opaque cursor previously emitted by this layer, or none for page one
    pub offset: Option<String>,
    pub limit: usize,
}

impl PageRequest {
    pub fn new(offset: Option<String>, limit: usize) -> FacetResult<Self> {
        if limit == 0 {
            return Err(FacetError::validation("Limit must be positive"));
        }
        // An empty offset means "from the start", same as no offset
        let offset = offset.filter(|s| !s.is_empty());
        Ok(Self { offset, limit })
    }

    pub fn first(limit: usize) -> FacetResult<Self> {
        Self::new(None, limit)
    }

    pub fn offset_str(&self) -> Option<&str> {
        self.offset.as_deref()
    }
}

/// One discovered dimension name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DimensionNameRecord {
    pub metric_name: MetricName,
    pub dimension_name: DimensionName,
}

/// One discovered dimension value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DimensionValueRecord {
    pub metric_name: MetricName,
    pub dimension_name: DimensionName,
    pub value: String,
}

/// An item type that can mark its own position in the page ordering
pub trait PageItem {
    /// The cursor string a caller passes back to continue after this item
    fn cursor_key(&self) -> String;

    /// Orders candidates that share a cursor key, so collapsing duplicates
    /// keeps the same survivor no matter what order the backend delivered
    /// them in
    fn tie_break(&self) -> &str {
        ""
    }
}

impl PageItem for DimensionNameRecord {
    fn cursor_key(&self) -> String {
        self.dimension_name.as_str().to_string()
    }

    fn tie_break(&self) -> &str {
        self.metric_name.as_str()
    }
}

impl PageItem for DimensionValueRecord {
    fn cursor_key(&self) -> String {
        self.value.clone()
    }

    fn tie_break(&self) -> &str {
        self.metric_name.as_str()
    }
}

impl PageItem for MeasurementSeries {
    /// Grouped series continue from (group identity, last row time);
    /// ungrouped series from the last row time alone.
    fn cursor_key(&self) -> String {
        // The grouping engine never emits an empty series; the epoch
        // fallback keeps this total anyway.
        let timestamp = self
            .last_timestamp()
            .unwrap_or_else(crate::time::Timestamp::epoch);
        match &self.group_key {
            Some(group) => Cursor::Composite {
                group: group.clone(),
                timestamp,
            }
            .encode(),
            None => Cursor::Timestamp(timestamp).encode(),
        }
    }
}

/// One page of results plus the implicit truncation signal
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Set when the backend delivered more candidates than `limit`
    pub has_more: bool,
}

impl<T> Page<T> {
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            has_more: false,
        }
    }

    pub fn new(items: Vec<T>, has_more: bool) -> Self {
        Self { items, has_more }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T: PageItem> Page<T> {
    /// Cursor for the next page, present only when this page was truncated.
    /// The resource layer renders it into a pagination link; it never
    /// constructs cursors itself.
    pub fn next_offset(&self) -> Option<String> {
        if !self.has_more {
            return None;
        }
        self.items.last().map(PageItem::cursor_key)
    }
}
