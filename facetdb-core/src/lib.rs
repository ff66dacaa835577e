//! # FacetDB Core Library
//!
//! Shared library providing the data model and storage contract for the
//! FacetDB read path.
//!
//! ## Features
//!
//! - **Data Types**: Metric names, tenants, dimensions, canonical rows and
//!   measurement series
//! - **Cursors**: Opaque continuation cursors with strict-greater semantics
//! - **Contract**: The [`store::MetricStore`] trait both storage backends
//!   implement
//! - **Validation**: Input validation and the reserved-identifier policy
//!
//! ## Architecture
//!
//! This library sits between the query service and its storage backends,
//! providing a common vocabulary so that pagination, grouping and merge
//! semantics are identical regardless of where the rows came from.

pub mod cursor;
pub mod dimension;
pub mod error;
pub mod metric;
pub mod page;
pub mod query;
pub mod series;
pub mod store;
pub mod tenant;
pub mod time;

// Re-export commonly used types
pub use cursor::Cursor;
pub use dimension::{DimensionEntry, DimensionName, DimensionSet, TENANT_DIMENSION};
pub use error::{FacetError, FacetResult};
pub use metric::MetricName;
pub use page::{DimensionNameRecord, DimensionValueRecord, Page, PageItem, PageRequest};
pub use query::{GroupBy, GroupingMode, MeasurementQuery};
pub use series::{CanonicalRow, DefinitionId, KeyedRow, MeasurementSeries, ResolvedDefinition};
pub use store::MetricStore;
pub use tenant::TenantId;
pub use time::{QueryWindow, Timestamp};

/// Version information for FacetDB
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Maximum length for metric names
pub const MAX_METRIC_NAME_LENGTH: usize = 256;

/// Maximum length for tenant ids
pub const MAX_TENANT_ID_LENGTH: usize = 128;

/// Maximum length for dimension names and values
pub const MAX_DIMENSION_LENGTH: usize = 256;

/// Maximum number of dimension filters or groupBy entries per query
pub const MAX_DIMENSIONS_PER_QUERY: usize = 100;
