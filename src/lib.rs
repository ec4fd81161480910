//! Append-oriented event store with an embedded analytical query facility.
//!
//! Events are JSON objects keyed by time and tag, persisted in a rocksdb
//! collection whose key order equals chronological order. Queries stream a
//! key range in one pass and materialize grouped summaries, time-bucketed
//! series, and raw events.
//!
//! ```no_run
//! use eventspan::{EventCollection, QueryDesc, StoreEventsRequest};
//! use serde_json::json;
//!
//! # fn main() -> eventspan::Result<()> {
//! let collection = EventCollection::create("./events")?;
//! let request: StoreEventsRequest = serde_json::from_value(json!({
//!     "tag": "web",
//!     "events": [{ "_ts": "2024-05-01T00:00:00Z", "bytes": 512 }],
//! }))?;
//! collection.store_events(request)?;
//!
//! let result = collection.query(QueryDesc::default())?;
//! assert_eq!(result.events.len(), 1);
//! # Ok(())
//! # }
//! ```

pub mod compare;
pub mod config;
pub mod error;
pub mod event;
pub mod key;
pub mod query;
pub mod store;
pub mod validation;

pub use compare::{compare_values, values_equal};
pub use config::StoreConfig;
pub use error::{EventError, Result};
pub use event::{Event, StoreEventsRequest};
pub use query::{ColumnDesc, Filter, QueryDesc, QueryResult, TimeRange};
pub use store::EventCollection;
