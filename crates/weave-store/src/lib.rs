//! Storage contract for the Weave segment ledger.
//!
//! Every backend implements the same capability surface with identical
//! observable semantics:
//!
//! - [`Adapter`] — the full contract: link and evidence writes, segment and
//!   map queries, a flat key-value side channel, batching, and store events
//! - [`Batch`] — the transactional overlay surface returned by
//!   [`Adapter::new_batch`]
//! - [`SegmentFilter`] / [`MapFilter`] / [`Pagination`] — query predicates
//!   with total, deterministic ordering
//! - [`StoreEvent`] — write notifications fanned out to registered sinks
//!
//! The in-memory store in `weave-memorystore` is the conformance oracle for
//! this contract; `weave-storetesting` holds the suite every backend runs.

pub mod adapter;
pub mod error;
pub mod event;
pub mod filter;
pub mod validation;

pub use adapter::{Adapter, Batch, KeyValueStore, StoreInfo, StoreReader, StoreWriter};
pub use error::{StoreError, StoreResult};
pub use event::{EventSender, StoreEvent};
pub use filter::{sort_segments, MapFilter, Pagination, SegmentFilter};
pub use validation::validate_new_link;
