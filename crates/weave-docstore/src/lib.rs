//! Document-database adapter.
//!
//! [`DocStore`] projects the storage contract onto a JSON document
//! database. Links and map headers live in one collection as documents
//! tagged `docType ∈ {link, map}`; evidences and values live in their own
//! collections. Segment filters translate to Mango-style selectors
//! (`$exists` / `$eq` / `$in` / `$all`) with pagination pushed down as
//! `{limit, skip}` and an explicit sort spec so ordering matches the
//! reference store.
//!
//! The wire transport is a collaborator: anything implementing
//! [`DocumentDatabase`] can back the store. [`MemoryDocumentDb`] implements
//! the selector semantics in memory and is what the tests run against.

pub mod database;
pub mod document;
pub mod selector;
mod store;

pub use database::{DocumentDatabase, MemoryDocumentDb};
pub use document::Document;
pub use selector::{map_query, segment_query, LinkQuery, MapQuery};
pub use store::{DocStore, DocStoreConfig, DESCRIPTION, NAME};
