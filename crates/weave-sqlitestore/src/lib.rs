//! Relational adapter over SQLite.
//!
//! Links live in a normalized schema: a `links` row keyed by hash with
//! denormalized filter columns plus the JSON link body, a `link_tags` row
//! per tag, a `maps` row per map, an `evidences` row per
//! `(link_hash, backend, provider)` — the primary key enforces evidence
//! uniqueness — and a `kv_store` table for the value side channel.
//!
//! Filters compile to parameterized WHERE clauses; ordering and
//! LIMIT/OFFSET are pushed down to the database.

mod schema;
mod store;

pub use store::{SqliteStore, SqliteStoreConfig, DESCRIPTION, NAME};
