//! The collection engine.
//!
//! Each cycle walks the same pipeline: list the bucket population, measure
//! staleness against the store, pick a strategy (one bulk sweep vs. targeted
//! per-bucket fetches), fetch through a self-scaling worker pool, persist in
//! one transaction, and publish the dashboard snapshot.
//!
//! # Components
//!
//! - [`StalenessReport`]: which buckets need collection and why
//! - [`Strategy`]: bulk vs. incremental selection
//! - [`worker_count`] / `fetch_many`: the bounded concurrent fetch pool
//! - [`CollectionDriver`]: owns the store and runs cycles to completion

mod driver;
mod pool;
mod staleness;
mod strategy;

pub use driver::{CollectionDriver, CollectorError, CycleReport};
pub use pool::{fetch_many, worker_count, FetchReport};
pub use staleness::{evaluate_staleness, StalenessReport};
pub use strategy::{select_strategy, Strategy};
