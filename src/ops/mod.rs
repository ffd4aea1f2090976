//! Ready-made task kinds for warehouse ETL pipelines.
//!
//! Every kind goes through the [`SqlBackend`](crate::backend::SqlBackend)
//! trait, so the same definitions run against PostgreSQL in production and
//! against [`MemoryBackend`](crate::backend::MemoryBackend) in tests.

mod load_dimension;
mod load_fact;
mod noop;
mod quality;
mod sql;
mod stage;

pub use load_dimension::{LoadDimensionTask, LoadMode};
pub use load_fact::LoadFactTask;
pub use noop::NoopTask;
pub use quality::QualityCheckTask;
pub use sql::SqlTask;
pub use stage::{StageTask, AUTO_JSON_PATHS};
