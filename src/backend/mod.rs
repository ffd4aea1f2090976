pub mod memory;
pub mod postgres;

pub use memory::MemoryBackend;
pub use postgres::PostgresBackend;

use crate::error::BackendError;

/// SQL-executing collaborator shared by every task body.
///
/// The engine itself never touches the warehouse; task kinds submit
/// statements through this trait and callers choose the implementation.
#[async_trait::async_trait]
pub trait SqlBackend: Send + Sync {
    /// Run one statement, returning the number of affected rows.
    async fn execute(&self, statement: &str) -> Result<u64, BackendError>;

    /// Run a query expected to yield a single numeric value: the first
    /// column of the first row. `None` when the query returns no rows.
    async fn fetch_scalar(&self, statement: &str) -> Result<Option<i64>, BackendError>;
}
