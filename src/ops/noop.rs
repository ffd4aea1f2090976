use async_trait::async_trait;
use log::debug;

use crate::engine::RunContext;
use crate::error::TaskError;
use crate::task::Task;

/// Marker task that always succeeds. Useful as a begin or end anchor in a
/// pipeline graph.
pub struct NoopTask;

#[async_trait]
impl Task for NoopTask {
    async fn execute(&self, ctx: &RunContext, _attempt: u32) -> Result<(), TaskError> {
        debug!("Marker task reached in run '{}'", ctx.run_id());
        Ok(())
    }
}
