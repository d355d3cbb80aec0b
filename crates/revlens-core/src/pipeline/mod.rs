//! Reconstruction and aggregation pipeline.
//!
//! Leaves first: `pagination` and `project_cache` wrap remote lookups,
//! `history` turns raw notes into an ordered event log, `threads` rebuilds
//! comment chains from it, `aggregator` assembles complete items concurrently
//! and `filter` narrows the assembled set.

pub mod aggregator;
pub mod filter;
pub mod history;
pub mod pagination;
pub mod project_cache;
pub mod threads;

use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::error::ReviewError;

pub use aggregator::ItemAggregator;
pub use filter::FilterPipeline;
pub use history::assemble_history;
pub use pagination::list_all;
pub use project_cache::ProjectCache;
pub use threads::{build_threads, ThreadDiagnostic, ThreadSet};

/// Run one remote call under the caller's cancellation token.
///
/// Cancellation wins over a result that is ready at the same time. Source
/// failures are wrapped with `context` naming the call.
pub(crate) async fn guarded<T, F>(
    cancel: &CancellationToken,
    context: String,
    call: F,
) -> Result<T, ReviewError>
where
    F: Future<Output = anyhow::Result<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ReviewError::Cancelled),
        result = call => result.map_err(|e| ReviewError::transport(context, e)),
    }
}
