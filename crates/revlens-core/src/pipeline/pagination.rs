use std::future::Future;

use tracing::debug;

use crate::error::ReviewError;

/// Fetch pages starting at `start_page` until one comes back empty.
///
/// A failing page aborts the scan with `ReviewError::Page` naming that page;
/// pages already fetched are discarded. Cancellation is passed through as is.
pub async fn list_all<T, F, Fut>(start_page: u32, mut fetch_page: F) -> Result<Vec<T>, ReviewError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Vec<T>, ReviewError>>,
{
    let mut result = Vec::new();
    let mut page = start_page;

    loop {
        let nodes = match fetch_page(page).await {
            Ok(nodes) => nodes,
            Err(ReviewError::Cancelled) => return Err(ReviewError::Cancelled),
            Err(err) => {
                return Err(ReviewError::Page {
                    page,
                    source: Box::new(err),
                })
            }
        };

        if nodes.is_empty() {
            break;
        }

        debug!(page, count = nodes.len(), "fetched page");
        result.extend(nodes);
        page += 1;
    }

    Ok(result)
}
