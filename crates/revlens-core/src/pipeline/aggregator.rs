//! Item aggregation.
//!
//! For each listed merge request, the project (through the cache), the
//! approval state, and the activity history are fetched concurrently and
//! joined into one `Item`. Aggregation is all-or-nothing: the first failing
//! sub-fetch drops its siblings, fails the item, and the item's failure drops
//! every other in-flight item of the same list.

use std::sync::Arc;

use futures::future::try_join_all;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use super::guarded;
use super::history::load_history;
use super::pagination::list_all;
use super::project_cache::ProjectCache;
use super::threads::build_threads;
use crate::constants::{FIRST_PAGE, UNBOUNDED_PAGE_SIZE};
use crate::error::ReviewError;
use crate::models::{
    ApprovalSummary, CommentThread, Event, Item, ItemState, ListItemsRequest, Project,
};
use crate::source::{ActivitySource, ApprovalState, RawItem};

pub struct ItemAggregator<S: ?Sized> {
    source: Arc<S>,
    projects: ProjectCache,
    per_page: u32,
}

impl<S: ActivitySource + ?Sized> ItemAggregator<S> {
    pub fn new(source: Arc<S>) -> Self {
        Self {
            source,
            projects: ProjectCache::new(),
            per_page: UNBOUNDED_PAGE_SIZE,
        }
    }

    /// Page size for unbounded scans.
    pub fn with_page_size(mut self, per_page: u32) -> Self {
        self.per_page = per_page.max(1);
        self
    }

    pub fn source(&self) -> &S {
        self.source.as_ref()
    }

    pub fn project_cache(&self) -> &ProjectCache {
        &self.projects
    }

    /// List and fully assemble every item matching `req`.
    ///
    /// With explicit pagination exactly that page is fetched. Otherwise pages
    /// are walked from the first until an empty one comes back.
    #[instrument(skip_all, fields(explicit_page = req.pagination.is_explicit()))]
    pub async fn list(
        &self,
        req: &ListItemsRequest,
        cancel: &CancellationToken,
    ) -> Result<Vec<Item>, ReviewError> {
        let raw = self.list_raw(req, cancel).await?;
        debug!(count = raw.len(), "listed raw items");

        let items = try_join_all(raw.into_iter().map(|item| self.load_item(item, cancel))).await?;
        Ok(items)
    }

    async fn list_raw(
        &self,
        req: &ListItemsRequest,
        cancel: &CancellationToken,
    ) -> Result<Vec<RawItem>, ReviewError> {
        if req.pagination.is_explicit() {
            return self.fetch_page(req.clone(), cancel).await;
        }

        let mut base = req.clone();
        base.pagination.per_page = self.per_page;

        list_all(FIRST_PAGE, |page| {
            let mut req = base.clone();
            req.pagination.page = page;
            self.fetch_page(req, cancel)
        })
        .await
    }

    async fn fetch_page(
        &self,
        req: ListItemsRequest,
        cancel: &CancellationToken,
    ) -> Result<Vec<RawItem>, ReviewError> {
        guarded(
            cancel,
            format!("list items page {}", req.pagination.page),
            self.source.list_items(&req),
        )
        .await
    }

    /// Assemble one item from its listing entry.
    #[instrument(skip_all, fields(item = %raw.item_ref()))]
    pub async fn load_item(
        &self,
        raw: RawItem,
        cancel: &CancellationToken,
    ) -> Result<Item, ReviewError> {
        let item_ref = raw.item_ref();
        let project_id = raw.project_id;

        let project = self.projects.get_or_fetch(project_id, || {
            guarded(
                cancel,
                format!("get project {project_id}"),
                self.source.get_project(project_id),
            )
        });
        let approvals = guarded(
            cancel,
            format!("get approvals of {item_ref}"),
            self.source.get_approvals(item_ref),
        );
        let history = load_history(self.source.as_ref(), item_ref, cancel);

        let (project, approvals, history) = match tokio::try_join!(project, approvals, history) {
            Ok(parts) => parts,
            Err(ReviewError::Cancelled) => return Err(ReviewError::Cancelled),
            Err(err) => {
                return Err(ReviewError::Item {
                    url: raw.url,
                    source: Box::new(err),
                })
            }
        };

        let reconstructed = build_threads(&history);
        if !reconstructed.diagnostics.is_empty() {
            warn!(
                url = %raw.url,
                skipped = reconstructed.diagnostics.len(),
                "thread reconstruction skipped events"
            );
        }

        Ok(assemble_item(raw, project, approvals, history, reconstructed.threads))
    }
}

/// Lifecycle state from the backend's state string; the draft flag wins.
pub fn item_state(raw: &RawItem) -> ItemState {
    if raw.draft {
        return ItemState::Draft;
    }

    match raw.state.as_str() {
        "opened" => ItemState::Open,
        "closed" => ItemState::Closed,
        "merged" => ItemState::Merged,
        other => {
            warn!(state = other, url = %raw.url, "unknown merge request state, treating as open");
            ItemState::Open
        }
    }
}

/// Labels may arrive comma-joined; split them into single entries.
pub fn split_labels(labels: &[String]) -> Vec<String> {
    labels
        .iter()
        .flat_map(|l| l.split(','))
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

fn assemble_item(
    raw: RawItem,
    project: Project,
    approvals: ApprovalState,
    history: Vec<Event>,
    threads: Vec<CommentThread>,
) -> Item {
    let state = item_state(&raw);
    // a merged request's close time is its merge time
    let closed_at = match state {
        ItemState::Merged => raw.merged_at,
        _ => raw.closed_at,
    };

    Item {
        labels: split_labels(&raw.labels),
        url: raw.url,
        number: raw.number,
        project,
        title: raw.title,
        body: raw.description,
        author: raw.author,
        source_branch: raw.source_branch,
        target_branch: raw.target_branch,
        assignees: raw.assignees,
        approvals: ApprovalSummary {
            requested_from: raw.reviewers,
            by: approvals.approved_by,
            satisfies_rules: approvals.approved,
            required: approvals.approvals_required,
        },
        history,
        threads,
        state,
        created_at: raw.created_at,
        closed_at,
    }
}
