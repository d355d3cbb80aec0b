//! Entry point for frontends: validate a query, aggregate the matching items,
//! then narrow them with the viewer-relative filters.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use crate::config::CoreConfig;
use crate::error::ReviewError;
use crate::models::{Item, ListQuery, User};
use crate::pipeline::{guarded, FilterPipeline, ItemAggregator};
use crate::source::{ActivitySource, GitLabSource};

pub struct ReviewService<S: ?Sized> {
    aggregator: ItemAggregator<S>,
    me: User,
}

impl<S: ActivitySource + ?Sized> ReviewService<S> {
    /// Resolve the current user once; every viewer-relative filter uses it.
    pub async fn new(source: Arc<S>, cancel: &CancellationToken) -> Result<Self, ReviewError> {
        Self::with_aggregator(ItemAggregator::new(source), cancel).await
    }

    pub async fn with_aggregator(
        aggregator: ItemAggregator<S>,
        cancel: &CancellationToken,
    ) -> Result<Self, ReviewError> {
        let me = guarded(
            cancel,
            "get current user".to_string(),
            aggregator.source().get_current_user(),
        )
        .await?;
        info!(user = %me.username, "review service ready");

        Ok(Self { aggregator, me })
    }

    pub fn me(&self) -> &User {
        &self.me
    }

    pub fn source(&self) -> &S {
        self.aggregator.source()
    }

    /// List fully assembled items matching `query`.
    ///
    /// Invalid queries fail before any remote call. Any failure while
    /// aggregating fails the whole call; there are no partial results.
    #[instrument(skip_all, fields(user = %self.me.username))]
    pub async fn list_items(
        &self,
        query: &ListQuery,
        cancel: &CancellationToken,
    ) -> Result<Vec<Item>, ReviewError> {
        query.validate().map_err(ReviewError::Validation)?;

        let items = self.aggregator.list(&query.backend, cancel).await?;
        let total = items.len();
        let items = FilterPipeline::new(query, &self.me).apply(items);

        info!(total, kept = items.len(), "listed items");
        Ok(items)
    }
}

impl ReviewService<GitLabSource> {
    /// Service backed by the GitLab REST API described by `config`.
    pub async fn from_config(
        config: &CoreConfig,
        cancel: &CancellationToken,
    ) -> Result<Self, ReviewError> {
        let source = Arc::new(GitLabSource::new(config)?);
        let aggregator = ItemAggregator::new(source).with_page_size(config.per_page);
        Self::with_aggregator(aggregator, cancel).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EventKind, ItemState, TriState};
    use crate::test_support::{note, raw_item, resolved, FakeSource, Op};

    fn open_items() -> ListQuery {
        let mut query = ListQuery::default();
        query.backend.state = Some(ItemState::Open);
        query
    }

    #[tokio::test]
    async fn test_invalid_query_makes_no_remote_calls() {
        let cancel = CancellationToken::new();
        let source = FakeSource::new("me").with_pages(vec![vec![raw_item(1, 1, "alice")]]);
        let service = ReviewService::new(Arc::new(source), &cancel).await.unwrap();

        let query = ListQuery {
            approved_by_me: TriState::True,
            ..Default::default()
        };
        let err = service.list_items(&query, &cancel).await.unwrap_err();

        assert!(matches!(err, ReviewError::Validation(_)));
        assert!(err.to_string().contains("state, labels, authors, pagination"));
        assert_eq!(service.source().calls(Op::ListItems), 0);
        assert_eq!(service.source().calls(Op::GetProject), 0);
    }

    #[tokio::test]
    async fn test_resolved_thread_end_to_end() {
        let cancel = CancellationToken::new();
        let source = FakeSource::new("x")
            .with_pages(vec![vec![raw_item(1, 1, "alice")]])
            .with_notes(
                1,
                1,
                vec![
                    resolved(note(2, "y", 2, Some(("a.go", 10))), "x", 3),
                    note(1, "x", 1, Some(("a.go", 10))),
                ],
            );
        let service = ReviewService::new(Arc::new(source), &cancel).await.unwrap();

        let items = service.list_items(&open_items(), &cancel).await.unwrap();
        let item = &items[0];

        let kinds: Vec<EventKind> = item.history.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                EventKind::Commented,
                EventKind::Replied,
                EventKind::ThreadResolved
            ]
        );
        assert_eq!(item.history[2].actor.username, "x");

        assert_eq!(item.threads.len(), 1);
        let thread = &item.threads[0];
        assert_eq!(thread.root().author.username, "x");
        assert_eq!(thread.next(0).unwrap().author.username, "y");
        assert!(thread.next(1).is_none());
        assert!(thread.comments().iter().all(|c| c.resolved));
    }

    #[tokio::test]
    async fn test_filters_use_current_user() {
        let cancel = CancellationToken::new();
        let source = FakeSource::new("me")
            .with_pages(vec![vec![raw_item(1, 1, "alice"), raw_item(1, 2, "bob")]])
            .with_approvals(1, 2, &["me"], false, 1);
        let service = ReviewService::new(Arc::new(source), &cancel).await.unwrap();
        assert_eq!(service.me().username, "me");

        let mut query = open_items();
        query.approved_by_me = TriState::False;
        let items = service.list_items(&query, &cancel).await.unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].number, 1);
    }

    #[tokio::test]
    async fn test_current_user_failure_is_transport() {
        let cancel = CancellationToken::new();
        let source = FakeSource::new("me").failing(Op::CurrentUser, 0);

        let err = ReviewService::new(Arc::new(source), &cancel)
            .await
            .err()
            .unwrap();

        assert!(err.to_string().starts_with("get current user"));
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = ReviewService::new(Arc::new(FakeSource::new("me")), &cancel)
            .await
            .err()
            .unwrap();

        assert!(matches!(err, ReviewError::Cancelled));
    }
}
